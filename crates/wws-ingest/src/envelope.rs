//! SOAP 1.1 request envelopes with a WS-Security `UsernameToken`.

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::{IngestError, Result};

pub const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";
pub const WSSE_NS: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";
pub const PASSWORD_TEXT_TYPE: &str = "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0#PasswordText";

/// Wraps `body` (an already serialized request element) in an authenticated
/// envelope. Username and password are text-escaped; `body` is written as is.
pub fn build_envelope(username: &str, password: &str, body: &str) -> Result<String> {
    let mut xml = Writer::new_with_indent(Vec::new(), b' ', 2);
    write_envelope(&mut xml, username, password, body).map_err(IngestError::Envelope)?;
    let bytes = xml.into_inner();
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn write_envelope(
    xml: &mut Writer<Vec<u8>>,
    username: &str,
    password: &str,
    body: &str,
) -> std::io::Result<()> {
    xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut envelope = BytesStart::new("env:Envelope");
    envelope.push_attribute(("xmlns:env", SOAP_ENV_NS));
    envelope.push_attribute(("xmlns:xsd", XSD_NS));
    envelope.push_attribute(("xmlns:wsse", WSSE_NS));
    xml.write_event(Event::Start(envelope))?;

    xml.write_event(Event::Start(BytesStart::new("env:Header")))?;
    let mut security = BytesStart::new("wsse:Security");
    security.push_attribute(("env:mustUnderstand", "1"));
    xml.write_event(Event::Start(security))?;
    xml.write_event(Event::Start(BytesStart::new("wsse:UsernameToken")))?;

    xml.write_event(Event::Start(BytesStart::new("wsse:Username")))?;
    xml.write_event(Event::Text(BytesText::new(username)))?;
    xml.write_event(Event::End(BytesEnd::new("wsse:Username")))?;

    let mut password_start = BytesStart::new("wsse:Password");
    password_start.push_attribute(("Type", PASSWORD_TEXT_TYPE));
    xml.write_event(Event::Start(password_start))?;
    xml.write_event(Event::Text(BytesText::new(password)))?;
    xml.write_event(Event::End(BytesEnd::new("wsse:Password")))?;

    xml.write_event(Event::End(BytesEnd::new("wsse:UsernameToken")))?;
    xml.write_event(Event::End(BytesEnd::new("wsse:Security")))?;
    xml.write_event(Event::End(BytesEnd::new("env:Header")))?;

    xml.write_event(Event::Start(BytesStart::new("env:Body")))?;
    xml.write_event(Event::Text(BytesText::from_escaped(body.trim())))?;
    xml.write_event(Event::End(BytesEnd::new("env:Body")))?;

    xml.write_event(Event::End(BytesEnd::new("env:Envelope")))?;
    Ok(())
}
