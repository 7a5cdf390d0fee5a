//! Dictionary-style views of raw responses, for exploring unfamiliar payloads.
//!
//! Each document becomes one JSON object keyed by its root element:
//!
//! - attributes are stored as `@name`, element text as `#text`;
//! - an element with neither attributes nor children collapses to its text
//!   (or `null`);
//! - repeated child elements become arrays;
//! - qualified names are kept as written (`wd:Worker`).

use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::escape;
use quick_xml::events::{BytesStart, Event};
use serde_json::{Map, Value};
use tracing::info;

use crate::error::{IngestError, Result};

const ATTRIBUTE_PREFIX: char = '@';
const TEXT_KEY: &str = "#text";

#[derive(Debug, Default)]
struct Frame {
    name: String,
    attributes: Map<String, Value>,
    children: Map<String, Value>,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>, reader: &Reader<&[u8]>) -> Result<Self> {
        let mut attributes = Map::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(quick_xml::Error::from)?;
            let key = String::from_utf8_lossy(attribute.key.as_ref());
            let value = attribute.decode_and_unescape_value(reader.decoder())?;
            attributes.insert(
                format!("{ATTRIBUTE_PREFIX}{key}"),
                Value::String(value.into_owned()),
            );
        }
        Ok(Self {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            attributes,
            ..Self::default()
        })
    }

    fn close(self) -> (String, Value) {
        let text = self.text.trim();
        if self.attributes.is_empty() && self.children.is_empty() {
            let value = if text.is_empty() {
                Value::Null
            } else {
                Value::String(text.to_string())
            };
            return (self.name, value);
        }
        let mut object = self.attributes;
        object.extend(self.children);
        if !text.is_empty() {
            object.insert(TEXT_KEY.to_string(), Value::String(text.to_string()));
        }
        (self.name, Value::Object(object))
    }

    fn add_child(&mut self, name: String, value: Value) {
        match self.children.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                self.children.insert(name, value);
            }
        }
    }
}

/// Converts one response into a dictionary-style JSON value.
pub fn document_to_value(document: &[u8]) -> Result<Value> {
    let text = std::str::from_utf8(document)?;
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<Frame> = Vec::new();
    let mut root = Map::new();

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(Frame::open(&start, &reader)?),
            Event::Empty(start) => {
                let (name, value) = Frame::open(&start, &reader)?.close();
                attach(&mut stack, &mut root, name, value);
            }
            Event::End(_) => {
                if let Some(frame) = stack.pop() {
                    let (name, value) = frame.close();
                    attach(&mut stack, &mut root, name, value);
                }
            }
            Event::Text(text) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&text.into_inner()));
                }
            }
            Event::CData(data) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::GeneralRef(reference) => {
                if let Some(frame) = stack.last_mut() {
                    let name = String::from_utf8_lossy(&reference.into_inner()).into_owned();
                    frame.text.push_str(&resolve_reference(&name));
                }
            }
            Event::Eof => break,
            _ => (),
        }
    }
    Ok(Value::Object(root))
}

fn attach(stack: &mut [Frame], root: &mut Map<String, Value>, name: String, value: Value) {
    match stack.last_mut() {
        Some(parent) => parent.add_child(name, value),
        None => {
            root.insert(name, value);
        }
    }
}

/// Resolves `&name;` and `&#NN;` references; unknown ones are kept verbatim.
fn resolve_reference(name: &str) -> String {
    if let Some(code) = name.strip_prefix('#') {
        let parsed = match code.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse::<u32>().ok(),
        };
        if let Some(ch) = parsed.and_then(char::from_u32) {
            return ch.to_string();
        }
    }
    escape::resolve_predefined_entity(name)
        .map_or_else(|| format!("&{name};"), str::to_string)
}

/// Converts up to `max` documents (all when `None`).
pub fn to_dict<D: AsRef<[u8]>>(documents: &[D], max: Option<usize>) -> Result<Vec<Value>> {
    documents
        .iter()
        .take(max.unwrap_or(usize::MAX))
        .map(|document| document_to_value(document.as_ref()))
        .collect()
}

/// Writes one pretty-printed JSON file per document as `{stem}_{i}.json`.
///
/// `stem` may include a directory; it is created when missing.
pub fn write_json_dumps<D: AsRef<[u8]>>(
    documents: &[D],
    stem: &Path,
    max: Option<usize>,
) -> Result<Vec<PathBuf>> {
    if let Some(parent) = stem.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| IngestError::io(parent, e))?;
    }
    let file_stem = stem
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut written = Vec::new();
    for (index, value) in to_dict(documents, max)?.iter().enumerate() {
        let path = stem.with_file_name(format!("{file_stem}_{index}.json"));
        let json = serde_json::to_string_pretty(value)?;
        std::fs::write(&path, json).map_err(|e| IngestError::io(&path, e))?;
        info!(path = %path.display(), "saved JSON dump");
        written.push(path);
    }
    Ok(written)
}
