//! Tag-expression parser.
//!
//! Each raw tag string becomes one immutable [`Directive`]. Markers, in the
//! order they are recognised:
//!
//! | Marker          | Meaning                                                   |
//! |-----------------|-----------------------------------------------------------|
//! | `>>`            | parent → child separator                                  |
//! | `*`             | repeat anchor; following tags are evaluated per child      |
//! | `~`             | flatten every leaf and attribute under the matched parent  |
//! | `^^name`        | output column name                                        |
//! | `@@attr`        | read an attribute instead of element text                 |
//! | `a\|\|b\|=name` | first alternative with exactly one match wins             |
//! | `%term?=kind%`  | wildcard step on `type`, `text` or `tag`                  |

use tracing::warn;
use wws_model::{ExtractOptions, Namespace};

use crate::error::DirectiveError;
use crate::query::{ContainsSubject, NameTest, Path, Predicate, QName, Query, Step};

const SEGMENT_SEPARATOR: &str = ">>";
const REPEAT_MARKER: char = '*';
const FLATTEN_MARKER: char = '~';
const RENAME_MARKER: &str = "^^";
const ATTRIBUTE_MARKER: &str = "@@";
const OR_MARKER: &str = "||";
const OR_TARGET_MARKER: &str = "|=";
const WILDCARD_MARKER: char = '%';
const WILDCARD_KIND_MARKER: &str = "?=";

/// Element name used by the `type` and `text` wildcard kinds.
const WILDCARD_ID_ELEMENT: &str = "ID";

/// One parsed tag expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// The tag expression as written.
    pub source: String,
    pub kind: DirectiveKind,
    /// Raw column key: the namespace-qualified path, e.g.
    /// `./wd:Line/wd:ID[@wd:type='Spend_Category_ID']`.
    pub key: String,
    /// Explicit `^^` column name.
    pub rename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveKind {
    Plain(Query),
    /// Compiled `%term?=kind%` query (several alternatives form a union).
    Wildcard(Query),
    Attribute {
        /// Path to the owning element; `None` reads the context element.
        owner: Option<Path>,
        attribute: QName,
    },
    OrChain {
        alternatives: Vec<Query>,
        /// Column receiving the winner's discriminator.
        target: String,
    },
    RepeatAnchor(Path),
    FlattenAll(Path),
}

impl Directive {
    /// Column this directive writes its value to.
    pub fn column(&self) -> &str {
        self.rename.as_deref().unwrap_or(&self.key)
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            DirectiveKind::Plain(_) => "plain",
            DirectiveKind::Wildcard(_) => "wildcard",
            DirectiveKind::Attribute { .. } => "attribute",
            DirectiveKind::OrChain { .. } => "or-chain",
            DirectiveKind::RepeatAnchor(_) => "repeat-anchor",
            DirectiveKind::FlattenAll(_) => "flatten-all",
        }
    }
}

/// A tag expression that failed to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDirective {
    pub source: String,
    pub error: DirectiveError,
}

/// Directives ready for evaluation plus the tags that were skipped.
#[derive(Debug, Clone, Default)]
pub struct ParsedDirectives {
    pub directives: Vec<Directive>,
    pub skipped: Vec<SkippedDirective>,
}

/// Parses every tag, skipping malformed ones with a warning.
pub fn parse_directives<S: AsRef<str>>(tags: &[S], options: &ExtractOptions) -> ParsedDirectives {
    let mut parsed = ParsedDirectives::default();
    for tag in tags {
        let source = tag.as_ref();
        match parse_directive(source, options) {
            Ok(directive) => parsed.directives.push(directive),
            Err(error) => {
                warn!(tag = source, %error, "skipping malformed tag expression");
                parsed.skipped.push(SkippedDirective {
                    source: source.to_string(),
                    error,
                });
            }
        }
    }
    parsed
}

/// Parses a single tag expression.
pub fn parse_directive(raw: &str, options: &ExtractOptions) -> Result<Directive, DirectiveError> {
    let parser = TagParser {
        namespace: &options.namespace,
        discriminator: &options.discriminator_attribute,
    };
    parser.parse(raw)
}

struct TagParser<'o> {
    namespace: &'o Namespace,
    discriminator: &'o str,
}

impl TagParser<'_> {
    fn parse(&self, raw: &str) -> Result<Directive, DirectiveError> {
        let tag = raw.trim();
        if tag.is_empty() {
            return Err(DirectiveError::Empty);
        }

        if tag.contains(REPEAT_MARKER) {
            let stripped = tag.replace(REPEAT_MARKER, "");
            let (path, key) = self.parse_path(&stripped)?;
            return Ok(self.directive(raw, DirectiveKind::RepeatAnchor(path), key, None));
        }
        if tag.contains(FLATTEN_MARKER) {
            let stripped = tag.replace(FLATTEN_MARKER, "");
            let (path, key) = self.parse_path(&stripped)?;
            return Ok(self.directive(raw, DirectiveKind::FlattenAll(path), key, None));
        }

        let (body, rename) = match tag.split_once(RENAME_MARKER) {
            Some((body, name)) => {
                let name = name.trim();
                if name.is_empty() || name.contains(RENAME_MARKER) {
                    return Err(DirectiveError::MalformedRename {
                        tag: tag.to_string(),
                    });
                }
                (body.trim(), Some(name.to_string()))
            }
            None => (tag, None),
        };

        if body.contains(ATTRIBUTE_MARKER) {
            let (owner, attribute, key) = self.parse_attribute(body)?;
            return Ok(self.directive(
                raw,
                DirectiveKind::Attribute { owner, attribute },
                key,
                rename,
            ));
        }

        if body.contains(OR_TARGET_MARKER) {
            let (chain, target) = body
                .rsplit_once(OR_TARGET_MARKER)
                .ok_or_else(|| DirectiveError::MissingOrTarget { tag: tag.to_string() })?;
            let target = target.trim();
            if target.is_empty() || target.contains(OR_MARKER) {
                return Err(DirectiveError::MissingOrTarget {
                    tag: tag.to_string(),
                });
            }
            let mut alternatives = Vec::new();
            let mut keys = Vec::new();
            for alternative in chain.split(OR_MARKER) {
                let (path, key) = self.parse_path(alternative)?;
                alternatives.push(Query::single(path));
                keys.push(key);
            }
            let kind = DirectiveKind::OrChain {
                alternatives,
                target: target.to_string(),
            };
            return Ok(self.directive(raw, kind, keys.join(OR_MARKER), rename));
        }

        if body.contains(OR_MARKER) {
            if !body.contains(WILDCARD_MARKER) {
                return Err(DirectiveError::MissingOrTarget {
                    tag: tag.to_string(),
                });
            }
            let mut branches = Vec::new();
            let mut keys = Vec::new();
            for alternative in body.split(OR_MARKER) {
                let (path, key) = self.parse_path(alternative)?;
                branches.push(path);
                keys.push(key);
            }
            let kind = DirectiveKind::Wildcard(Query::union(branches));
            return Ok(self.directive(raw, kind, keys.join(OR_MARKER), rename));
        }

        let (path, key) = self.parse_path(body)?;
        let kind = if body.contains(WILDCARD_MARKER) {
            DirectiveKind::Wildcard(Query::single(path))
        } else {
            DirectiveKind::Plain(Query::single(path))
        };
        Ok(self.directive(raw, kind, key, rename))
    }

    fn directive(
        &self,
        raw: &str,
        kind: DirectiveKind,
        key: String,
        rename: Option<String>,
    ) -> Directive {
        Directive {
            source: raw.to_string(),
            kind,
            key,
            rename,
        }
    }

    /// Parses `A>>B[@wd:type='X']` into a path and its qualified key.
    fn parse_path(&self, text: &str) -> Result<(Path, String), DirectiveError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(DirectiveError::EmptySegment {
                tag: text.to_string(),
            });
        }
        let mut steps = Vec::new();
        let mut rendered = Vec::new();
        for segment in text.split(SEGMENT_SEPARATOR) {
            let segment = segment.trim();
            if segment.is_empty() {
                return Err(DirectiveError::EmptySegment {
                    tag: text.to_string(),
                });
            }
            steps.push(self.parse_step(segment)?);
            rendered.push(self.qualify_segment(segment));
        }
        Ok((Path::new(steps), format!("./{}", rendered.join("/"))))
    }

    /// Splits `Owner>>@@attr` into the owner path and the attribute name.
    fn parse_attribute(&self, body: &str) -> Result<(Option<Path>, QName, String), DirectiveError> {
        let segments: Vec<&str> = body.split(SEGMENT_SEPARATOR).map(str::trim).collect();
        let Some((last, owners)) = segments.split_last() else {
            return Err(DirectiveError::Empty);
        };
        let Some(name) = last.strip_prefix(ATTRIBUTE_MARKER) else {
            return Err(DirectiveError::MisplacedAttribute {
                tag: body.to_string(),
            });
        };
        if owners.iter().any(|segment| segment.contains(ATTRIBUTE_MARKER)) {
            return Err(DirectiveError::MisplacedAttribute {
                tag: body.to_string(),
            });
        }
        let attribute = self.resolve_name(name.trim())?;
        let attribute_key = format!("@{}", self.qualify_segment(name.trim()));
        if owners.is_empty() {
            return Ok((None, attribute, format!("./{attribute_key}")));
        }
        let (owner, owner_key) = self.parse_path(&owners.join(SEGMENT_SEPARATOR))?;
        Ok((Some(owner), attribute, format!("{owner_key}/{attribute_key}")))
    }

    fn parse_step(&self, segment: &str) -> Result<Step, DirectiveError> {
        let (name, mut rest) = split_name(segment);
        let mut step = if name.contains(WILDCARD_MARKER) {
            self.parse_wildcard(name)?
        } else {
            Step::named(self.resolve_name(name)?)
        };
        while !rest.is_empty() {
            let (inner, remainder) = take_bracket(rest).ok_or_else(|| {
                DirectiveError::MalformedPredicate {
                    predicate: rest.to_string(),
                }
            })?;
            step.predicates.push(self.parse_predicate(inner)?);
            rest = remainder.trim_start();
        }
        Ok(step)
    }

    /// Compiles `%term?=kind%`.
    fn parse_wildcard(&self, name: &str) -> Result<Step, DirectiveError> {
        let malformed = || DirectiveError::MalformedWildcard {
            segment: name.to_string(),
        };
        let inner = name
            .strip_prefix(WILDCARD_MARKER)
            .and_then(|s| s.strip_suffix(WILDCARD_MARKER))
            .ok_or_else(malformed)?;
        if inner.contains(WILDCARD_MARKER) {
            return Err(malformed());
        }
        let (term, kind) = inner.split_once(WILDCARD_KIND_MARKER).ok_or_else(malformed)?;
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return Err(malformed());
        }
        let uri = Some(self.namespace.uri.as_str());
        let step = match kind.trim() {
            "type" => Step {
                test: NameTest::Named(QName::new(uri, WILDCARD_ID_ELEMENT)),
                predicates: vec![Predicate::Contains {
                    subject: ContainsSubject::Attribute(QName::new(uri, self.discriminator)),
                    term,
                }],
            },
            "text" => Step {
                test: NameTest::Named(QName::new(uri, WILDCARD_ID_ELEMENT)),
                predicates: vec![Predicate::Contains {
                    subject: ContainsSubject::Text,
                    term,
                }],
            },
            "tag" => Step {
                test: NameTest::Any,
                predicates: vec![Predicate::Contains {
                    subject: ContainsSubject::LocalName,
                    term,
                }],
            },
            other => {
                return Err(DirectiveError::UnknownWildcardKind {
                    kind: other.to_string(),
                });
            }
        };
        Ok(step)
    }

    fn parse_predicate(&self, inner: &str) -> Result<Predicate, DirectiveError> {
        let inner = inner.trim();
        let malformed = || DirectiveError::MalformedPredicate {
            predicate: format!("[{inner}]"),
        };
        if !inner.is_empty() && inner.chars().all(|ch| ch.is_ascii_digit()) {
            let position: usize = inner.parse().map_err(|_| malformed())?;
            if position == 0 {
                return Err(malformed());
            }
            return Ok(Predicate::Position(position));
        }
        let Some(expression) = inner.strip_prefix('@') else {
            return Err(malformed());
        };
        match expression.split_once('=') {
            Some((name, literal)) => {
                let attribute = self.resolve_attribute_name(name.trim())?;
                let value = unquote(literal.trim()).ok_or_else(malformed)?;
                Ok(Predicate::AttributeEquals {
                    attribute,
                    value: value.to_string(),
                })
            }
            None => Ok(Predicate::HasAttribute(
                self.resolve_attribute_name(expression.trim())?,
            )),
        }
    }

    /// Element names are qualified with the configured namespace when
    /// unprefixed.
    fn resolve_name(&self, name: &str) -> Result<QName, DirectiveError> {
        match name.split_once(':') {
            Some((prefix, local)) => {
                let uri = self.prefix_uri(prefix)?;
                validate_local(local)?;
                Ok(QName::new(Some(uri), local))
            }
            None => {
                validate_local(name)?;
                Ok(QName::new(Some(&self.namespace.uri), name))
            }
        }
    }

    /// Attribute names inside predicates follow XPath: unprefixed means no
    /// namespace.
    fn resolve_attribute_name(&self, name: &str) -> Result<QName, DirectiveError> {
        match name.split_once(':') {
            Some((prefix, local)) => {
                let uri = self.prefix_uri(prefix)?;
                validate_local(local)?;
                Ok(QName::new(Some(uri), local))
            }
            None => {
                validate_local(name)?;
                Ok(QName::new(None, name))
            }
        }
    }

    fn prefix_uri(&self, prefix: &str) -> Result<&str, DirectiveError> {
        if prefix == self.namespace.prefix {
            Ok(&self.namespace.uri)
        } else {
            Err(DirectiveError::UnknownPrefix {
                prefix: prefix.to_string(),
            })
        }
    }

    fn qualify_segment(&self, segment: &str) -> String {
        let (name, _) = split_name(segment);
        if name.contains(':') {
            segment.to_string()
        } else {
            self.namespace.qualify(segment)
        }
    }
}

/// Splits a segment into its name and the trailing predicate text.
fn split_name(segment: &str) -> (&str, &str) {
    match segment.find('[') {
        Some(index) => (segment[..index].trim(), &segment[index..]),
        None => (segment, ""),
    }
}

/// Takes one `[...]` group off the front of `text`, honouring quotes.
fn take_bracket(text: &str) -> Option<(&str, &str)> {
    let body = text.strip_prefix('[')?;
    let mut quote: Option<char> = None;
    for (index, ch) in body.char_indices() {
        match (quote, ch) {
            (Some(open), c) if c == open => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(ch),
            (None, ']') => return Some((&body[..index], &body[index + 1..])),
            (None, _) => {}
        }
    }
    None
}

fn unquote(literal: &str) -> Option<&str> {
    literal
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| literal.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
}

fn validate_local(name: &str) -> Result<(), DirectiveError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(DirectiveError::InvalidName {
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wws_model::WORKDAY_NAMESPACE_URI;

    fn parse(tag: &str) -> Directive {
        parse_directive(tag, &ExtractOptions::default()).expect("parse tag")
    }

    fn parse_err(tag: &str) -> DirectiveError {
        parse_directive(tag, &ExtractOptions::default()).expect_err("tag should fail")
    }

    #[test]
    fn plain_path_is_qualified() {
        let directive = parse("Journal_Entry_Line_Data>>Memo");
        assert_eq!(directive.key, "./wd:Journal_Entry_Line_Data/wd:Memo");
        assert_eq!(directive.column(), directive.key);
        let DirectiveKind::Plain(query) = &directive.kind else {
            panic!("expected plain directive, got {:?}", directive.kind);
        };
        assert_eq!(query.branches[0].steps.len(), 2);
        assert_eq!(
            query.branches[0].steps[1].test,
            NameTest::Named(QName::new(Some(WORKDAY_NAMESPACE_URI), "Memo"))
        );
    }

    #[test]
    fn rename_overrides_column() {
        let directive =
            parse("Worktags_Reference>>ID[@wd:type='Revenue_Category_ID']^^Employee_ID");
        assert_eq!(directive.column(), "Employee_ID");
        assert_eq!(
            directive.key,
            "./wd:Worktags_Reference/wd:ID[@wd:type='Revenue_Category_ID']"
        );
        let DirectiveKind::Plain(query) = &directive.kind else {
            panic!("expected plain directive");
        };
        assert_eq!(
            query.branches[0].steps[1].predicates,
            vec![Predicate::AttributeEquals {
                attribute: QName::new(Some(WORKDAY_NAMESPACE_URI), "type"),
                value: "Revenue_Category_ID".into(),
            }]
        );
    }

    #[test]
    fn repeat_anchor_strips_marker() {
        let directive = parse("*Journal_Entry_Line_Data");
        assert_eq!(directive.kind_name(), "repeat-anchor");
        assert_eq!(directive.key, "./wd:Journal_Entry_Line_Data");
    }

    #[test]
    fn flatten_all_strips_marker() {
        let directive = parse("~Worker_Data>>Personal_Data");
        assert_eq!(directive.kind_name(), "flatten-all");
        assert_eq!(directive.key, "./wd:Worker_Data/wd:Personal_Data");
    }

    #[test]
    fn attribute_on_context_and_nested() {
        let direct = parse("@@Primary_Job");
        assert_eq!(direct.key, "./@wd:Primary_Job");
        assert!(matches!(
            direct.kind,
            DirectiveKind::Attribute { owner: None, .. }
        ));

        let nested = parse("Worker_Data>>@@Primary_Job");
        assert_eq!(nested.key, "./wd:Worker_Data/@wd:Primary_Job");
        assert!(matches!(
            nested.kind,
            DirectiveKind::Attribute { owner: Some(_), .. }
        ));
    }

    #[test]
    fn or_chain_keeps_alternatives_in_order() {
        let directive = parse("Foo>>Bar[@wd:type='X']||Foo>>Baz[@wd:type='Y']|=Kind");
        let DirectiveKind::OrChain {
            alternatives,
            target,
        } = &directive.kind
        else {
            panic!("expected or-chain");
        };
        assert_eq!(target, "Kind");
        assert_eq!(alternatives.len(), 2);
        assert_eq!(
            alternatives[1].branches[0].steps[1].test,
            NameTest::Named(QName::new(Some(WORKDAY_NAMESPACE_URI), "Baz"))
        );
    }

    #[test]
    fn wildcard_kinds_compile() {
        let by_type = parse("Worktags_Reference>>%cost?=type%");
        let DirectiveKind::Wildcard(query) = &by_type.kind else {
            panic!("expected wildcard");
        };
        let step = &query.branches[0].steps[1];
        assert_eq!(
            step.test,
            NameTest::Named(QName::new(Some(WORKDAY_NAMESPACE_URI), "ID"))
        );
        assert_eq!(
            step.predicates,
            vec![Predicate::Contains {
                subject: ContainsSubject::Attribute(QName::new(
                    Some(WORKDAY_NAMESPACE_URI),
                    "type"
                )),
                term: "cost".into(),
            }]
        );

        let by_tag = parse("%START?=tag%");
        let DirectiveKind::Wildcard(query) = &by_tag.kind else {
            panic!("expected wildcard");
        };
        assert_eq!(query.branches[0].steps[0].test, NameTest::Any);
        assert_eq!(
            query.branches[0].steps[0].predicates,
            vec![Predicate::Contains {
                subject: ContainsSubject::LocalName,
                term: "start".into(),
            }]
        );
        assert_eq!(by_tag.key, "./wd:%START?=tag%");
    }

    #[test]
    fn wildcard_alternatives_form_a_union() {
        let directive = parse("%start?=tag%||%end?=tag%^^Dates");
        let DirectiveKind::Wildcard(query) = &directive.kind else {
            panic!("expected wildcard union");
        };
        assert_eq!(query.branches.len(), 2);
        assert_eq!(directive.column(), "Dates");
    }

    #[test]
    fn malformed_tags_are_errors() {
        assert!(matches!(
            parse_err("Foo>>%cost%"),
            DirectiveError::MalformedWildcard { .. }
        ));
        assert!(matches!(
            parse_err("Foo>>%cost?=colour%"),
            DirectiveError::UnknownWildcardKind { .. }
        ));
        assert!(matches!(
            parse_err("Foo>>Bar||Foo>>Baz"),
            DirectiveError::MissingOrTarget { .. }
        ));
        assert!(matches!(
            parse_err("Foo>>Bar^^"),
            DirectiveError::MalformedRename { .. }
        ));
        assert!(matches!(
            parse_err("Foo>>>>Bar"),
            DirectiveError::EmptySegment { .. }
        ));
        assert!(matches!(
            parse_err("Foo>>ID[@wd:type='X'"),
            DirectiveError::MalformedPredicate { .. }
        ));
        assert!(matches!(
            parse_err("env:Body"),
            DirectiveError::UnknownPrefix { .. }
        ));
        assert_eq!(parse_err("   "), DirectiveError::Empty);
    }

    #[test]
    fn bracket_parser_honours_quotes() {
        assert_eq!(take_bracket("['a]b']rest"), Some(("'a]b'", "rest")));
        assert_eq!(take_bracket("[1][2]"), Some(("1", "[2]")));
        assert_eq!(take_bracket("[open"), None);
    }

    #[test]
    fn parse_directives_skips_bad_tags() {
        let parsed = parse_directives(
            &["Journal_Number", "Foo>>%bad%", "Memo"],
            &ExtractOptions::default(),
        );
        assert_eq!(parsed.directives.len(), 2);
        assert_eq!(parsed.skipped.len(), 1);
        assert_eq!(parsed.skipped[0].source, "Foo>>%bad%");
    }
}
