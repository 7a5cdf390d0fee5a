//! Error types for the extraction engine.
//!
//! - [`ExtractError`]: fatal input problems; the whole call fails.
//! - [`DirectiveError`]: a single malformed tag expression; the tag is
//!   skipped and extraction continues.

use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no responses returned from API")]
    NoDocuments,

    #[error("response {index} is not valid UTF-8: {source}")]
    Encoding {
        index: usize,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("response {index} is not well-formed XML: {source}")]
    Xml {
        index: usize,
        #[source]
        source: roxmltree::Error,
    },

    #[error("start tag must not be empty")]
    EmptyStartTag,

    #[error("failed to build table: {0}")]
    Table(#[from] PolarsError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectiveError {
    #[error("empty tag expression")]
    Empty,

    #[error("empty path segment in `{tag}`")]
    EmptySegment { tag: String },

    #[error("invalid element or attribute name `{name}`")]
    InvalidName { name: String },

    #[error("unknown namespace prefix `{prefix}`")]
    UnknownPrefix { prefix: String },

    #[error("malformed predicate `{predicate}`")]
    MalformedPredicate { predicate: String },

    #[error("malformed wildcard `{segment}`: expected %term?=kind%")]
    MalformedWildcard { segment: String },

    #[error("unknown wildcard kind `{kind}`: expected type, text or tag")]
    UnknownWildcardKind { kind: String },

    #[error("OR chain `{tag}` must end with `|=name`")]
    MissingOrTarget { tag: String },

    #[error("`^^` must be followed by a single column name in `{tag}`")]
    MalformedRename { tag: String },

    #[error("`@@attribute` must be the last segment in `{tag}`")]
    MisplacedAttribute { tag: String },
}

pub type Result<T> = std::result::Result<T, ExtractError>;
