//! Error types for response retrieval and dumps.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("response is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("response is not well-formed XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("{element} element not found in response")]
    MissingElement { element: String },

    #[error("{element} is not a page count: {value:?}")]
    InvalidPageCount { element: String, value: String },

    #[error("response reports {pages} pages; refusing to fetch more than {limit}")]
    TooManyPages { pages: usize, limit: usize },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },

    #[error("failed to write SOAP envelope: {0}")]
    Envelope(#[source] std::io::Error),

    #[error("failed to read response for dump: {0}")]
    Dump(#[from] quick_xml::Error),

    #[error("failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("page {page} was never received")]
    MissingPage { page: usize },
}

impl IngestError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
