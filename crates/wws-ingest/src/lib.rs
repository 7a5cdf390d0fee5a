//! Retrieval of Workday Web Services responses.
//!
//! - [`envelope`]: authenticated SOAP envelopes.
//! - [`paging`]: `Total_Pages` discovery and concurrent page fetches.
//! - [`http`]: the blocking HTTP transport.
//! - [`files`]: saved response pages on disk.
//! - [`dump`]: dictionary/JSON views of raw responses.

pub mod dump;
pub mod envelope;
pub mod error;
pub mod files;
pub mod http;
pub mod paging;

pub use dump::{document_to_value, to_dict, write_json_dumps};
pub use envelope::build_envelope;
pub use error::{IngestError, Result};
pub use files::{expand_inputs, list_response_files, read_documents, write_pages};
pub use http::HttpFetcher;
pub use paging::{
    DEFAULT_CONCURRENCY, FetchObserver, MAX_PAGES, PageFetcher, fetch_all_pages, render_page,
    total_pages,
};
