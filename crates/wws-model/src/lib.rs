//! Shared types for Workday Web Services extraction.

pub mod error;
pub mod job;
pub mod options;
pub mod row;

pub use error::{ModelError, Result};
pub use job::{ExtractJob, load_job};
pub use options::{
    DEFAULT_DISCRIMINATOR_ATTRIBUTE, DEFAULT_MAX_KEY_LENGTH, ExtractOptions, Namespace,
    WORKDAY_NAMESPACE_PREFIX, WORKDAY_NAMESPACE_URI,
};
pub use row::{Row, Value};
