//! TOML job files describing one extraction.
//!
//! ```toml
//! start_tag = "Journal_Entry_Data"
//! tags = [
//!     "Journal_Number",
//!     "*Journal_Entry_Line_Data",
//!     "Debit_Amount",
//! ]
//!
//! [options]
//! allow_collections = false
//! max_key_length = 63
//!
//! [options.namespace]
//! prefix = "wd"
//! uri = "urn:com.workday/bsvc"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::options::ExtractOptions;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractJob {
    /// Local name of the record element.
    pub start_tag: String,
    /// Tag expressions, one per output column (order matters).
    pub tags: Vec<String>,
    #[serde(default)]
    pub options: ExtractOptions,
}

impl ExtractJob {
    pub fn new(start_tag: impl Into<String>, tags: Vec<String>) -> Self {
        Self {
            start_tag: start_tag.into(),
            tags,
            options: ExtractOptions::default(),
        }
    }

    /// Parses a job from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let job: Self = toml::from_str(text).map_err(|source| ModelError::Toml {
            path: None,
            source,
        })?;
        job.validate()?;
        Ok(job)
    }

    pub fn validate(&self) -> Result<()> {
        if self.start_tag.trim().is_empty() {
            return Err(ModelError::InvalidJob {
                message: "start_tag must not be empty".to_string(),
            });
        }
        if self.tags.is_empty() {
            return Err(ModelError::InvalidJob {
                message: "at least one tag expression is required".to_string(),
            });
        }
        if self.options.namespace.prefix.trim().is_empty() {
            return Err(ModelError::InvalidJob {
                message: "namespace prefix must not be empty".to_string(),
            });
        }
        if self.options.max_key_length == 0 {
            return Err(ModelError::InvalidJob {
                message: "max_key_length must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Loads and validates a job file.
pub fn load_job(path: &Path) -> Result<ExtractJob> {
    let text = std::fs::read_to_string(path).map_err(|source| ModelError::io(path, source))?;
    let job: ExtractJob = toml::from_str(&text).map_err(|source| ModelError::Toml {
        path: Some(path.to_path_buf()),
        source,
    })?;
    job.validate()?;
    Ok(job)
}
