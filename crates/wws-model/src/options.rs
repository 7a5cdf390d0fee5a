//! Extraction options shared by the engine, the ingest helpers and the CLI.

use serde::{Deserialize, Serialize};

/// Namespace URI used by Workday Web Services responses.
pub const WORKDAY_NAMESPACE_URI: &str = "urn:com.workday/bsvc";

/// Prefix conventionally bound to [`WORKDAY_NAMESPACE_URI`].
pub const WORKDAY_NAMESPACE_PREFIX: &str = "wd";

/// Longest flattened column key kept as-is (PostgreSQL identifier limit).
pub const DEFAULT_MAX_KEY_LENGTH: usize = 63;

/// Attribute read from the winning alternative of an OR chain.
pub const DEFAULT_DISCRIMINATOR_ATTRIBUTE: &str = "type";

/// A namespace binding: the prefix used inside tag expressions and the URI
/// it resolves to in the documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub prefix: String,
    pub uri: String,
}

impl Namespace {
    pub fn new(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            uri: uri.into(),
        }
    }

    /// The `wd` / `urn:com.workday/bsvc` binding.
    pub fn workday() -> Self {
        Self::new(WORKDAY_NAMESPACE_PREFIX, WORKDAY_NAMESPACE_URI)
    }

    /// Returns `name` qualified with this prefix, e.g. `wd:Memo`.
    pub fn qualify(&self, name: &str) -> String {
        format!("{}:{name}", self.prefix)
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::workday()
    }
}

/// Options controlling a single extraction run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// Pack multi-valued leaves into per-row lists instead of forking rows.
    pub allow_collections: bool,
    /// Namespace the record elements and tag expressions live in.
    pub namespace: Namespace,
    /// Maximum length of keys synthesized by flatten-all directives.
    pub max_key_length: usize,
    /// Local name of the (namespace-qualified) discriminator attribute.
    pub discriminator_attribute: String,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            allow_collections: false,
            namespace: Namespace::default(),
            max_key_length: DEFAULT_MAX_KEY_LENGTH,
            discriminator_attribute: DEFAULT_DISCRIMINATOR_ATTRIBUTE.to_string(),
        }
    }
}

impl ExtractOptions {
    #[must_use]
    pub fn with_allow_collections(mut self, enable: bool) -> Self {
        self.allow_collections = enable;
        self
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: Namespace) -> Self {
        self.namespace = namespace;
        self
    }

    #[must_use]
    pub fn with_max_key_length(mut self, max_key_length: usize) -> Self {
        self.max_key_length = max_key_length;
        self
    }

    #[must_use]
    pub fn with_discriminator_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.discriminator_attribute = attribute.into();
        self
    }
}
