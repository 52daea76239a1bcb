//! Error types for the composition engine.
//!
//! Placeholder validation failures are plain data ([`ValidationError`]) and never
//! abort anything. Everything else is an [`EngineError`] variant.

use serde::{Deserialize, Serialize};

/// A placeholder value that does not satisfy its pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{snippet_name}.{placeholder_id}: {message}")]
pub struct ValidationError {
    pub snippet_name: String,
    pub placeholder_id: String,
    pub message: String,
}

/// A persisted or fetched payload that does not match the data model.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("payload failed validation: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Failure while pulling a document from a remote or local source.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {uri} failed: {source}")]
    Network {
        uri: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{uri} answered with status {status}")]
    Status { uri: String, status: u16 },

    #[error("could not read {uri}: {source}")]
    Io {
        uri: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{uri} reported an error: {message}")]
    Remote { uri: String, message: String },

    #[error("{uri} is not a valid document: {source}")]
    Schema {
        uri: String,
        #[source]
        source: SchemaError,
    },

    #[error("imports nested deeper than {0} levels")]
    TooDeep(usize),

    #[error("import resolution was cancelled")]
    Cancelled,
}

/// The snippet list and the link table disagree about which snippets exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{snippets} snippets but {link_keys} link table entries")]
pub struct IntegrityError {
    pub snippets: usize,
    pub link_keys: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("snippet `{0}` not found")]
    SnippetNotFound(String),

    #[error("placeholder `{placeholder}` not found in snippet `{snippet}`")]
    PlaceholderNotFound { snippet: String, placeholder: String },

    #[error("invalid snippet name `{0}`")]
    InvalidName(String),

    #[error("invalid placeholder: {0}")]
    InvalidPlaceholder(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("corrupted state: {0}")]
    Integrity(#[from] IntegrityError),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
