use crate::error::{FetchError, SchemaError};
use crate::models::Snippet;
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Anything that can turn a URI into a JSON document.
#[async_trait]
pub trait SnippetSource: Send + Sync {
    async fn fetch_json(&self, uri: &str) -> Result<Value, FetchError>;
}

/// Fetches `http(s)://` URIs over the network and reads everything else from disk.
#[derive(Debug, Clone)]
pub struct WebSource {
    client: reqwest::Client,
}

impl WebSource {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("snix-compose/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    async fn fetch_http(&self, uri: &str) -> Result<Value, FetchError> {
        let network = |source| FetchError::Network {
            uri: uri.to_string(),
            source,
        };
        let response = self.client.get(uri).send().await.map_err(network)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                uri: uri.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.text().await.map_err(network)?;
        serde_json::from_str(&body).map_err(|e| schema_error(uri, e.into()))
    }

    async fn fetch_file(&self, uri: &str) -> Result<Value, FetchError> {
        let path = uri.strip_prefix("file://").unwrap_or(uri);
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| FetchError::Io {
                uri: uri.to_string(),
                source,
            })?;

        let is_yaml = Path::new(path)
            .extension()
            .is_some_and(|ext| ext == "yaml" || ext == "yml");
        if is_yaml {
            serde_yaml::from_str(&content).map_err(|e| schema_error(uri, e.into()))
        } else {
            serde_json::from_str(&content).map_err(|e| schema_error(uri, e.into()))
        }
    }
}

#[async_trait]
impl SnippetSource for WebSource {
    async fn fetch_json(&self, uri: &str) -> Result<Value, FetchError> {
        debug!(uri, "fetching");
        if uri.starts_with("http://") || uri.starts_with("https://") {
            self.fetch_http(uri).await
        } else {
            self.fetch_file(uri).await
        }
    }
}

pub(crate) fn schema_error(uri: &str, source: SchemaError) -> FetchError {
    FetchError::Schema {
        uri: uri.to_string(),
        source,
    }
}

/// Turns a `{"err": "..."}` document into [`FetchError::Remote`].
pub(crate) fn reject_error_document(uri: &str, value: Value) -> Result<Value, FetchError> {
    match value.get("err").and_then(Value::as_str) {
        Some(message) => Err(FetchError::Remote {
            uri: uri.to_string(),
            message: message.to_string(),
        }),
        None => Ok(value),
    }
}

/// Fetches and validates a single snippet definition. Fetched snippets are read-only.
pub async fn fetch_snippet(source: &dyn SnippetSource, uri: &str) -> Result<Snippet, FetchError> {
    let value = reject_error_document(uri, source.fetch_json(uri).await?)?;
    let mut snippet: Snippet =
        serde_json::from_value(value).map_err(|e| schema_error(uri, e.into()))?;

    let issues = snippet.schema_issues(false);
    if !issues.is_empty() {
        return Err(schema_error(uri, SchemaError::Invalid(issues)));
    }
    snippet.readonly = true;
    Ok(snippet)
}
