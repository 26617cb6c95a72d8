pub use async_trait::async_trait;

pub mod bibfile;
pub mod crossref;
pub mod zbmath;

use crate::identity::AuthorIdentity;
use crate::record::{CanonicalRecord, RawRecord};
use reqwest::Client;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Source unavailable: {0}")]
    Unavailable(String),
    #[error("Malformed source data: {0}")]
    Malformed(String),
    #[error("Source file not found: {0}")]
    Missing(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        SourceError::Unavailable(e.to_string())
    }
}

/// A bibliographic data source feeding the page pipeline
#[async_trait]
pub trait Source: Send + Sync {
    /// Fetch or read every raw record the source offers
    async fn fetch_records(&self) -> Result<Vec<RawRecord>, SourceError>;

    /// Whether any author of `record` is `identity`
    fn matches_author(&self, record: &RawRecord, identity: &AuthorIdentity) -> bool;

    /// Map provider fields onto the canonical record
    fn to_canonical(&self, record: &RawRecord) -> CanonicalRecord;

    /// Whether records must be ordered by year (newest first) before rendering
    fn sorts_by_year(&self) -> bool {
        false
    }

    /// Label of the provider document link, for sources that have one
    fn provider_label(&self) -> Option<&'static str> {
        None
    }

    /// Get the name of this source
    fn name(&self) -> &'static str;
}

/// HTTP client carrying the descriptive user agent the public APIs ask for
pub(crate) fn http_client(user_agent: &str) -> Result<Client, SourceError> {
    Client::builder()
        .user_agent(user_agent)
        .build()
        .map_err(|e| SourceError::Unavailable(format!("Failed to create HTTP client: {}", e)))
}

/// Read a successful response body as JSON
pub(crate) async fn fetch_json(
    request: reqwest::RequestBuilder,
    source: &str,
) -> Result<serde_json::Value, SourceError> {
    let response = request.send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Unavailable(format!("{} HTTP {}", source, status)));
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        SourceError::Malformed(format!("Failed to parse {} response: {}", source, e))
    })
}
