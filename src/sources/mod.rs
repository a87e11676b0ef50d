//! Source adapters - one per external metadata provider
//!
//! Each adapter answers code, keyword and URL lookups with at most one
//! normalized [`SourceRecord`]. Provider failures of any kind (transport,
//! non-success status, unexpected payload shape) are absorbed at this boundary
//! and reported as "no result".
//!
//! - `spotify`: Commercial catalog, bearer credential via client-credential exchange
//! - `musicbrainz`: Open catalog, fixed identifying header and a request rate ceiling

mod musicbrainz;
mod spotify;

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::model::{Source, SourceRecord};
use crate::query::{KeywordQuery, ProviderUrl, SearchQuery};

pub use musicbrainz::MusicBrainzAdapter;
pub use spotify::SpotifyAdapter;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider replied with status {0}")]
    Status(u16),

    #[error("unexpected payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("no client credentials configured")]
    MissingCredentials,

    #[error("token lifetime out of range: {0}s")]
    InvalidToken(i64),
}

/// Lookups against one provider
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> Source;

    fn lookup_code(&self, code: &str) -> impl Future<Output = Option<SourceRecord>> + Send;

    fn lookup_keywords(&self, query: &KeywordQuery) -> impl Future<Output = Option<SourceRecord>> + Send;

    fn lookup_url(&self, url: &ProviderUrl) -> impl Future<Output = Option<SourceRecord>> + Send;

    /// Dispatch a canonical query to the matching lookup
    fn lookup(&self, query: &SearchQuery) -> impl Future<Output = Option<SourceRecord>> + Send {
        async move {
            match query {
                SearchQuery::Code(code) => self.lookup_code(code).await,
                SearchQuery::Keyword(keywords) => self.lookup_keywords(keywords).await,
                SearchQuery::Url(url) => self.lookup_url(url).await,
            }
        }
    }
}

pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}

/// Fold a provider outcome into "record or no result", logging absorbed failures
pub(crate) fn absorb(
    source: Source,
    operation: &'static str,
    result: Result<Option<SourceRecord>, FetchError>,
) -> Option<SourceRecord> {
    match result {
        Ok(Some(record)) => {
            tracing::info!(provider = %source, operation, id = %record.id, "Provider returned a record");
            Some(record)
        }
        Ok(None) => {
            tracing::info!(provider = %source, operation, "Provider found nothing");
            None
        }
        Err(e) => {
            tracing::warn!(provider = %source, operation, error = %e, "Provider lookup failed, treating as no result");
            None
        }
    }
}

/// Read a JSON body into an explicit schema, failing closed on any mismatch
pub(crate) async fn decode<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, FetchError> {
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}
