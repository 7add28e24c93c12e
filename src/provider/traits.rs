use crate::Result;
use crate::types::{Candidate, MediaDetail, MediaType};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Structured search and detail lookup against the metadata provider.
///
/// Every call takes the resolution's cancellation token; implementations
/// must stop work promptly once it fires. Failures are provider or
/// transport errors — callers in the strategy layer downgrade them to
/// "no candidate" rather than propagating.
#[async_trait]
pub trait MetadataClient: Send + Sync {
    /// Search movies, optionally constrained by release year.
    async fn search_movies(
        &self,
        query: &str,
        year: Option<i32>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Candidate>>;

    /// Search TV shows, optionally constrained by first-air-date year.
    async fn search_tv(
        &self,
        query: &str,
        first_air_year: Option<i32>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Candidate>>;

    /// Combined movie + TV search.
    async fn search_multi(&self, query: &str, cancel: &CancellationToken)
    -> Result<Vec<Candidate>>;

    /// Fetch the full detail record for an id, including alternate titles,
    /// translations, seasons and credits. `Ok(None)` when the id is unknown.
    async fn get_detail(
        &self,
        media_type: MediaType,
        id: i64,
        cancel: &CancellationToken,
    ) -> Result<Option<MediaDetail>>;
}

/// Plain page transport used by the scraping fallbacks.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a page, returning the HTTP status code and body.
    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<(u16, String)>;
}
