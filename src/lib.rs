//! Resolve messy media release names into canonical metadata records.
//!
//! The entry point is [`MediaResolver`]: hand it a [`ParsedName`] produced by
//! an external filename parser and it walks an ordered chain of search
//! strategies against the metadata provider, falling back to web scraping and
//! search-engine keyword extraction when the structured search comes up empty.
//! Confirmed hits and confirmed misses are both written through to a
//! [`CacheStore`] so repeated resolutions become a single detail lookup by id.

mod cache;
mod config;
mod keyword;
mod matcher;
mod provider;
mod resolver;
mod strategy;
mod titles;
mod types;
mod web_search;


pub use cache::{CacheEntry, CacheStore, MemoryCacheStore, resolution_key};
pub use config::{KeywordConfig, MatchMode, ResolverConfig};
pub use keyword::KeywordExtractor;
pub use matcher::names_equal;
pub use provider::{HttpClient, HttpPageFetcher, MetadataClient, PageFetcher, TmdbClient};
pub use resolver::{MediaResolver, ResolveOptions};
pub use types::{Candidate, MediaDetail, MediaType, ParsedName, PersonInfo, SeasonInfo};

/// Resolver result type
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Resolver error types
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("api error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("resolution cancelled")]
    Cancelled,
}
