mod http;
mod tmdb;
mod traits;

pub use http::{HttpClient, HttpPageFetcher};
pub use tmdb::TmdbClient;
pub use traits::{MetadataClient, PageFetcher};
