mod media;
mod metadata;

pub use media::{Candidate, MediaType, ParsedName};
pub use metadata::{MediaDetail, PersonInfo, SeasonInfo};
