use serde::{Deserialize, Serialize};

/// Media type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Unknown,
    Movie,
    Tv,
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Movie => write!(f, "movie"),
            Self::Tv => write!(f, "tv"),
        }
    }
}

/// Structured guess produced by an external filename parser.
///
/// Immutable input to the resolver; the parser itself lives outside this
/// crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedName {
    /// Title candidate extracted from the raw name, used for matching
    pub title: String,
    /// The raw input string the parser saw
    pub original: String,
    /// Release/first-air year, when the parser found one
    pub year: Option<i32>,
    /// Parser's media type guess
    pub media_type: MediaType,
    /// First season number for TV releases
    pub begin_season: Option<i32>,
}

impl ParsedName {
    pub fn new(title: impl Into<String>, media_type: MediaType) -> Self {
        let title = title.into();
        Self {
            original: title.clone(),
            title,
            year: None,
            media_type,
            begin_season: None,
        }
    }

    pub fn with_year(mut self, year: Option<i32>) -> Self {
        self.year = year;
        self
    }

    pub fn with_season(mut self, season: Option<i32>) -> Self {
        self.begin_season = season;
        self
    }
}

/// One raw search result from the metadata provider, not yet confirmed.
///
/// Movie rows (`title`/`original_title`/`release_date`) and TV rows
/// (`name`/`original_name`/`first_air_date`) are unified here by the
/// provider client; `media_type` records which shape the row came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: i64,
    pub media_type: MediaType,
    pub title: String,
    pub original_title: String,
    /// Release date (movies) or first air date (TV), `YYYY-MM-DD`
    pub release_date: Option<String>,
}

impl Candidate {
    /// The four-digit year prefix of the release date, when present.
    pub fn release_year(&self) -> Option<&str> {
        self.release_date
            .as_deref()
            .filter(|d| d.len() >= 4)
            .map(|d| &d[..4])
    }

    /// Whether the release date starts with the given year.
    pub fn matches_year(&self, year: i32) -> bool {
        self.release_year() == Some(year.to_string().as_str())
    }
}
