use serde::Deserialize;

// Search responses

#[derive(Debug, Deserialize)]
pub struct SearchResponse<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct MovieResult {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub original_title: String,
    pub release_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TvResult {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub original_name: String,
    pub first_air_date: Option<String>,
}

/// Combined-search row; movie fields and TV fields are mutually exclusive,
/// discriminated by `media_type` (person rows are dropped).
#[derive(Debug, Deserialize)]
pub struct MultiResult {
    pub id: i64,
    pub media_type: String,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub release_date: Option<String>,
    pub name: Option<String>,
    pub original_name: Option<String>,
    pub first_air_date: Option<String>,
}

// Detail responses

#[derive(Debug, Deserialize)]
pub struct MovieDetails {
    pub id: i64,
    pub title: String,
    pub original_title: Option<String>,
    pub release_date: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub vote_average: Option<f64>,
    pub status: Option<String>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    pub alternative_titles: Option<AlternativeTitles>,
    pub translations: Option<Translations>,
    pub credits: Option<Credits>,
}

#[derive(Debug, Deserialize)]
pub struct TvDetails {
    pub id: i64,
    pub name: String,
    pub original_name: Option<String>,
    pub first_air_date: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub vote_average: Option<f64>,
    pub status: Option<String>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub seasons: Vec<Season>,
    pub alternative_titles: Option<AlternativeTitles>,
    pub translations: Option<Translations>,
    pub credits: Option<Credits>,
}

#[derive(Debug, Deserialize)]
pub struct Genre {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct Season {
    pub season_number: i32,
    pub name: Option<String>,
    pub air_date: Option<String>,
    pub episode_count: Option<i32>,
}

/// Alternate-title sub-resource. Movie payloads use `titles`, TV payloads
/// use `results`; only one is populated for a given record.
#[derive(Debug, Default, Deserialize)]
pub struct AlternativeTitles {
    #[serde(default)]
    pub titles: Vec<AltTitle>,
    #[serde(default)]
    pub results: Vec<AltTitle>,
}

#[derive(Debug, Deserialize)]
pub struct AltTitle {
    pub title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Translations {
    #[serde(default)]
    pub translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
pub struct Translation {
    #[serde(default)]
    pub data: TranslationData,
}

/// Translated name payload: `title` for movies, `name` for TV.
#[derive(Debug, Default, Deserialize)]
pub struct TranslationData {
    pub title: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastMember>,
    #[serde(default)]
    pub crew: Vec<CrewMember>,
}

#[derive(Debug, Deserialize)]
pub struct CastMember {
    pub id: i64,
    pub name: String,
    pub character: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CrewMember {
    pub id: i64,
    pub name: String,
    pub job: Option<String>,
}
