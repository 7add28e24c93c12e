use super::MediaType;
use serde::{Deserialize, Serialize};

/// Full detail record for a confirmed media item.
///
/// Alternate titles and translated titles arrive flattened to plain name
/// lists; the nested provider payload shapes stay inside the provider
/// module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaDetail {
    /// Provider ID
    pub id: i64,
    /// Media type the record was fetched as
    pub media_type: MediaType,
    /// Primary title (localized to the configured language)
    pub title: String,
    /// Original/native title
    pub original_title: Option<String>,
    /// Release date (movies) or first air date (TV), `YYYY-MM-DD`
    pub release_date: Option<String>,
    /// Full description/plot
    pub overview: Option<String>,
    /// Poster image path
    pub poster_path: Option<String>,
    /// Backdrop image path
    pub backdrop_path: Option<String>,
    /// Rating (0-10 scale)
    pub vote_average: Option<f64>,
    /// Status (e.g., "Released", "Returning Series")
    pub status: Option<String>,
    /// Genre names
    pub genres: Vec<String>,
    /// Season list (TV only)
    pub seasons: Vec<SeasonInfo>,
    /// Provider-supplied localized/regional title variants
    pub alternative_titles: Vec<String>,
    /// Translated titles
    pub translations: Vec<String>,
    /// Cast members
    pub cast: Vec<PersonInfo>,
    /// Crew members
    pub crew: Vec<PersonInfo>,
}

impl Default for MediaDetail {
    fn default() -> Self {
        Self {
            id: 0,
            media_type: MediaType::Unknown,
            title: String::new(),
            original_title: None,
            release_date: None,
            overview: None,
            poster_path: None,
            backdrop_path: None,
            vote_average: None,
            status: None,
            genres: Vec::new(),
            seasons: Vec::new(),
            alternative_titles: Vec::new(),
            translations: Vec::new(),
            cast: Vec::new(),
            crew: Vec::new(),
        }
    }
}

impl MediaDetail {
    /// The four-digit year prefix of the release date, when present.
    pub fn year(&self) -> Option<&str> {
        self.release_date
            .as_deref()
            .filter(|d| d.len() >= 4)
            .map(|d| &d[..4])
    }

    /// The detail record reduced to a plain search row.
    pub fn as_candidate(&self) -> super::Candidate {
        super::Candidate {
            id: self.id,
            media_type: self.media_type,
            title: self.title.clone(),
            original_title: self.original_title.clone().unwrap_or_default(),
            release_date: self.release_date.clone(),
        }
    }

    /// Whether any season entry aired in `year` with the given number.
    pub fn has_season_aired(&self, season_number: i32, year: i32) -> bool {
        let year = year.to_string();
        self.seasons.iter().any(|s| {
            s.number == season_number
                && s.air_date
                    .as_deref()
                    .is_some_and(|d| d.len() >= 4 && d[..4] == year)
        })
    }
}

/// Season information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonInfo {
    /// Season number (0 for specials)
    pub number: i32,
    /// Season name
    pub name: Option<String>,
    /// Air date
    pub air_date: Option<String>,
    /// Episode count
    pub episode_count: Option<i32>,
}

/// Person information (cast/crew)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonInfo {
    pub id: i64,
    pub name: String,
    /// Character name (cast) or job (crew)
    pub role: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail_with_seasons(seasons: Vec<SeasonInfo>) -> MediaDetail {
        MediaDetail {
            id: 100,
            media_type: MediaType::Tv,
            seasons,
            ..Default::default()
        }
    }

    fn season(number: i32, air_date: Option<&str>) -> SeasonInfo {
        SeasonInfo {
            number,
            name: None,
            air_date: air_date.map(str::to_string),
            episode_count: Some(10),
        }
    }

    #[test]
    fn test_has_season_aired() {
        let detail = detail_with_seasons(vec![
            season(0, Some("2006-01-08")),
            season(1, Some("2023-01-15")),
        ]);

        assert!(detail.has_season_aired(1, 2023));
        assert!(!detail.has_season_aired(1, 2022));
        assert!(!detail.has_season_aired(2, 2023));
    }

    #[test]
    fn test_has_season_aired_missing_date() {
        let detail = detail_with_seasons(vec![season(1, None)]);
        assert!(!detail.has_season_aired(1, 2023));
    }

    #[test]
    fn test_year_from_release_date() {
        let detail = MediaDetail {
            release_date: Some("1999-03-31".to_string()),
            ..Default::default()
        };
        assert_eq!(detail.year(), Some("1999"));
        assert_eq!(MediaDetail::default().year(), None);
    }

    #[test]
    fn test_as_candidate_carries_identity() {
        let detail = MediaDetail {
            id: 603,
            media_type: MediaType::Movie,
            title: "The Matrix".to_string(),
            original_title: Some("The Matrix".to_string()),
            release_date: Some("1999-03-31".to_string()),
            ..Default::default()
        };

        let candidate = detail.as_candidate();
        assert_eq!(candidate.id, 603);
        assert_eq!(candidate.media_type, MediaType::Movie);
        assert_eq!(candidate.release_date.as_deref(), Some("1999-03-31"));
    }
}
