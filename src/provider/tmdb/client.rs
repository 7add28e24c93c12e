use super::api_types::{
    MovieDetails, MovieResult, MultiResult, SearchResponse, TvDetails, TvResult,
};
use crate::config::ResolverConfig;
use crate::provider::{HttpClient, MetadataClient};
use crate::types::{Candidate, MediaDetail, MediaType, PersonInfo, SeasonInfo};
use crate::{ResolveError, Result};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

const DETAIL_EXTRAS: &str = "alternative_titles,translations,credits";

/// Structured API client for The Movie Database.
pub struct TmdbClient {
    client: HttpClient,
    api_key: String,
    language: String,
}

impl TmdbClient {
    pub fn new(config: &ResolverConfig) -> Self {
        Self {
            client: HttpClient::new(config.api_base_url.clone(), config.timeout),
            api_key: config.api_key.clone(),
            language: config.language.clone(),
        }
    }

    async fn request<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        extra_params: &[(&str, &str)],
        cancel: &CancellationToken,
    ) -> Result<T> {
        let mut params: Vec<(&str, &str)> = vec![
            ("api_key", self.api_key.as_str()),
            ("language", self.language.as_str()),
        ];
        params.extend_from_slice(extra_params);

        self.client.get_json(endpoint, &params, cancel).await
    }

    fn movie_to_candidate(movie: MovieResult) -> Candidate {
        Candidate {
            id: movie.id,
            media_type: MediaType::Movie,
            title: movie.title,
            original_title: movie.original_title,
            release_date: movie.release_date,
        }
    }

    fn tv_to_candidate(tv: TvResult) -> Candidate {
        Candidate {
            id: tv.id,
            media_type: MediaType::Tv,
            title: tv.name,
            original_title: tv.original_name,
            release_date: tv.first_air_date,
        }
    }

    fn multi_to_candidate(multi: MultiResult) -> Option<Candidate> {
        match multi.media_type.as_str() {
            "movie" => Some(Candidate {
                id: multi.id,
                media_type: MediaType::Movie,
                title: multi.title.unwrap_or_default(),
                original_title: multi.original_title.unwrap_or_default(),
                release_date: multi.release_date,
            }),
            "tv" => Some(Candidate {
                id: multi.id,
                media_type: MediaType::Tv,
                title: multi.name.unwrap_or_default(),
                original_title: multi.original_name.unwrap_or_default(),
                release_date: multi.first_air_date,
            }),
            _ => None,
        }
    }

    fn movie_details_to_detail(movie: MovieDetails) -> MediaDetail {
        let alt = movie.alternative_titles.unwrap_or_default();
        let alternative_titles = alt
            .titles
            .into_iter()
            .chain(alt.results)
            .filter_map(|t| t.title)
            .filter(|t| !t.is_empty())
            .collect();
        let translations = movie
            .translations
            .unwrap_or_default()
            .translations
            .into_iter()
            .filter_map(|t| t.data.title)
            .filter(|t| !t.is_empty())
            .collect();
        let credits = movie.credits.unwrap_or_default();

        MediaDetail {
            id: movie.id,
            media_type: MediaType::Movie,
            title: movie.title,
            original_title: movie.original_title,
            release_date: movie.release_date,
            overview: movie.overview,
            poster_path: movie.poster_path,
            backdrop_path: movie.backdrop_path,
            vote_average: movie.vote_average,
            status: movie.status,
            genres: movie.genres.into_iter().map(|g| g.name).collect(),
            seasons: Vec::new(),
            alternative_titles,
            translations,
            cast: credits
                .cast
                .into_iter()
                .map(|c| PersonInfo {
                    id: c.id,
                    name: c.name,
                    role: c.character,
                })
                .collect(),
            crew: credits
                .crew
                .into_iter()
                .map(|c| PersonInfo {
                    id: c.id,
                    name: c.name,
                    role: c.job,
                })
                .collect(),
        }
    }

    fn tv_details_to_detail(tv: TvDetails) -> MediaDetail {
        let alt = tv.alternative_titles.unwrap_or_default();
        let alternative_titles = alt
            .results
            .into_iter()
            .chain(alt.titles)
            .filter_map(|t| t.title)
            .filter(|t| !t.is_empty())
            .collect();
        let translations = tv
            .translations
            .unwrap_or_default()
            .translations
            .into_iter()
            .filter_map(|t| t.data.name)
            .filter(|t| !t.is_empty())
            .collect();
        let credits = tv.credits.unwrap_or_default();

        MediaDetail {
            id: tv.id,
            media_type: MediaType::Tv,
            title: tv.name,
            original_title: tv.original_name,
            release_date: tv.first_air_date,
            overview: tv.overview,
            poster_path: tv.poster_path,
            backdrop_path: tv.backdrop_path,
            vote_average: tv.vote_average,
            status: tv.status,
            genres: tv.genres.into_iter().map(|g| g.name).collect(),
            seasons: tv
                .seasons
                .into_iter()
                .map(|s| SeasonInfo {
                    number: s.season_number,
                    name: s.name,
                    air_date: s.air_date,
                    episode_count: s.episode_count,
                })
                .collect(),
            alternative_titles,
            translations,
            cast: credits
                .cast
                .into_iter()
                .map(|c| PersonInfo {
                    id: c.id,
                    name: c.name,
                    role: c.character,
                })
                .collect(),
            crew: credits
                .crew
                .into_iter()
                .map(|c| PersonInfo {
                    id: c.id,
                    name: c.name,
                    role: c.job,
                })
                .collect(),
        }
    }

    async fn get_movie_detail(
        &self,
        id: i64,
        cancel: &CancellationToken,
    ) -> Result<Option<MediaDetail>> {
        let endpoint = format!("/movie/{id}");
        match self
            .request::<MovieDetails>(&endpoint, &[("append_to_response", DETAIL_EXTRAS)], cancel)
            .await
        {
            Ok(movie) => Ok(Some(Self::movie_details_to_detail(movie))),
            Err(ResolveError::Api { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn get_tv_detail(
        &self,
        id: i64,
        cancel: &CancellationToken,
    ) -> Result<Option<MediaDetail>> {
        let endpoint = format!("/tv/{id}");
        match self
            .request::<TvDetails>(&endpoint, &[("append_to_response", DETAIL_EXTRAS)], cancel)
            .await
        {
            Ok(tv) => Ok(Some(Self::tv_details_to_detail(tv))),
            Err(ResolveError::Api { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl MetadataClient for TmdbClient {
    async fn search_movies(
        &self,
        query: &str,
        year: Option<i32>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Candidate>> {
        let mut params = vec![("query", query)];
        let year_str;
        if let Some(year) = year {
            year_str = year.to_string();
            params.push(("year", &year_str));
        }

        let response: SearchResponse<MovieResult> =
            self.request("/search/movie", &params, cancel).await?;

        Ok(response
            .results
            .into_iter()
            .map(Self::movie_to_candidate)
            .collect())
    }

    async fn search_tv(
        &self,
        query: &str,
        first_air_year: Option<i32>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Candidate>> {
        let mut params = vec![("query", query)];
        let year_str;
        if let Some(year) = first_air_year {
            year_str = year.to_string();
            params.push(("first_air_date_year", &year_str));
        }

        let response: SearchResponse<TvResult> =
            self.request("/search/tv", &params, cancel).await?;

        Ok(response
            .results
            .into_iter()
            .map(Self::tv_to_candidate)
            .collect())
    }

    async fn search_multi(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Candidate>> {
        let response: SearchResponse<MultiResult> = self
            .request("/search/multi", &[("query", query)], cancel)
            .await?;

        Ok(response
            .results
            .into_iter()
            .filter_map(Self::multi_to_candidate)
            .collect())
    }

    async fn get_detail(
        &self,
        media_type: MediaType,
        id: i64,
        cancel: &CancellationToken,
    ) -> Result<Option<MediaDetail>> {
        match media_type {
            MediaType::Movie => self.get_movie_detail(id, cancel).await,
            MediaType::Tv => self.get_tv_detail(id, cancel).await,
            MediaType::Unknown => {
                // Unknown ids are rare (direct cache hits from older entries);
                // try the movie shape first, then TV.
                if let Some(detail) = self.get_movie_detail(id, cancel).await? {
                    return Ok(Some(detail));
                }
                self.get_tv_detail(id, cancel).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_rows_drop_people() {
        let person = MultiResult {
            id: 1,
            media_type: "person".to_string(),
            title: None,
            original_title: None,
            release_date: None,
            name: Some("Keanu Reeves".to_string()),
            original_name: None,
            first_air_date: None,
        };
        assert!(TmdbClient::multi_to_candidate(person).is_none());
    }

    #[test]
    fn test_multi_rows_unify_tv_fields() {
        let tv = MultiResult {
            id: 100088,
            media_type: "tv".to_string(),
            title: None,
            original_title: None,
            release_date: None,
            name: Some("The Last of Us".to_string()),
            original_name: Some("The Last of Us".to_string()),
            first_air_date: Some("2023-01-15".to_string()),
        };

        let candidate = TmdbClient::multi_to_candidate(tv).unwrap();
        assert_eq!(candidate.media_type, MediaType::Tv);
        assert_eq!(candidate.title, "The Last of Us");
        assert_eq!(candidate.release_date.as_deref(), Some("2023-01-15"));
    }

    #[test]
    fn test_movie_detail_flattens_names() {
        let payload = serde_json::json!({
            "id": 315162,
            "title": "Puss in Boots: The Last Wish",
            "original_title": "Puss in Boots: The Last Wish",
            "release_date": "2022-12-07",
            "genres": [{"id": 16, "name": "Animation"}],
            "alternative_titles": {
                "titles": [
                    {"iso_3166_1": "CN", "title": "穿靴子的猫2"},
                    {"iso_3166_1": "FR", "title": "Le Chat Potté 2"}
                ]
            },
            "translations": {
                "translations": [
                    {"iso_639_1": "es", "data": {"title": "El Gato con Botas: El último deseo"}},
                    {"iso_639_1": "en", "data": {"title": ""}}
                ]
            }
        });
        let details: MovieDetails = serde_json::from_value(payload).unwrap();
        let detail = TmdbClient::movie_details_to_detail(details);

        assert_eq!(detail.genres, vec!["Animation"]);
        assert_eq!(detail.alternative_titles.len(), 2);
        // Empty translated titles are dropped
        assert_eq!(detail.translations.len(), 1);
    }

    #[test]
    fn test_tv_detail_reads_results_and_seasons() {
        let payload = serde_json::json!({
            "id": 100088,
            "name": "The Last of Us",
            "original_name": "The Last of Us",
            "first_air_date": "2023-01-15",
            "seasons": [
                {"season_number": 1, "name": "Season 1", "air_date": "2023-01-15", "episode_count": 9}
            ],
            "alternative_titles": {
                "results": [{"iso_3166_1": "CN", "title": "最后生还者"}]
            },
            "translations": {
                "translations": [{"iso_639_1": "zh", "data": {"name": "最后生还者"}}]
            }
        });
        let details: TvDetails = serde_json::from_value(payload).unwrap();
        let detail = TmdbClient::tv_details_to_detail(details);

        assert_eq!(detail.media_type, MediaType::Tv);
        assert_eq!(detail.alternative_titles, vec!["最后生还者"]);
        assert_eq!(detail.translations, vec!["最后生还者"]);
        assert_eq!(detail.seasons.len(), 1);
        assert!(detail.has_season_aired(1, 2023));
    }
}
