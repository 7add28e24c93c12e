use crate::matcher::names_equal;
use crate::provider::MetadataClient;
use crate::titles::AlternateTitleExpander;
use crate::types::{Candidate, MediaDetail, MediaType};
use crate::{ResolveError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How many ranked candidates the alternate-title expansion pass walks.
const EXPANSION_LIMIT: usize = 5;

/// Input to a single strategy attempt.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StrategyInput<'a> {
    pub name: &'a str,
    pub year: Option<i32>,
    pub season: Option<i32>,
    pub cancel: &'a CancellationToken,
}

/// A candidate accepted by a strategy.
///
/// `detail` is populated when the strategy already fetched the full record
/// (the expansion and season-verification paths), so the orchestrator can
/// skip the re-fetch.
#[derive(Debug, Clone)]
pub(crate) struct Resolved {
    pub candidate: Candidate,
    pub detail: Option<MediaDetail>,
}

impl Resolved {
    fn bare(candidate: Candidate) -> Self {
        Self {
            candidate,
            detail: None,
        }
    }

    pub(crate) fn with_detail(detail: MediaDetail) -> Self {
        Self {
            candidate: detail.as_candidate(),
            detail: Some(detail),
        }
    }
}

/// One tier of the candidate search chain.
///
/// Empty result lists and empty-after-filtering both surface as `Ok(None)`;
/// provider failures are downgraded to `Ok(None)` at the call site, never
/// propagated (cancellation excepted).
#[async_trait]
pub(crate) trait ResolverStrategy: Send + Sync {
    async fn attempt(&self, input: &StrategyInput<'_>) -> Result<Option<Resolved>>;
}

/// Downgrade a provider failure to an empty candidate list, keeping
/// cancellation fatal.
fn soften(err: ResolveError, context: &str) -> Result<Vec<Candidate>> {
    match err {
        ResolveError::Cancelled => Err(ResolveError::Cancelled),
        e => {
            warn!("{context} search failed: {e}");
            Ok(Vec::new())
        }
    }
}

/// Direct-name pass: first candidate whose title or original title matches
/// strictly, constrained to the year prefix when a year was asked for.
fn direct_match<'c>(
    candidates: &'c [Candidate],
    name: &str,
    year: Option<i32>,
) -> Option<&'c Candidate> {
    candidates.iter().find(|c| {
        let names_hit =
            names_equal(name, [c.title.as_str()]) || names_equal(name, [c.original_title.as_str()]);
        match year {
            Some(year) => c.release_date.is_some() && names_hit && c.matches_year(year),
            None => names_hit,
        }
    })
}

/// Expansion pass: walk the first [`EXPANSION_LIMIT`] candidates
/// (year-filtered when a year was asked for) and accept the first whose
/// alternate/translated names match. Expansion failures skip the candidate.
async fn expansion_match(
    client: &dyn MetadataClient,
    candidates: &[Candidate],
    name: &str,
    year: Option<i32>,
    cancel: &CancellationToken,
) -> Result<Option<Resolved>> {
    let expander = AlternateTitleExpander::new(client);
    let filtered = candidates
        .iter()
        .filter(|c| match year {
            Some(year) => c.release_date.is_some() && c.matches_year(year),
            None => true,
        })
        .take(EXPANSION_LIMIT);

    for candidate in filtered {
        let (detail, names) =
            match expander.expand(candidate.media_type, candidate.id, cancel).await {
                Ok(Some(pair)) => pair,
                Ok(None) => continue,
                Err(ResolveError::Cancelled) => return Err(ResolveError::Cancelled),
                Err(e) => {
                    warn!("alternate title expansion failed for {}: {e}", candidate.id);
                    continue;
                }
            };
        if names_equal(name, &names) {
            return Ok(Some(Resolved::with_detail(detail)));
        }
    }
    Ok(None)
}

/// Movie search by name, two passes, retried over adjacent years.
pub(crate) struct MovieByName {
    client: Arc<dyn MetadataClient>,
}

impl MovieByName {
    pub fn new(client: Arc<dyn MetadataClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResolverStrategy for MovieByName {
    async fn attempt(&self, input: &StrategyInput<'_>) -> Result<Option<Resolved>> {
        // Release dates commonly straddle the year parsed from a file name,
        // so a supplied year is retried against its neighbors.
        let years: Vec<Option<i32>> = match input.year {
            Some(y) => vec![Some(y), Some(y + 1), Some(y - 1)],
            None => vec![None],
        };

        for year in years {
            debug!("searching movie: {}, year={:?}", input.name, year);
            let candidates = match self
                .client
                .search_movies(input.name, year, input.cancel)
                .await
            {
                Ok(candidates) => candidates,
                Err(e) => soften(e, "movie")?,
            };
            if candidates.is_empty() {
                continue;
            }

            if let Some(hit) = direct_match(&candidates, input.name, year) {
                info!(
                    "{} matched movie id={}, title={}, release_date={:?}",
                    input.name, hit.id, hit.title, hit.release_date
                );
                return Ok(Some(Resolved::bare(hit.clone())));
            }
            if let Some(hit) =
                expansion_match(&*self.client, &candidates, input.name, year, input.cancel).await?
            {
                return Ok(Some(hit));
            }
        }
        Ok(None)
    }
}

/// TV search by name, two passes over `first_air_date`.
pub(crate) struct TvByName {
    client: Arc<dyn MetadataClient>,
}

impl TvByName {
    pub fn new(client: Arc<dyn MetadataClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResolverStrategy for TvByName {
    async fn attempt(&self, input: &StrategyInput<'_>) -> Result<Option<Resolved>> {
        debug!("searching tv: {}, year={:?}", input.name, input.year);
        let candidates = match self
            .client
            .search_tv(input.name, input.year, input.cancel)
            .await
        {
            Ok(candidates) => candidates,
            Err(e) => soften(e, "tv")?,
        };
        if candidates.is_empty() {
            return Ok(None);
        }

        if let Some(hit) = direct_match(&candidates, input.name, input.year) {
            info!(
                "{} matched tv id={}, name={}, first_air_date={:?}",
                input.name, hit.id, hit.title, hit.release_date
            );
            return Ok(Some(Resolved::bare(hit.clone())));
        }
        expansion_match(
            &*self.client,
            &candidates,
            input.name,
            input.year,
            input.cancel,
        )
        .await
    }
}

/// Season-aware TV search: name-only query, then the requested season's air
/// year disambiguates between same-named shows.
pub(crate) struct TvBySeason {
    client: Arc<dyn MetadataClient>,
}

impl TvBySeason {
    pub fn new(client: Arc<dyn MetadataClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResolverStrategy for TvBySeason {
    async fn attempt(&self, input: &StrategyInput<'_>) -> Result<Option<Resolved>> {
        let (Some(year), Some(season)) = (input.year, input.season) else {
            return Ok(None);
        };

        debug!(
            "searching tv: {}, season={}, season year={}",
            input.name, season, year
        );
        let candidates = match self.client.search_tv(input.name, None, input.cancel).await {
            Ok(candidates) => candidates,
            Err(e) => soften(e, "tv")?,
        };
        if candidates.is_empty() {
            return Ok(None);
        }

        // Pass one: direct name hit whose series premiered in the requested
        // year.
        if let Some(hit) = candidates.iter().find(|c| {
            (names_equal(input.name, [c.title.as_str()])
                || names_equal(input.name, [c.original_title.as_str()]))
                && c.matches_year(year)
        }) {
            info!(
                "{} matched tv id={}, name={}, first_air_date={:?}",
                input.name, hit.id, hit.title, hit.release_date
            );
            return Ok(Some(Resolved::bare(hit.clone())));
        }

        // Pass two: expand alternates, then require a season entry that both
        // aired in the requested year and carries the requested number.
        let expander = AlternateTitleExpander::new(&*self.client);
        for candidate in candidates.iter().take(EXPANSION_LIMIT) {
            let (detail, names) = match expander
                .expand(MediaType::Tv, candidate.id, input.cancel)
                .await
            {
                Ok(Some(pair)) => pair,
                Ok(None) => continue,
                Err(ResolveError::Cancelled) => return Err(ResolveError::Cancelled),
                Err(e) => {
                    warn!("alternate title expansion failed for {}: {e}", candidate.id);
                    continue;
                }
            };
            if !names_equal(input.name, &names) {
                continue;
            }
            if detail.has_season_aired(season, year) {
                return Ok(Some(Resolved::with_detail(detail)));
            }
        }
        Ok(None)
    }
}

/// Combined movie + TV search, used when the media type is unknown or as a
/// year-relaxed last structured tier.
pub(crate) struct MultiType {
    client: Arc<dyn MetadataClient>,
}

impl MultiType {
    pub fn new(client: Arc<dyn MetadataClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResolverStrategy for MultiType {
    async fn attempt(&self, input: &StrategyInput<'_>) -> Result<Option<Resolved>> {
        debug!("searching multi: {}", input.name);
        let candidates = match self.client.search_multi(input.name, input.cancel).await {
            Ok(candidates) => candidates,
            Err(e) => soften(e, "multi")?,
        };
        if candidates.is_empty() {
            return Ok(None);
        }

        if let Some(hit) = direct_match(&candidates, input.name, None) {
            info!(
                "{} matched {} id={}, title={}",
                input.name, hit.media_type, hit.id, hit.title
            );
            return Ok(Some(Resolved::bare(hit.clone())));
        }

        // Expansion over the first few items of either type; the accepted
        // record carries its own resolved type.
        expansion_match(&*self.client, &candidates, input.name, None, input.cancel).await
    }
}
