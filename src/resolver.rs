use crate::cache::{CacheEntry, CacheStore, MemoryCacheStore, resolution_key};
use crate::config::{MatchMode, ResolverConfig};
use crate::keyword::KeywordExtractor;
use crate::provider::{HttpPageFetcher, MetadataClient, PageFetcher, TmdbClient};
use crate::strategy::{
    MovieByName, MultiType, Resolved, ResolverStrategy, StrategyInput, TvByName, TvBySeason,
};
use crate::types::{MediaDetail, MediaType, ParsedName};
use crate::web_search::WebSearchFallback;
use crate::{ResolveError, Result};
use dashmap::DashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Per-call resolution options.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Suppress the year-relaxed fallback retries
    pub strict: bool,
    /// Consult and update the resolution cache
    pub use_cache: bool,
    /// Cancellation signal threaded through every network call
    pub cancel: CancellationToken,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            strict: false,
            use_cache: true,
            cancel: CancellationToken::new(),
        }
    }
}

/// Top-level resolution engine.
///
/// Sequences the search strategies in priority order, applies the resolution
/// cache, and triggers the scraping fallbacks when the structured search
/// yields nothing. One instance serves concurrent resolutions; the only
/// shared mutable state is the cache store and the fallback memo maps.
pub struct MediaResolver {
    config: ResolverConfig,
    client: Arc<dyn MetadataClient>,
    cache: Arc<dyn CacheStore>,
    movie_by_name: MovieByName,
    tv_by_name: TvByName,
    tv_by_season: TvBySeason,
    multi_type: MultiType,
    web_fallback: WebSearchFallback,
    keyword: KeywordExtractor,
    keyword_memo: DashMap<String, (Option<String>, bool)>,
}

impl MediaResolver {
    /// Build a resolver against the real provider clients.
    pub fn new(config: ResolverConfig) -> Self {
        let client: Arc<dyn MetadataClient> = Arc::new(TmdbClient::new(&config));
        let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpPageFetcher::new(config.timeout));
        let cache: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());
        Self::with_parts(config, client, fetcher, cache)
    }

    /// Build a resolver over explicit collaborator implementations.
    pub fn with_parts(
        config: ResolverConfig,
        client: Arc<dyn MetadataClient>,
        fetcher: Arc<dyn PageFetcher>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            movie_by_name: MovieByName::new(client.clone()),
            tv_by_name: TvByName::new(client.clone()),
            tv_by_season: TvBySeason::new(client.clone()),
            multi_type: MultiType::new(client.clone()),
            web_fallback: WebSearchFallback::new(fetcher.clone(), client.clone(), &config),
            keyword: KeywordExtractor::new(fetcher, &config.keyword),
            keyword_memo: DashMap::new(),
            client,
            cache,
            config,
        }
    }

    /// Resolve a parsed name into its full metadata record.
    ///
    /// `Ok(None)` covers both unusable input and a confirmed failed lookup;
    /// the latter is written to the cache so later calls short-circuit.
    pub async fn resolve(
        &self,
        parsed: &ParsedName,
        opts: &ResolveOptions,
    ) -> Result<Option<MediaDetail>> {
        if parsed.title.trim().is_empty() {
            warn!("{} could not be recognized, skipping", parsed.original);
            return Ok(None);
        }

        let key = resolution_key(parsed);
        if opts.use_cache
            && let Some(entry) = self.cache.get(&key).await
        {
            if entry.is_not_found() {
                debug!("cache hit: {key} is confirmed not found");
                return Ok(None);
            }
            debug!("cache hit: {key} -> id={}", entry.id);
            return self
                .fetch_detail_soft(entry.media_type, entry.id, &opts.cancel)
                .await;
        }

        let mut resolved = self.run_strategies(parsed, opts).await?;

        if resolved.is_none() && self.config.search_web_fallback {
            resolved = self
                .web_fallback
                .search(&parsed.title, parsed.media_type, &opts.cancel)
                .await?
                .map(Resolved::with_detail);
        }

        if resolved.is_none() && self.config.search_keyword {
            resolved = self.keyword_retry(&parsed.title, &opts.cancel).await?;
        }

        // Search rows carry no genre list; promote the winner to its full
        // record before returning.
        let detail = match resolved {
            None => None,
            Some(resolved) => match resolved.detail {
                Some(detail) if !detail.genres.is_empty() => Some(detail),
                _ => {
                    self.fetch_detail_soft(
                        resolved.candidate.media_type,
                        resolved.candidate.id,
                        &opts.cancel,
                    )
                    .await?
                }
            },
        };

        if opts.cancel.is_cancelled() {
            return Err(ResolveError::Cancelled);
        }
        let entry = match &detail {
            Some(detail) => CacheEntry::from_detail(detail),
            None => {
                info!("{} not found by any strategy", parsed.title);
                CacheEntry::not_found()
            }
        };
        self.cache.set(&key, entry).await;

        Ok(detail)
    }

    /// The structured-search decision tree.
    async fn run_strategies(
        &self,
        parsed: &ParsedName,
        opts: &ResolveOptions,
    ) -> Result<Option<Resolved>> {
        let cancel = &opts.cancel;
        let name = parsed.title.as_str();
        let relaxed = self.config.match_mode == MatchMode::Normal && !opts.strict;

        // No type hint and no year: one combined query is all we can do.
        if parsed.media_type != MediaType::Tv && parsed.year.is_none() {
            let input = StrategyInput {
                name,
                year: None,
                season: None,
                cancel,
            };
            return self.multi_type.attempt(&input).await;
        }

        if parsed.media_type == MediaType::Tv {
            if parsed.year.is_some() && parsed.begin_season.is_some() {
                let input = StrategyInput {
                    name,
                    year: parsed.year,
                    season: parsed.begin_season,
                    cancel,
                };
                if let Some(hit) = self.tv_by_season.attempt(&input).await? {
                    return Ok(Some(hit));
                }
            }
            let input = StrategyInput {
                name,
                year: parsed.year,
                season: None,
                cancel,
            };
            if let Some(hit) = self.tv_by_name.attempt(&input).await? {
                return Ok(Some(hit));
            }
            if parsed.year.is_some() && relaxed {
                debug!("retrying {name} as tv without the year");
                let input = StrategyInput {
                    name,
                    year: None,
                    season: None,
                    cancel,
                };
                return self.tv_by_name.attempt(&input).await;
            }
            return Ok(None);
        }

        // Movie-shaped input with a year. The same name can legitimately be
        // a series, so a TV pass follows before relaxing the year.
        let input = StrategyInput {
            name,
            year: parsed.year,
            season: None,
            cancel,
        };
        if let Some(hit) = self.movie_by_name.attempt(&input).await? {
            return Ok(Some(hit));
        }
        if let Some(hit) = self.tv_by_name.attempt(&input).await? {
            return Ok(Some(hit));
        }
        if relaxed {
            debug!("retrying {name} across both types without the year");
            let input = StrategyInput {
                name,
                year: None,
                season: None,
                cancel,
            };
            return self.multi_type.attempt(&input).await;
        }
        Ok(None)
    }

    /// Keyword-extraction retry, memoized by raw name so repeated misses do
    /// not re-scrape.
    async fn keyword_retry(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Resolved>> {
        let memoized = self.keyword_memo.get(name).map(|hit| hit.value().clone());
        let (keyword, is_movie) = match memoized {
            Some(hit) => hit,
            None => {
                let extracted = self.keyword.extract(name, cancel).await?;
                self.keyword_memo
                    .insert(name.to_string(), extracted.clone());
                extracted
            }
        };
        let Some(keyword) = keyword else {
            return Ok(None);
        };

        info!("retrying structured search with keyword: {keyword}");
        let input = StrategyInput {
            name: &keyword,
            year: None,
            season: None,
            cancel,
        };
        if is_movie {
            self.movie_by_name.attempt(&input).await
        } else {
            self.multi_type.attempt(&input).await
        }
    }

    /// Detail fetch with the error taxonomy applied: cancellation is fatal,
    /// everything else degrades to "not found".
    async fn fetch_detail_soft(
        &self,
        media_type: MediaType,
        id: i64,
        cancel: &CancellationToken,
    ) -> Result<Option<MediaDetail>> {
        match self.client.get_detail(media_type, id, cancel).await {
            Ok(detail) => Ok(detail),
            Err(ResolveError::Cancelled) => Err(ResolveError::Cancelled),
            Err(e) => {
                warn!("detail fetch failed for {media_type} {id}: {e}");
                Ok(None)
            }
        }
    }
}
