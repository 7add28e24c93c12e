use crate::config::KeywordConfig;
use crate::provider::PageFetcher;
use crate::{ResolveError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Trailing "(2023)"-style date suffix on an entity panel title.
static DATE_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\(\d{4}\)$").unwrap());

/// Emphasized-snippet contexts on the first engine's results page.
const ENGINE_A_TERMS: &str = "#sp_requery strong, #sp_recourse strong, h2 strong, \
     .b_caption p strong, .b_snippetBigText strong, .b_rs strong, .b_title strong, \
     .b_ad strong";
const ENGINE_A_ENTITY: &str = "aside h2.b_entityTitle";
const ENGINE_A_MOVIE_MARKER: &str = r#"aside div[data-feedbk-ids="Movie"]"#;
const ENGINE_B_TERMS: &str = "em";

/// A term accumulated across both engines' result pages.
#[derive(Debug, Clone)]
struct ScoredKeyword {
    text: String,
    score: i64,
}

/// Derives a cleaner search phrase from a noisy release name by asking two
/// general web search engines "what is this" and aggregating the emphasized
/// terms of their result snippets.
pub struct KeywordExtractor {
    fetcher: Arc<dyn PageFetcher>,
    config: KeywordConfig,
    strip_prefix: Option<Regex>,
    blacklist: Vec<Regex>,
}

impl KeywordExtractor {
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: &KeywordConfig) -> Self {
        let strip_prefix = Regex::new(&config.strip_prefix).ok();

        // Longest-first so "web-dl" is consumed before "web" could be.
        let mut tokens = config.blacklist.clone();
        tokens.sort_by_key(|t| std::cmp::Reverse(t.len()));
        let blacklist = tokens
            .iter()
            .filter_map(|t| Regex::new(&format!("(?i){}", regex::escape(t))).ok())
            .collect();

        Self {
            fetcher,
            config: config.clone(),
            strip_prefix,
            blacklist,
        }
    }

    /// Extract a supplemental search keyword for `raw_name`.
    ///
    /// Returns the winning phrase plus whether the first engine's entity
    /// panel flagged it as a movie. `(None, false)` when nothing survives.
    pub async fn extract(
        &self,
        raw_name: &str,
        cancel: &CancellationToken,
    ) -> Result<(Option<String>, bool)> {
        let cleaned = self.clean(raw_name);
        if cleaned.is_empty() {
            return Ok((None, false));
        }

        let mut scored: Vec<ScoredKeyword> = Vec::new();
        let mut is_movie = false;

        if let Some(body) = self.fetch_engine(&self.config.engine_a_url, &cleaned, cancel).await? {
            let page = EngineAPage::parse(&body);
            let terms = self.filter_similar(page.terms, &cleaned);
            if !terms.is_empty() {
                if let Some(title) = page.entity_title {
                    accumulate(&mut scored, &title, self.config.entity_score);
                    if page.movie_marker {
                        is_movie = true;
                    }
                }
                self.accumulate_ranked(&mut scored, &terms);
            }
        }

        if let Some(body) = self.fetch_engine(&self.config.engine_b_url, &cleaned, cancel).await? {
            let terms = self.filter_similar(parse_emphasized(&body, ENGINE_B_TERMS), &cleaned);
            if !terms.is_empty() {
                self.accumulate_ranked(&mut scored, &terms);
            }
        }

        if scored.is_empty() {
            return Ok((None, false));
        }

        debug!(
            "keyword candidates for {raw_name}: {:?}",
            scored
                .iter()
                .take(4)
                .map(|k| (&k.text, k.score))
                .collect::<Vec<_>>()
        );
        let keyword = self.pick_winner(scored);
        info!("keyword for {raw_name}: {keyword}");
        Ok((Some(keyword), is_movie))
    }

    /// Strip the leading season/episode marker and every blacklisted noise
    /// token, longest-first, then collapse whitespace.
    fn clean(&self, raw_name: &str) -> String {
        let mut name = raw_name.replace(['.', '_'], " ");
        if let Some(prefix) = &self.strip_prefix {
            name = prefix.replace(&name, "").into_owned();
        }
        for token in &self.blacklist {
            name = token.replace_all(&name, " ").into_owned();
        }
        name.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    async fn fetch_engine(
        &self,
        url_template: &str,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        let url = url_template.replace("{}", &urlencoding::encode(query));
        match self.fetcher.fetch(&url, cancel).await {
            Ok((200, body)) if !body.is_empty() => Ok(Some(body)),
            Ok((status, _)) => {
                debug!("search engine returned status {status}");
                Ok(None)
            }
            Err(ResolveError::Cancelled) => Err(ResolveError::Cancelled),
            Err(e) => {
                warn!("search engine fetch failed: {e}");
                Ok(None)
            }
        }
    }

    /// Keep only terms whose similarity ratio against the cleaned phrase
    /// clears the configured threshold.
    fn filter_similar(&self, terms: Vec<String>, cleaned: &str) -> Vec<String> {
        let reference = cleaned.to_lowercase();
        terms
            .into_iter()
            .filter(|t| {
                strsim::sorensen_dice(&reference, &t.to_lowercase())
                    > self.config.similarity_threshold
            })
            .collect()
    }

    fn accumulate_ranked(&self, scored: &mut Vec<ScoredKeyword>, terms: &[String]) {
        let total = terms.len();
        for (rank, term) in terms.iter().enumerate() {
            accumulate(scored, term, self.decay_score(rank, total));
        }
    }

    /// Positional-decay score for a term. Pure in `(rank, total)`: the first
    /// two ranks score highest and the bucket boundaries scale with the
    /// total term count.
    fn decay_score(&self, rank: usize, total: usize) -> i64 {
        let cfg = &self.config;
        if total < 5 {
            if rank < 2 {
                cfg.weights_small[0]
            } else {
                cfg.weights_small[1]
            }
        } else if total < 10 {
            if rank < 2 {
                cfg.weights_medium[0]
            } else if rank < total / 2 {
                cfg.weights_medium[1]
            } else {
                cfg.weights_medium[2]
            }
        } else if rank < 2 {
            cfg.weights_large[0]
        } else if rank < total / 4 {
            cfg.weights_large[1]
        } else if rank < total / 2 {
            cfg.weights_large[2]
        } else if rank < total * 3 / 4 {
            cfg.weights_large[3]
        } else {
            cfg.weights_large[4]
        }
    }

    /// Rank by accumulated score and break the leader/runner-up tie.
    fn pick_winner(&self, mut scored: Vec<ScoredKeyword>) -> String {
        // Stable sort: equal scores keep first-seen order
        scored.sort_by(|a, b| b.score.cmp(&a.score));
        if scored.len() == 1 {
            return scored.swap_remove(0).text;
        }

        let leader = &scored[0];
        let runner = &scored[1];
        let leader_lc = leader.text.to_lowercase();
        let runner_lc = runner.text.to_lowercase();

        if runner_lc.contains(&leader_lc) {
            // "X X" is X padded, not a different phrase
            let padded_repeat = runner_lc.replacen(&leader_lc, "", 1).trim() == leader_lc;
            if leader.score >= self.config.leader_score
                || leader.score - runner.score > self.config.diff_score_threshold
                || padded_repeat
            {
                leader.text.clone()
            } else {
                // Covers numeric-only leaders as well: a contained leader
                // without a win condition loses to the fuller phrase.
                runner.text.clone()
            }
        } else {
            leader.text.clone()
        }
    }
}

/// Fold a term into the weight map, case-insensitively, preserving the
/// first-seen display text and insertion order.
fn accumulate(scored: &mut Vec<ScoredKeyword>, term: &str, score: i64) {
    let term_lc = term.to_lowercase();
    if let Some(existing) = scored.iter_mut().find(|k| k.text.to_lowercase() == term_lc) {
        existing.score += score;
    } else {
        scored.push(ScoredKeyword {
            text: term.to_string(),
            score,
        });
    }
}

/// Collect the trimmed text of every element matching `selectors`, in
/// document order.
fn parse_emphasized(html: &str, selectors: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse(selectors) else {
        return Vec::new();
    };
    document
        .select(&selector)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Parsed view of the first engine's results page.
struct EngineAPage {
    terms: Vec<String>,
    entity_title: Option<String>,
    movie_marker: bool,
}

impl EngineAPage {
    fn parse(html: &str) -> Self {
        let terms = parse_emphasized(html, ENGINE_A_TERMS);

        let document = Html::parse_document(html);
        let entity_title = Selector::parse(ENGINE_A_ENTITY).ok().and_then(|sel| {
            document
                .select(&sel)
                .next()
                .map(|el| {
                    DATE_SUFFIX
                        .replace(el.text().collect::<String>().trim(), "")
                        .into_owned()
                })
                .filter(|t| !t.is_empty())
        });
        let movie_marker = Selector::parse(ENGINE_A_MOVIE_MARKER)
            .map(|sel| document.select(&sel).next().is_some())
            .unwrap_or(false);

        Self {
            terms,
            entity_title,
            movie_marker,
        }
    }
}
