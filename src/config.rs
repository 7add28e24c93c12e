use serde::Deserialize;
use std::time::Duration;

/// Strictness level for fallback retries.
///
/// `Normal` permits the year-relaxed retries in the orchestrator's decision
/// tree; `Strict` only ever accepts matches for the exact year parsed from
/// the input name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    Normal,
    Strict,
}

/// Resolver configuration.
///
/// Passed into every client call instead of living in process-global state,
/// so independent resolutions stay safe under concurrent use.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Metadata provider API key
    pub api_key: String,
    /// Structured API base URL
    pub api_base_url: String,
    /// Provider web site base URL (scraped by the web fallback)
    pub web_base_url: String,
    /// Preferred metadata language (ISO 639-1 with optional region)
    pub language: String,
    /// Match strictness level
    pub match_mode: MatchMode,
    /// Enable the provider web search scraping fallback
    pub search_web_fallback: bool,
    /// Enable the search-engine keyword extraction fallback
    pub search_keyword: bool,
    /// Per-request timeout for all network calls
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// Keyword extraction tuning
    pub keyword: KeywordConfig,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base_url: "https://api.themoviedb.org/3".to_string(),
            web_base_url: "https://www.themoviedb.org".to_string(),
            language: "en-US".to_string(),
            match_mode: MatchMode::Normal,
            search_web_fallback: false,
            search_keyword: false,
            timeout: Duration::from_secs(10),
            keyword: KeywordConfig::default(),
        }
    }
}

/// Tuning knobs for the keyword extraction engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    /// First search engine results page, `{}` replaced with the query
    pub engine_a_url: String,
    /// Second search engine results page, `{}` replaced with the query
    pub engine_b_url: String,
    /// Noise tokens removed from the raw name before querying
    pub blacklist: Vec<String>,
    /// Pattern for a leading season/episode marker stripped from the raw name
    pub strip_prefix: String,
    /// Minimum similarity ratio between a scraped term and the cleaned phrase
    pub similarity_threshold: f64,
    /// Score a direct entity-panel title is injected with
    pub entity_score: i64,
    /// Accumulated score above which a contained leader wins outright
    pub leader_score: i64,
    /// Score lead over the runner-up above which a contained leader wins
    pub diff_score_threshold: i64,
    /// Positional-decay weights when fewer than 5 terms were collected
    pub weights_small: [i64; 2],
    /// Positional-decay weights when fewer than 10 terms were collected
    pub weights_medium: [i64; 3],
    /// Positional-decay weights when 10 or more terms were collected
    pub weights_large: [i64; 5],
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            engine_a_url: "https://www.bing.com/search?q={}&qs=n&form=QBRE&sp=-1".to_string(),
            engine_b_url: "https://www.baidu.com/s?ie=utf-8&wd={}".to_string(),
            blacklist: [
                "2160p", "1080p", "720p", "480p", "4k", "uhd", "bluray", "blu-ray", "remux",
                "web-dl", "webdl", "webrip", "hdtv", "dvdrip", "bdrip", "hdrip", "x264", "x265",
                "h264", "h265", "hevc", "avc", "aac", "ac3", "dts", "truehd", "atmos", "hdr10",
                "hdr", "dovi", "10bit", "8bit", "proper", "repack", "extended", "complete",
                "multi", "dual audio", "sub", "dub",
            ]
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
            strip_prefix: r"(?i)^s\d{1,2}(?:e\d{1,3})?[.\s_-]*".to_string(),
            similarity_threshold: 0.2,
            entity_score: 200,
            leader_score: 100,
            diff_score_threshold: 30,
            weights_small: [10, 5],
            weights_medium: [10, 5, 3],
            weights_large: [10, 7, 5, 4, 2],
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ResolverConfig::default();

        assert_eq!(config.match_mode, MatchMode::Normal);
        assert!(!config.search_web_fallback);
        assert!(!config.search_keyword);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(config.api_base_url.starts_with("https://"));
    }

    #[test]
    fn test_keyword_defaults() {
        let keyword = KeywordConfig::default();

        assert_eq!(keyword.entity_score, 200);
        assert_eq!(keyword.leader_score, 100);
        assert_eq!(keyword.diff_score_threshold, 30);
        assert!(keyword.blacklist.iter().any(|t| t == "1080p"));
    }

    #[test]
    fn test_config_deserializes_with_partial_fields() {
        let config: ResolverConfig =
            serde_json::from_str(r#"{"api_key":"abc","match_mode":"strict","timeout":5}"#).unwrap();

        assert_eq!(config.api_key, "abc");
        assert_eq!(config.match_mode, MatchMode::Strict);
        assert_eq!(config.timeout, Duration::from_secs(5));
        // Untouched fields keep their defaults
        assert_eq!(config.language, "en-US");
    }
}
