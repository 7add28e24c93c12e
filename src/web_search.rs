use crate::config::ResolverConfig;
use crate::matcher::is_native_script;
use crate::provider::{MetadataClient, PageFetcher};
use crate::types::{MediaDetail, MediaType};
use crate::{ResolveError, Result};
use dashmap::DashMap;
use scraper::{Html, Selector};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Last-resort lookup through the provider's own web search page.
///
/// Reserved for names the structured search is expected to mishandle
/// (romanized/foreign titles): a name already in the configured language's
/// native script is skipped outright. Only an unambiguous single-link result
/// page is trusted; results are memoized per (name, requested type).
pub(crate) struct WebSearchFallback {
    fetcher: Arc<dyn PageFetcher>,
    client: Arc<dyn MetadataClient>,
    web_base_url: String,
    language: String,
    memo: DashMap<(String, MediaType), Option<MediaDetail>>,
}

impl WebSearchFallback {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        client: Arc<dyn MetadataClient>,
        config: &ResolverConfig,
    ) -> Self {
        Self {
            fetcher,
            client,
            web_base_url: config.web_base_url.clone(),
            language: config.language.clone(),
            memo: DashMap::new(),
        }
    }

    pub async fn search(
        &self,
        name: &str,
        media_type: MediaType,
        cancel: &CancellationToken,
    ) -> Result<Option<MediaDetail>> {
        if name.is_empty() || is_native_script(name, &self.language) {
            return Ok(None);
        }
        let memo_key = (name.to_string(), media_type);
        if let Some(hit) = self.memo.get(&memo_key) {
            return Ok(hit.value().clone());
        }

        let result = self.scrape(name, media_type, cancel).await?;
        self.memo.insert(memo_key, result.clone());
        Ok(result)
    }

    async fn scrape(
        &self,
        name: &str,
        media_type: MediaType,
        cancel: &CancellationToken,
    ) -> Result<Option<MediaDetail>> {
        info!("searching the provider web page for {name} ...");
        let url = format!(
            "{}/search?query={}",
            self.web_base_url,
            urlencoding::encode(name)
        );
        let (status, body) = match self.fetcher.fetch(&url, cancel).await {
            Ok(pair) => pair,
            Err(ResolveError::Cancelled) => return Err(ResolveError::Cancelled),
            Err(e) => {
                warn!("web search fetch failed: {e}");
                return Ok(None);
            }
        };
        if status != 200 || body.is_empty() {
            return Ok(None);
        }

        let links = extract_result_links(&body);
        let Some((link_type, id)) = single_candidate(&links) else {
            if links.len() > 1 {
                info!("{name} web search is ambiguous: {} links", links.len());
            } else {
                debug!("{name} web search returned no usable links");
            }
            return Ok(None);
        };

        let detail = match self.client.get_detail(link_type, id, cancel).await {
            Ok(detail) => detail,
            Err(ResolveError::Cancelled) => return Err(ResolveError::Cancelled),
            Err(e) => {
                warn!("web search detail fetch failed for {id}: {e}");
                return Ok(None);
            }
        };
        let Some(detail) = detail else {
            return Ok(None);
        };

        // The caller asked for a series; a movie hit is not an answer.
        if media_type == MediaType::Tv && detail.media_type != MediaType::Tv {
            return Ok(None);
        }

        info!(
            "{name} matched by web search: {} id={}, title={}, date={:?}",
            detail.media_type, detail.id, detail.title, detail.release_date
        );
        Ok(Some(detail))
    }
}

/// Collect distinct `/movie/...` and `/tv/...` hrefs from anchors carrying a
/// data-id marker, preserving page order.
fn extract_result_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[data-id]") else {
        return Vec::new();
    };

    let mut links: Vec<String> = Vec::new();
    for anchor in document.select(&selector) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if !href.starts_with("/tv") && !href.starts_with("/movie") {
            continue;
        }
        if !links.iter().any(|l| l == href) {
            links.push(href.to_string());
        }
    }
    links
}

/// The conservative single-candidate rule: exactly one distinct link is a
/// signal, zero or many are not.
fn single_candidate(links: &[String]) -> Option<(MediaType, i64)> {
    let [link] = links else {
        return None;
    };
    let media_type = if link.starts_with("/tv") {
        MediaType::Tv
    } else {
        MediaType::Movie
    };
    // Trailing segment is "<id>" or "<id>-<slug>"
    let last = link.trim_end_matches('/').rsplit('/').next()?;
    let digits: String = last.chars().take_while(char::is_ascii_digit).collect();
    let id = digits.parse().ok()?;
    Some((media_type, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::support::{MockClient, MockFetcher, detail};

    fn fallback(fetcher: MockFetcher, client: MockClient) -> WebSearchFallback {
        WebSearchFallback::new(
            Arc::new(fetcher),
            Arc::new(client),
            &ResolverConfig::default(),
        )
    }

    const SINGLE_LINK_PAGE: &str = r#"
        <html><body>
          <a data-id="m1" href="/movie/315162-puss-in-boots">Puss in Boots</a>
          <a data-id="m1" href="/movie/315162-puss-in-boots">dup</a>
          <a data-id="x" href="/person/500">Someone</a>
        </body></html>"#;

    #[test]
    fn test_extract_links_filters_and_dedups() {
        let links = extract_result_links(SINGLE_LINK_PAGE);
        assert_eq!(links, vec!["/movie/315162-puss-in-boots"]);
    }

    #[test]
    fn test_single_candidate_parses_id() {
        let links = vec!["/tv/100088".to_string()];
        assert_eq!(single_candidate(&links), Some((MediaType::Tv, 100088)));

        let slugged = vec!["/movie/315162-puss-in-boots".to_string()];
        assert_eq!(single_candidate(&slugged), Some((MediaType::Movie, 315162)));
    }

    #[test]
    fn test_multiple_links_are_no_signal() {
        let links = vec!["/tv/1".to_string(), "/movie/2".to_string()];
        assert_eq!(single_candidate(&links), None);
        assert_eq!(single_candidate(&[]), None);
    }

    #[tokio::test]
    async fn test_scrape_resolves_single_link() {
        let fetcher = MockFetcher::with_page(200, SINGLE_LINK_PAGE);
        let client = MockClient::new().with_detail(detail(
            315162,
            MediaType::Movie,
            "Puss in Boots: The Last Wish",
            Some("2022-12-07"),
        ));
        let fallback = fallback(fetcher, client);
        let cancel = CancellationToken::new();

        let hit = fallback
            .search("Gato con Botas", MediaType::Movie, &cancel)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.id, 315162);
    }

    #[tokio::test]
    async fn test_tv_request_rejects_movie_hit() {
        let fetcher = MockFetcher::with_page(200, SINGLE_LINK_PAGE);
        let client = MockClient::new().with_detail(detail(
            315162,
            MediaType::Movie,
            "Puss in Boots: The Last Wish",
            Some("2022-12-07"),
        ));
        let fallback = fallback(fetcher, client);
        let cancel = CancellationToken::new();

        let hit = fallback
            .search("Gato con Botas", MediaType::Tv, &cancel)
            .await
            .unwrap();
        assert!(hit.is_none());
    }

    #[tokio::test]
    async fn test_native_script_names_skip_scraping() {
        let fetcher = MockFetcher::with_page(200, SINGLE_LINK_PAGE);
        let client = MockClient::new();
        let mut config = ResolverConfig::default();
        config.language = "zh-CN".to_string();
        let fallback = WebSearchFallback::new(Arc::new(fetcher.clone()), Arc::new(client), &config);
        let cancel = CancellationToken::new();

        let hit = fallback
            .search("流浪地球", MediaType::Movie, &cancel)
            .await
            .unwrap();
        assert!(hit.is_none());
        assert_eq!(fetcher.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn test_results_are_memoized() {
        let fetcher = MockFetcher::with_page(200, "<html></html>");
        let client = MockClient::new();
        let fallback = WebSearchFallback::new(
            Arc::new(fetcher.clone()),
            Arc::new(client),
            &ResolverConfig::default(),
        );
        let cancel = CancellationToken::new();

        for _ in 0..3 {
            let hit = fallback
                .search("Unmatched Name", MediaType::Movie, &cancel)
                .await
                .unwrap();
            assert!(hit.is_none());
        }
        assert_eq!(fetcher.fetch_calls(), 1);
    }

    #[tokio::test]
    async fn test_non_200_is_no_signal() {
        let fetcher = MockFetcher::with_page(503, "Service Unavailable");
        let client = MockClient::new();
        let fallback = fallback(fetcher, client);
        let cancel = CancellationToken::new();

        let hit = fallback
            .search("Some Name", MediaType::Movie, &cancel)
            .await
            .unwrap();
        assert!(hit.is_none());
    }
}
