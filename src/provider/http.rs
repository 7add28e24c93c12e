use crate::provider::PageFetcher;
use crate::{ResolveError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Race a network future against the resolution's cancellation token.
pub(crate) async fn with_cancel<F, T>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ResolveError::Cancelled),
        res = fut => res,
    }
}

/// HTTP client wrapper shared by the structured API client and the page
/// fetcher. Carries the per-request timeout from the resolver config.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .user_agent(concat!("cinematch/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Build full URL from endpoint
    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Execute GET request with query parameters and parse the JSON response.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        cancel: &CancellationToken,
    ) -> Result<T> {
        let url = self.url(endpoint);
        with_cancel(cancel, async {
            let response = self
                .client
                .get(&url)
                .query(params)
                .send()
                .await
                .map_err(ResolveError::Network)?;

            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(ResolveError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            response
                .json::<T>()
                .await
                .map_err(|e| ResolveError::Parse(format!("JSON parse error: {e}")))
        })
        .await
    }

    /// Execute GET request and return the raw status code and body text.
    pub async fn get_page(&self, url: &str, cancel: &CancellationToken) -> Result<(u16, String)> {
        with_cancel(cancel, async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(ResolveError::Network)?;

            let status = response.status().as_u16();
            let body = response.text().await.map_err(ResolveError::Network)?;
            Ok((status, body))
        })
        .await
    }
}

/// Default [`PageFetcher`] backed by [`HttpClient`].
#[derive(Clone)]
pub struct HttpPageFetcher {
    client: HttpClient,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: HttpClient::new("", timeout),
        }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<(u16, String)> {
        self.client.get_page(url, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_cancel_short_circuits() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result: Result<()> = with_cancel(&cancel, async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(ResolveError::Cancelled)));
    }

    #[tokio::test]
    async fn test_with_cancel_passes_through() {
        let cancel = CancellationToken::new();
        let result = with_cancel(&cancel, async { Ok(42) }).await.unwrap();
        assert_eq!(result, 42);
    }
}
