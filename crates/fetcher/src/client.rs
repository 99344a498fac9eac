//! The cached HTTP fetcher (§4.1): retrieves detail/release HTML per
//! `(humVersionId, language)`, consulting the skip list and cache first and
//! retrying transient failures with the shared backoff policy.

use std::time::Duration;

use common::retry::{execute_with_retry_async, RetryConfig};
use common::{HumId, Lang};
use tracing::{info, warn};

use crate::cache::HttpCache;
use crate::config::FetchConfig;
use crate::error::{FetchError, PageKind};

pub struct Fetcher {
    client: reqwest::Client,
    cache: HttpCache,
    config: FetchConfig,
    retry_config: RetryConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig, cache_dir: impl Into<std::path::PathBuf>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(32)
            .build()
            .expect("failed to build fetcher HTTP client");

        Self {
            client,
            cache: HttpCache::new(cache_dir),
            config,
            retry_config: RetryConfig::default(),
        }
    }

    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    /// Fetches the HTML for one (humVersionId, language, pageKind). Consults
    /// the skip list and cache before touching the network; `use_cache =
    /// false` forces a re-fetch even on a cache hit.
    pub async fn fetch(
        &self,
        hum_id: &HumId,
        hum_version_id: &str,
        lang: Lang,
        page_kind: PageKind,
        use_cache: bool,
    ) -> Result<String, FetchError> {
        if self.config.is_skipped(hum_id) {
            return Err(FetchError::Skipped {
                hum_id: hum_id.to_string(),
                page_kind,
            });
        }

        let url = match page_kind {
            PageKind::Detail => self.config.detail_url(hum_version_id, lang),
            PageKind::Release => self.config.release_url(hum_version_id, lang),
        };

        if use_cache {
            if let Some(cached) = self.cache.get(&url) {
                return Ok(cached);
            }
        }

        let body = self.fetch_with_retry(&url).await?;
        self.cache.put(&url, &body)?;
        Ok(body)
    }

    async fn fetch_with_retry(&self, url: &str) -> Result<String, FetchError> {
        let result = execute_with_retry_async(&self.retry_config, |attempt| async move {
            if attempt > 0 {
                warn!(url, attempt, "retrying fetch");
            }
            self.fetch_once(url).await
        })
        .await;

        if result.succeeded {
            info!(url, attempts = result.attempts, "fetch succeeded");
            Ok(result.result.expect("succeeded implies Ok"))
        } else {
            Err(FetchError::RetriesExhausted {
                url: url.to_string(),
                message: result.result.unwrap_err(),
            })
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<String, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| describe_transport_error(&e))?;

        let status = response.status();
        if is_retryable_status(status.as_u16()) {
            return Err(format!("HTTP {status}"));
        }
        if !status.is_success() {
            return Err(format!("non-retryable HTTP {status}"));
        }

        response
            .text()
            .await
            .map_err(|e| format!("failed to read response body: {e}"))
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 502 | 503 | 504)
}

fn describe_transport_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "timeout".to_string()
    } else if err.is_connect() {
        "connection reset".to_string()
    } else {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_status_codes_match_spec() {
        for code in [408, 429, 502, 503, 504] {
            assert!(is_retryable_status(code), "{code} should be retryable");
        }
        for code in [200, 301, 400, 401, 403, 404] {
            assert!(!is_retryable_status(code), "{code} should not be retryable");
        }
    }

    #[tokio::test]
    async fn skip_list_short_circuits_before_any_network_call() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = FetchConfig {
            portal_base_url: "https://portal.example".into(),
            ..Default::default()
        };
        let hum_id: HumId = "hum0014".parse().unwrap();
        config.skip_list.insert(hum_id.clone());

        let fetcher = Fetcher::new(config, dir.path());
        let result = fetcher
            .fetch(&hum_id, "hum0014-v3", Lang::Ja, PageKind::Detail, true)
            .await;

        assert!(matches!(result, Err(FetchError::Skipped { .. })));
    }

    #[tokio::test]
    async fn cache_hit_is_returned_without_a_configured_upstream() {
        let dir = tempfile::tempdir().unwrap();
        let config = FetchConfig {
            portal_base_url: "https://portal.example".into(),
            ..Default::default()
        };
        let hum_id: HumId = "hum0014".parse().unwrap();
        let fetcher = Fetcher::new(config.clone(), dir.path());

        let url = config.detail_url("hum0014-v3", Lang::Ja);
        fetcher.cache.put(&url, "<html>cached</html>").unwrap();

        let result = fetcher
            .fetch(&hum_id, "hum0014-v3", Lang::Ja, PageKind::Detail, true)
            .await
            .unwrap();
        assert_eq!(result, "<html>cached</html>");
    }
}
