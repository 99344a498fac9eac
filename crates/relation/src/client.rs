//! The relation-service port (§6: "study -> dataset expansion, consumed as
//! a black-box") and its HTTP-backed implementation.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use common::retry::{execute_with_retry_async, is_retryable_error, RetryConfig};
use serde::Deserialize;
use tracing::warn;

use crate::error::RelationError;

/// `getDatasetsFromStudy(jgasId) -> [jgadId...]` (§6). Idempotent, may
/// return empty. Object-safe so normalizer call sites can take a
/// `&dyn RelationService` and tests can substitute an in-memory double.
pub trait RelationService: Send + Sync {
    fn get_datasets_from_study<'a>(
        &'a self,
        jgas_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, RelationError>> + Send + 'a>>;
}

#[derive(Debug, Deserialize)]
struct StudyExpansionResponse {
    #[serde(alias = "datasetIds", alias = "datasets")]
    dataset_ids: Vec<String>,
}

/// HTTP client against the real relation-service endpoint, with the same
/// retry/backoff shape as the Fetcher.
pub struct HttpRelationService {
    client: reqwest::Client,
    base_url: String,
    retry_config: RetryConfig,
}

impl HttpRelationService {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(32)
            .build()
            .expect("failed to build relation-service HTTP client");

        Self {
            client,
            base_url: base_url.into(),
            retry_config: RetryConfig::default(),
        }
    }

    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    async fn fetch_once(&self, jgas_id: &str) -> Result<Vec<String>, String> {
        let url = format!("{}/studies/{}/datasets", self.base_url.trim_end_matches('/'), jgas_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("request to relation service failed: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("relation service HTTP {}", response.status()));
        }

        let body: StudyExpansionResponse = response
            .json()
            .await
            .map_err(|e| format!("invalid relation service response: {e}"))?;
        Ok(body.dataset_ids)
    }
}

impl RelationService for HttpRelationService {
    fn get_datasets_from_study<'a>(
        &'a self,
        jgas_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, RelationError>> + Send + 'a>> {
        Box::pin(async move {
            let result = execute_with_retry_async(&self.retry_config, |attempt| async move {
                if attempt > 0 {
                    warn!(jgas_id, attempt, "retrying relation service request");
                }
                match self.fetch_once(jgas_id).await {
                    Ok(ids) => Ok(ids),
                    Err(e) if is_retryable_error(&e) => Err(e),
                    Err(e) => Err(format!("non-retryable: {e}")),
                }
            })
            .await;

            result.into_result().map_err(RelationError::Request)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticService {
        expansions: std::collections::HashMap<String, Vec<String>>,
    }

    impl RelationService for StaticService {
        fn get_datasets_from_study<'a>(
            &'a self,
            jgas_id: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, RelationError>> + Send + 'a>> {
            let result = self.expansions.get(jgas_id).cloned().unwrap_or_default();
            Box::pin(async move { Ok(result) })
        }
    }

    #[tokio::test]
    async fn mock_service_returns_configured_expansion() {
        let mut expansions = std::collections::HashMap::new();
        expansions.insert(
            "JGAS000114".to_string(),
            vec!["JGAD000220".to_string(), "JGAD000410".to_string()],
        );
        let service = StaticService { expansions };

        let result = service.get_datasets_from_study("JGAS000114").await.unwrap();
        assert_eq!(result, vec!["JGAD000220".to_string(), "JGAD000410".to_string()]);

        let empty = service.get_datasets_from_study("JGAS999999").await.unwrap();
        assert!(empty.is_empty());
    }
}
