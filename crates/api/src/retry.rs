use anyhow::Result;
use async_trait::async_trait;
use extract::LanguageModel;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{warn, info};

use crate::config::RetryConfig;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: usize,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: usize, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff: Duration::from_millis(initial_backoff_ms),
            max_backoff: Duration::from_millis(max_backoff_ms),
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_retries, config.initial_backoff_ms, config.max_backoff_ms)
    }

    /// Retry a future with exponential backoff
    pub async fn retry<F, Fut, T, E>(&self, operation_name: &str, mut f: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 0;
        let mut backoff = self.initial_backoff;

        loop {
            match f().await {
                Ok(result) => {
                    if attempt > 0 {
                        info!(
                            operation = operation_name,
                            attempts = attempt + 1,
                            "Operation succeeded after retries"
                        );
                    }
                    return Ok(result);
                }
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        warn!(
                            operation = operation_name,
                            attempts = attempt,
                            error = %e,
                            "Operation failed after max retries"
                        );
                        return Err(e);
                    }

                    warn!(
                        operation = operation_name,
                        attempt = attempt,
                        max_retries = self.max_retries,
                        backoff_ms = backoff.as_millis(),
                        error = %e,
                        "Operation failed, retrying"
                    );

                    sleep(backoff).await;

                    backoff = std::cmp::min(
                        backoff * 2,
                        self.max_backoff
                    );
                }
            }
        }
    }
}

/// Language model whose calls go through a `RetryPolicy`.
pub struct RetryingModel<M> {
    inner: M,
    policy: RetryPolicy,
}

impl<M> RetryingModel<M> {
    pub fn new(inner: M, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<M: LanguageModel> LanguageModel for RetryingModel<M> {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.policy.retry("llm.generate", || self.inner.generate(prompt)).await
    }

    async fn generate_json(&self, prompt: &str) -> Result<serde_json::Value> {
        self.policy.retry("llm.generate_json", || self.inner.generate_json(prompt)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::testing::ScriptedModel;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_retry_until_success() {
        let policy = RetryPolicy::new(3, 0, 0);
        let attempts = AtomicUsize::new(0);

        let result: Result<usize, String> = policy
            .retry("flaky", || async {
                let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 { Err(format!("attempt {}", n)) } else { Ok(n) }
            })
            .await;

        assert_eq!(result, Ok(3));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max() {
        let policy = RetryPolicy::new(2, 0, 0);
        let attempts = AtomicUsize::new(0);

        let result: Result<(), String> = policy
            .retry("broken", || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err("down".to_string())
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retrying_model_passes_through() {
        let model = RetryingModel::new(ScriptedModel::new().otherwise("hello"), RetryPolicy::new(1, 0, 0));
        assert_eq!(model.generate("hi").await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_retrying_model_retries_failures() {
        let inner = ScriptedModel::new().fail_when("hi", "unavailable");
        let model = RetryingModel::new(inner, RetryPolicy::new(2, 0, 0));

        assert!(model.generate("hi").await.is_err());
        assert_eq!(model.inner.calls().len(), 3);
    }
}
