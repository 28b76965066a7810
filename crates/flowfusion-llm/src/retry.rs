use std::time::Duration;

use futures::future::BoxFuture;
use tracing::warn;

use flowfusion_core::config::RetryConfig;
use flowfusion_core::error::Result;
use flowfusion_core::traits::Generator;

/// A generator that retries transient failures with exponential backoff.
pub struct RetryingGenerator {
    inner: Box<dyn Generator>,
    retry_config: RetryConfig,
}

impl RetryingGenerator {
    pub fn new(inner: Box<dyn Generator>, retry_config: RetryConfig) -> Self {
        Self {
            inner,
            retry_config,
        }
    }
}

pub(crate) fn calculate_backoff(attempt: u32, config: &RetryConfig) -> Duration {
    let ms = config
        .initial_backoff_ms
        .saturating_mul(2u64.saturating_pow(attempt))
        .min(config.max_backoff_ms);
    // Add jitter: 0.8x to 1.2x
    let jitter = 0.8 + rand::random::<f64>() * 0.4;
    Duration::from_millis((ms as f64 * jitter) as u64)
}

impl Generator for RetryingGenerator {
    fn complete(&self, system_prompt: &str, user_prompt: &str) -> BoxFuture<'_, Result<String>> {
        let system_prompt = system_prompt.to_string();
        let user_prompt = user_prompt.to_string();

        Box::pin(async move {
            let max_retries = self.retry_config.max_retries;
            let mut attempt = 0;

            loop {
                match self.inner.complete(&system_prompt, &user_prompt).await {
                    Ok(text) => return Ok(text),
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        let backoff = calculate_backoff(attempt, &self.retry_config);
                        warn!(
                            attempt = attempt + 1,
                            max_retries,
                            backoff_ms = backoff.as_millis() as u64,
                            error = %e,
                            "Retrying generation request"
                        );
                        tokio::time::sleep(backoff).await;
                        attempt += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
        })
    }

    fn is_configured(&self) -> bool {
        self.inner.is_configured()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use flowfusion_core::error::FlowError;

    use super::*;

    /// Fails with the given error until `failures` attempts have been made.
    struct Flaky {
        failures: u32,
        calls: Arc<AtomicU32>,
        error: fn() -> FlowError,
    }

    impl Generator for Flaky {
        fn complete(&self, _: &str, _: &str) -> BoxFuture<'_, Result<String>> {
            Box::pin(async move {
                let n = self.calls.fetch_add(1, Ordering::SeqCst);
                if n < self.failures {
                    Err((self.error)())
                } else {
                    Ok("answer".to_string())
                }
            })
        }
    }

    fn fast() -> RetryConfig {
        RetryConfig {
            max_retries: 2,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
        }
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let gen = RetryingGenerator::new(
            Box::new(Flaky {
                failures: 2,
                calls: calls.clone(),
                error: || FlowError::LlmRequest("HTTP 503 Service Unavailable: busy".into()),
            }),
            fast(),
        );
        assert_eq!(gen.complete("s", "u").await.unwrap(), "answer");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let gen = RetryingGenerator::new(
            Box::new(Flaky {
                failures: 10,
                calls: calls.clone(),
                error: || FlowError::LlmRequest("HTTP 429 Too Many Requests: slow down".into()),
            }),
            fast(),
        );
        assert!(gen.complete("s", "u").await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_permanent_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let gen = RetryingGenerator::new(
            Box::new(Flaky {
                failures: 10,
                calls: calls.clone(),
                error: || FlowError::LlmRequest("HTTP 401 Unauthorized: bad key".into()),
            }),
            fast(),
        );
        assert!(gen.complete("s", "u").await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_is_capped() {
        let config = RetryConfig {
            max_retries: 10,
            initial_backoff_ms: 1000,
            max_backoff_ms: 4000,
        };
        let backoff = calculate_backoff(8, &config);
        assert!(backoff <= Duration::from_millis(4800));
        assert!(backoff >= Duration::from_millis(3200));
    }
}
