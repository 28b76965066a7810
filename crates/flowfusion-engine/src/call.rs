use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use flowfusion_core::error::{FlowError, Result};

const MAX_BACKOFF_MS: u64 = 30_000;

/// Await a collaborator call under a deadline, abandoning it on cancellation.
pub(crate) async fn bounded<T, F>(
    operation: &str,
    timeout: Duration,
    cancel: &CancellationToken,
    call: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(FlowError::Cancelled),
        result = tokio::time::timeout(timeout, call) => match result {
            Ok(inner) => inner,
            Err(_) => Err(FlowError::Timeout {
                operation: operation.to_string(),
                secs: timeout.as_secs(),
            }),
        },
    }
}

/// Exponential delay for retry `attempt` (zero-based), with 0.8x to 1.2x jitter.
pub(crate) fn backoff_delay(attempt: u32, initial_ms: u64) -> Duration {
    let ms = initial_ms
        .saturating_mul(2u64.saturating_pow(attempt))
        .min(MAX_BACKOFF_MS);
    let jitter = 0.8 + rand::random::<f64>() * 0.4;
    Duration::from_millis((ms as f64 * jitter) as u64)
}

/// Sleep for `delay` unless cancelled first.
pub(crate) async fn pause(delay: Duration, cancel: &CancellationToken) -> Result<()> {
    tokio::select! {
        _ = cancel.cancelled() => Err(FlowError::Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_passes_through_result() {
        let cancel = CancellationToken::new();
        let out = bounded("test", Duration::from_secs(1), &cancel, async { Ok(7) }).await;
        assert_eq!(out.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out() {
        let cancel = CancellationToken::new();
        let out: Result<()> = bounded("retrieval", Duration::from_secs(2), &cancel, async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;
        assert!(matches!(
            out,
            Err(FlowError::Timeout { ref operation, secs: 2 }) if operation == "retrieval"
        ));
    }

    #[tokio::test]
    async fn test_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let out: Result<()> = bounded("generation", Duration::from_secs(60), &cancel, async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;
        assert!(matches!(out, Err(FlowError::Cancelled)));
    }

    #[test]
    fn test_backoff_grows_within_jitter() {
        for attempt in 0..4 {
            let base = 500 * 2u64.pow(attempt);
            let ms = backoff_delay(attempt, 500).as_millis() as u64;
            assert!(ms >= base * 8 / 10 && ms <= base * 12 / 10, "attempt {attempt}: {ms}ms");
        }
    }

    #[test]
    fn test_backoff_is_capped() {
        assert!(backoff_delay(20, 1000) <= Duration::from_millis(MAX_BACKOFF_MS * 12 / 10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_aborts_on_cancel() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let start = tokio::time::Instant::now();
        let out = pause(Duration::from_secs(600), &cancel).await;
        assert!(matches!(out, Err(FlowError::Cancelled)));
        assert!(start.elapsed() < Duration::from_secs(600));
    }
}
