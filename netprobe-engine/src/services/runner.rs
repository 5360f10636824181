//! Timeout-bounded concurrent execution of independent probes.

use std::future::Future;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::time::{Instant, timeout};

use crate::error::{ProbeError, ProbeFailure, ProbeResult};
use crate::types::ProbeOutcome;

/// Maximum length (in characters) of an error detail carried by an outcome.
const MAX_DETAIL_CHARS: usize = 200;

/// Run every operation with at most `concurrency_limit` in flight, each raced against
/// `per_operation_timeout`.
///
/// Returns exactly one outcome per operation, in input order. An operation that loses
/// the race is dropped and reported as [`ProbeOutcome::Timeout`]; a failing operation
/// never aborts the batch. Operations are not retried.
pub async fn run_bounded<I, Fut, T, E>(
    operations: I,
    per_operation_timeout: Duration,
    concurrency_limit: usize,
) -> ProbeResult<Vec<ProbeOutcome<T>>>
where
    I: IntoIterator<Item = Fut>,
    Fut: Future<Output = Result<T, E>>,
    E: Into<ProbeFailure>,
{
    if per_operation_timeout.is_zero() {
        return Err(ProbeError::ValidationError(
            "Per-operation timeout must be greater than zero".to_string(),
        ));
    }
    if concurrency_limit == 0 {
        return Err(ProbeError::ValidationError(
            "Concurrency limit must be greater than zero".to_string(),
        ));
    }

    // Wrap eagerly so the stream holds no closure; a closure here trips rustc's
    // higher-ranked lifetime inference when callers need the future to be `Send`.
    let wrapped: Vec<_> = operations
        .into_iter()
        .map(|operation| run_one(operation, per_operation_timeout))
        .collect();
    let outcomes = stream::iter(wrapped)
        .buffered(concurrency_limit)
        .collect()
        .await;

    Ok(outcomes)
}

async fn run_one<Fut, T, E>(operation: Fut, limit: Duration) -> ProbeOutcome<T>
where
    Fut: Future<Output = Result<T, E>>,
    E: Into<ProbeFailure>,
{
    let start = Instant::now();
    let result = timeout(limit, operation).await;
    let elapsed_ms = elapsed_millis(start);

    match result {
        Ok(Ok(value)) => ProbeOutcome::Success { value, elapsed_ms },
        Ok(Err(e)) => match e.into() {
            ProbeFailure::Refused => ProbeOutcome::Refused { elapsed_ms },
            ProbeFailure::Timeout => ProbeOutcome::Timeout { elapsed_ms },
            ProbeFailure::Network(detail) => ProbeOutcome::NetworkError {
                detail: truncate_detail(&detail),
                elapsed_ms,
            },
            ProbeFailure::Ambiguous(detail) => ProbeOutcome::AmbiguousError {
                detail: truncate_detail(&detail),
                elapsed_ms,
            },
        },
        Err(_) => ProbeOutcome::Timeout { elapsed_ms },
    }
}

/// Milliseconds elapsed since `start`.
pub(crate) fn elapsed_millis(start: Instant) -> u64 {
    // u128 -> u64: elapsed millis of a single probe will never exceed u64::MAX
    #[allow(clippy::cast_possible_truncation)]
    let ms = start.elapsed().as_millis() as u64;
    ms
}

fn truncate_detail(detail: &str) -> String {
    detail.chars().take(MAX_DETAIL_CHARS).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::DnsError;

    #[tokio::test(start_paused = true)]
    async fn test_results_keep_input_order() {
        let ops = [30u64, 10, 20].map(|delay| async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok::<_, DnsError>(delay)
        });
        let outcomes = run_bounded(ops, Duration::from_secs(1), 8).await.unwrap();
        let values: Vec<u64> = outcomes
            .into_iter()
            .map(|o| match o {
                ProbeOutcome::Success { value, .. } => value,
                other => panic!("unexpected outcome: {other:?}"),
            })
            .collect();
        assert_eq!(values, vec![30, 10, 20]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_operation_times_out() {
        let ops = vec![
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, DnsError>(1)
            }) as std::pin::Pin<Box<dyn Future<Output = Result<i32, DnsError>>>>,
            Box::pin(async { Ok::<_, DnsError>(2) }),
        ];
        let outcomes = run_bounded(ops, Duration::from_millis(500), 4).await.unwrap();
        assert!(matches!(outcomes[0], ProbeOutcome::Timeout { elapsed_ms } if elapsed_ms >= 500));
        assert!(outcomes[1].is_success());
    }

    #[tokio::test]
    async fn test_failures_are_typed_and_truncated() {
        let long = "x".repeat(500);
        let ops = vec![
            Err::<(), _>(DnsError::QueryRefused),
            Err(DnsError::Timeout),
            Err(DnsError::Io(long)),
        ]
        .into_iter()
        .map(std::future::ready);
        let outcomes = run_bounded(ops, Duration::from_secs(1), 2).await.unwrap();
        assert!(matches!(outcomes[0], ProbeOutcome::Refused { .. }));
        assert!(matches!(outcomes[1], ProbeOutcome::Timeout { .. }));
        match &outcomes[2] {
            ProbeOutcome::NetworkError { detail, .. } => assert_eq!(detail.chars().count(), 200),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_limit_is_respected() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let ops = (0..10).map(|_| {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, DnsError>(())
            }
        });
        let outcomes = run_bounded(ops, Duration::from_secs(1), 3).await.unwrap();
        assert_eq!(outcomes.len(), 10);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_rejects_zero_timeout_and_limit() {
        let ops = || std::iter::once(std::future::ready(Ok::<_, DnsError>(())));
        assert!(matches!(
            run_bounded(ops(), Duration::ZERO, 1).await,
            Err(ProbeError::ValidationError(_))
        ));
        assert!(matches!(
            run_bounded(ops(), Duration::from_secs(1), 0).await,
            Err(ProbeError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let ops: Vec<std::future::Ready<Result<(), DnsError>>> = vec![];
        let outcomes = run_bounded(ops, Duration::from_secs(1), 1).await.unwrap();
        assert!(outcomes.is_empty());
    }
}
