//! Provider combinators.
//!
//! Every multi-endpoint query goes through one of these two helpers so that
//! timeout and failure handling live in one place.

use std::future::Future;
use std::time::Duration;

use futures::future::{join_all, BoxFuture};
use tokio::time::timeout;

use crate::error::ProviderError;

/// A deferred provider call. Nothing is sent until the thunk is invoked.
pub type ProviderThunk<'a, T> =
    Box<dyn FnOnce() -> BoxFuture<'a, Result<T, ProviderError>> + Send + 'a>;

/// Try `providers` in order, each bounded by `per_timeout`, and return the
/// first success. The whole sequence is abandoned once `total_timeout`
/// elapses. On failure the last provider error is returned.
pub async fn race_or_fallback<'a, T: Send + 'a>(
    providers: Vec<ProviderThunk<'a, T>>,
    per_timeout: Duration,
    total_timeout: Duration,
) -> Result<T, ProviderError> {
    let attempts = async move {
        let mut last_err = ProviderError::unavailable("no providers configured");
        for (index, provider) in providers.into_iter().enumerate() {
            match timeout(per_timeout, provider()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(err)) => {
                    tracing::debug!("Provider #{} failed, trying next: {}", index, err);
                    last_err = err;
                }
                Err(_) => {
                    tracing::debug!("Provider #{} timed out, trying next", index);
                    last_err = ProviderError::Timeout;
                }
            }
        }
        Err(last_err)
    };

    match timeout(total_timeout, attempts).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout),
    }
}

/// Run every labelled provider future concurrently, each bounded by
/// `per_timeout`, and keep the successes. Failures are logged with their
/// label and dropped.
pub async fn gather_settled<T, F>(calls: Vec<(String, F)>, per_timeout: Duration) -> Vec<T>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    let wrapped = calls.into_iter().map(|(label, call)| async move {
        let outcome = match timeout(per_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout),
        };
        (label, outcome)
    });

    join_all(wrapped)
        .await
        .into_iter()
        .filter_map(|(label, outcome)| match outcome {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!("Provider {} produced no data: {}", label, err);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn ok_after(value: u32, delay: Duration) -> ProviderThunk<'static, u32> {
        Box::new(move || {
            async move {
                tokio::time::sleep(delay).await;
                Ok(value)
            }
            .boxed()
        })
    }

    fn failing(calls: Arc<AtomicUsize>) -> ProviderThunk<'static, u32> {
        Box::new(move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::Status { status: 500 })
            }
            .boxed()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn returns_first_success_in_order() {
        let result = race_or_fallback(
            vec![ok_after(1, Duration::from_millis(10)), ok_after(2, Duration::ZERO)],
            Duration::from_secs(1),
            Duration::from_secs(5),
        )
        .await;
        assert_eq!(result, Ok(1));
    }

    #[tokio::test(start_paused = true)]
    async fn falls_through_failures_and_timeouts() {
        let calls = Arc::new(AtomicUsize::new(0));
        let result = race_or_fallback(
            vec![
                failing(calls.clone()),
                ok_after(9, Duration::from_secs(30)),
                ok_after(3, Duration::from_millis(5)),
            ],
            Duration::from_secs(1),
            Duration::from_secs(10),
        )
        .await;
        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn total_timeout_bounds_the_sequence() {
        let result = race_or_fallback(
            vec![
                ok_after(1, Duration::from_secs(4)),
                ok_after(2, Duration::from_secs(4)),
                ok_after(3, Duration::from_secs(4)),
            ],
            Duration::from_secs(5),
            Duration::from_secs(6),
        )
        .await;
        // first completes in 4s, well inside both budgets
        assert_eq!(result, Ok(1));

        let result = race_or_fallback(
            vec![
                ok_after(1, Duration::from_secs(10)),
                ok_after(2, Duration::from_secs(10)),
            ],
            Duration::from_secs(5),
            Duration::from_secs(7),
        )
        .await;
        assert_eq!(result, Err(ProviderError::Timeout));
    }

    #[tokio::test]
    async fn empty_provider_list_is_unavailable() {
        let result = race_or_fallback::<u32>(vec![], Duration::from_secs(1), Duration::from_secs(1)).await;
        assert!(matches!(result, Err(ProviderError::Unavailable { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn gather_settled_keeps_only_successes() {
        let calls: Vec<(String, BoxFuture<'static, Result<u32, ProviderError>>)> = vec![
            ("a".into(), async { Ok(1) }.boxed()),
            ("b".into(), async { Err(ProviderError::Timeout) }.boxed()),
            (
                "c".into(),
                async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(3)
                }
                .boxed(),
            ),
            ("d".into(), async { Ok(4) }.boxed()),
        ];

        let mut values = gather_settled(calls, Duration::from_secs(5)).await;
        values.sort();
        assert_eq!(values, vec![1, 4]);
    }
}
