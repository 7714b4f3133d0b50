//! Fan-out - バッチの並行実行
//!
//! Every element is attempted; one failure never cancels its siblings. The
//! reported error is the one with the lowest index in the batch, however the
//! completions interleave.

use std::future::Future;

use futures::StreamExt;
use futures::stream::FuturesUnordered;

use crate::domain::EffectError;

/// Error slot + completion counter for one fan-out.
///
/// Owned by the single loop draining the completions, so it needs no lock.
#[derive(Debug, Default)]
pub(crate) struct FirstError {
    slot: Option<(usize, EffectError)>,
    completed: usize,
}

impl FirstError {
    pub(crate) fn record(&mut self, index: usize, result: Result<(), EffectError>) {
        self.completed += 1;
        let Err(err) = result else {
            return;
        };
        let replace = match &self.slot {
            Some((held, _)) => index < *held,
            None => true,
        };
        if replace {
            self.slot = Some((index, err));
        }
    }

    pub(crate) fn completed(&self) -> usize {
        self.completed
    }

    pub(crate) fn into_result(self) -> Result<(), EffectError> {
        match self.slot {
            Some((_, err)) => Err(err),
            None => Ok(()),
        }
    }
}

/// Runs `run(item)` for every item concurrently and waits for all of them.
pub(crate) async fn fan_out<T, F, Fut>(items: Vec<T>, run: F) -> Result<(), EffectError>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<(), EffectError>>,
{
    let total = items.len();
    let mut pending: FuturesUnordered<_> = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let fut = run(item);
            async move { (index, fut.await) }
        })
        .collect();

    let mut first = FirstError::default();
    while let Some((index, result)) = pending.next().await {
        first.record(index, result);
    }
    debug_assert_eq!(first.completed(), total);

    first.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn first_error_keeps_lowest_index() {
        let mut first = FirstError::default();
        first.record(3, Err(EffectError::msg("three")));
        first.record(0, Ok(()));
        first.record(1, Err(EffectError::msg("one")));
        first.record(2, Err(EffectError::msg("two")));

        assert_eq!(first.completed(), 4);
        assert_eq!(first.into_result().unwrap_err().to_string(), "one");
    }

    #[test]
    fn first_error_empty_is_ok() {
        assert!(FirstError::default().into_result().is_ok());
    }

    #[tokio::test]
    async fn every_item_runs_even_when_some_fail() {
        let ran = Arc::new(AtomicUsize::new(0));
        let result = fan_out(vec![0, 1, 2, 3], |i| {
            let ran = Arc::clone(&ran);
            async move {
                ran.fetch_add(1, Ordering::SeqCst);
                if i % 2 == 1 {
                    Err(EffectError::msg(format!("odd {i}")))
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert_eq!(ran.load(Ordering::SeqCst), 4);
        assert_eq!(result.unwrap_err().to_string(), "odd 1");
    }

    #[tokio::test]
    async fn lowest_index_wins_regardless_of_finish_order() {
        // index 0 fails last, index 2 fails first
        let delays = [30_u64, 0, 5];
        for _ in 0..5 {
            let result = fan_out(vec![0_usize, 1, 2], |i| async move {
                tokio::time::sleep(Duration::from_millis(delays[i])).await;
                if i == 1 {
                    Ok(())
                } else {
                    Err(EffectError::msg(format!("failed {i}")))
                }
            })
            .await;
            assert_eq!(result.unwrap_err().to_string(), "failed 0");
        }
    }

    #[tokio::test]
    async fn items_overlap_in_time() {
        let started = std::time::Instant::now();
        fan_out(vec![50_u64, 50, 50, 50], |ms| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok(())
        })
        .await
        .unwrap();
        assert!(started.elapsed() < Duration::from_millis(180));
    }
}
