use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};


/// Polls `probe` every `interval` until it reports `true` or `timeout` elapses.
///
/// The probe always runs at least once, and once more at the deadline.
/// Returns whether the condition was observed. Dropping the returned future
/// cancels the wait.
pub async fn wait_for<F, Fut>(mut probe: F, interval: Duration, timeout: Duration) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if probe().await {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        sleep(interval.min(deadline - now)).await;
    }
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn gives_up_at_deadline() {
        let calls = Arc::new(AtomicUsize::new(0));
        let started = Instant::now();
        let found = wait_for(
            || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    false
                }
            },
            Duration::from_millis(250),
            Duration::from_secs(1),
        )
        .await;

        assert!(!found);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(1) && elapsed < Duration::from_millis(1100));
    }

    #[tokio::test(start_paused = true)]
    async fn returns_once_condition_holds() {
        let calls = Arc::new(AtomicUsize::new(0));
        let started = Instant::now();
        let found = wait_for(
            || {
                let calls = calls.clone();
                async move { calls.fetch_add(1, Ordering::SeqCst) == 2 }
            },
            Duration::from_millis(100),
            Duration::from_secs(5),
        )
        .await;

        assert!(found);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(200) && elapsed < Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_timeout_probes_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let found = wait_for(
            || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    false
                }
            },
            Duration::from_millis(100),
            Duration::ZERO,
        )
        .await;

        assert!(!found);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
