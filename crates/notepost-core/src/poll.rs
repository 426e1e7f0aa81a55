//! Cooperative polling with a deadline.
//!
//! [`poll_until`] is the one place timing bookkeeping for "wait until the
//! page shows X" lives. It yields to the runtime between probes, so the
//! enclosing task stays responsive and dropping the future cancels the wait.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Result of a bounded poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Found(T),
    TimedOut,
}

impl<T> PollOutcome<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, PollOutcome::Found(_))
    }

    pub fn found(self) -> Option<T> {
        match self {
            PollOutcome::Found(v) => Some(v),
            PollOutcome::TimedOut => None,
        }
    }
}

/// Run `probe` every `interval` until it yields `Some`, or until `timeout`
/// elapses.
///
/// The probe always runs at least once, and once more at the deadline. A
/// probe error stops polling and is returned as-is.
pub async fn poll_until<T, E, F, Fut>(
    interval: Duration,
    timeout: Duration,
    mut probe: F,
) -> Result<PollOutcome<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let deadline = Instant::now() + timeout;

    loop {
        if let Some(value) = probe().await? {
            return Ok(PollOutcome::Found(value));
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(PollOutcome::TimedOut);
        }

        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn found_on_first_probe_does_not_sleep() {
        let start = Instant::now();
        let outcome: Result<_, ()> =
            poll_until(Duration::from_millis(200), Duration::from_secs(10), || async {
                Ok(Some(7))
            })
            .await;
        assert_eq!(outcome, Ok(PollOutcome::Found(7)));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn found_after_several_intervals() {
        let probes = AtomicUsize::new(0);
        let start = Instant::now();
        let outcome: Result<_, ()> =
            poll_until(Duration::from_millis(200), Duration::from_secs(10), || {
                let n = probes.fetch_add(1, Ordering::SeqCst);
                async move { Ok((n == 3).then_some(n)) }
            })
            .await;
        assert_eq!(outcome, Ok(PollOutcome::Found(3)));
        assert_eq!(start.elapsed(), Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_at_deadline() {
        let probes = AtomicUsize::new(0);
        let start = Instant::now();
        let outcome: Result<PollOutcome<()>, ()> =
            poll_until(Duration::from_millis(200), Duration::from_secs(1), || {
                probes.fetch_add(1, Ordering::SeqCst);
                async { Ok(None) }
            })
            .await;
        assert_eq!(outcome, Ok(PollOutcome::TimedOut));
        assert_eq!(start.elapsed(), Duration::from_secs(1));
        // t = 0, 200, 400, 600, 800, 1000
        assert_eq!(probes.load(Ordering::SeqCst), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_timeout_probes_once() {
        let probes = AtomicUsize::new(0);
        let outcome: Result<PollOutcome<()>, ()> =
            poll_until(Duration::from_millis(200), Duration::ZERO, || {
                probes.fetch_add(1, Ordering::SeqCst);
                async { Ok(None) }
            })
            .await;
        assert_eq!(outcome, Ok(PollOutcome::TimedOut));
        assert_eq!(probes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn probe_error_stops_polling() {
        let probes = AtomicUsize::new(0);
        let outcome: Result<PollOutcome<()>, &str> =
            poll_until(Duration::from_millis(200), Duration::from_secs(5), || {
                let n = probes.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 1 {
                        Err("socket closed")
                    } else {
                        Ok(None)
                    }
                }
            })
            .await;
        assert_eq!(outcome, Err("socket closed"));
        assert_eq!(probes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_future_cancels_the_wait() {
        let result = tokio::time::timeout(
            Duration::from_millis(500),
            poll_until(Duration::from_millis(200), Duration::from_secs(60), || async {
                Ok::<Option<()>, ()>(None)
            }),
        )
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn outcome_helpers() {
        assert!(PollOutcome::Found(1).is_found());
        assert_eq!(PollOutcome::Found(1).found(), Some(1));
        assert_eq!(PollOutcome::<i32>::TimedOut.found(), None);
    }
}
