//! Request pacing for the backend.
//!
//! The quote provider behind the backend throttles aggressively, so calls
//! go out one at a time with a minimum gap between their start times.

use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{self, Instant};
use tracing::debug;

/// Default gap between request starts.
pub const DEFAULT_MIN_SPACING: Duration = Duration::from_millis(1000);

/// Serializes requests and spaces out their start times.
///
/// Waiters are served in arrival order (tokio's mutex is fair).
#[derive(Debug)]
pub struct RequestPacer {
    /// Start time of the most recent request.
    last_start: Mutex<Option<Instant>>,
    min_spacing: Duration,
}

impl RequestPacer {
    pub fn new(min_spacing: Duration) -> Self {
        Self {
            last_start: Mutex::new(None),
            min_spacing,
        }
    }

    /// Run `request` once no other request is in flight and the spacing
    /// since the previous start has elapsed.
    pub async fn run<F, T>(&self, request: F) -> T
    where
        F: Future<Output = T>,
    {
        let mut last_start = self.last_start.lock().await;

        if let Some(prev) = *last_start {
            let ready_at = prev + self.min_spacing;
            if ready_at > Instant::now() {
                debug!(wait = ?(ready_at - Instant::now()), "pacing request");
                time::sleep_until(ready_at).await;
            }
        }

        *last_start = Some(Instant::now());
        request.await
    }
}

impl Default for RequestPacer {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SPACING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_first_request_runs_immediately() {
        let pacer = RequestPacer::default();
        let started = Instant::now();
        pacer.run(async {}).await;
        assert_eq!(Instant::now(), started);
    }

    #[tokio::test(start_paused = true)]
    async fn test_requests_are_spaced() {
        let pacer = Arc::new(RequestPacer::new(Duration::from_millis(500)));
        let origin = Instant::now();
        let starts = Arc::new(std::sync::Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for _ in 0..3 {
            let pacer = Arc::clone(&pacer);
            let starts = Arc::clone(&starts);
            handles.push(tokio::spawn(async move {
                pacer
                    .run(async {
                        starts.lock().unwrap().push(Instant::now() - origin);
                    })
                    .await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let starts = starts.lock().unwrap().clone();
        assert_eq!(
            starts,
            vec![
                Duration::ZERO,
                Duration::from_millis(500),
                Duration::from_millis(1000)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_request_in_flight() {
        let pacer = Arc::new(RequestPacer::new(Duration::from_millis(10)));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let pacer = Arc::clone(&pacer);
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                pacer
                    .run(async {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        time::sleep(Duration::from_millis(100)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_after_spacing_elapsed() {
        let pacer = RequestPacer::new(Duration::from_millis(200));
        pacer.run(async {}).await;
        time::sleep(Duration::from_millis(300)).await;
        let before = Instant::now();
        pacer.run(async {}).await;
        assert_eq!(Instant::now(), before);
    }
}
