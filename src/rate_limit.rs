use std::time::Duration;

use dashmap::{mapref::entry::Entry, DashMap};
use tokio::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
struct RateWindow {
    count: u32,
    window_start: Instant,
}

/// Fixed-window admission counter, one window per client id.
///
/// Each admission is a read-modify-write under the lock of the shard holding
/// the client's entry, so clients in other shards are never blocked.
pub struct RateLimiter {
    windows: DashMap<String, RateWindow>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests,
            window,
        }
    }

    pub fn admit(&self, client_id: &str) -> bool {
        self.check(client_id).is_ok()
    }

    /// Counts a request. When denied, returns the time left until the
    /// client's window resets.
    pub fn check(&self, client_id: &str) -> Result<(), Duration> {
        let now = Instant::now();
        let window = match self.windows.entry(client_id.to_string()) {
            Entry::Occupied(mut entry) => {
                let window = entry.get_mut();
                if now.duration_since(window.window_start) >= self.window {
                    *window = RateWindow {
                        count: 1,
                        window_start: now,
                    };
                } else {
                    window.count = window.count.saturating_add(1);
                }
                *window
            }
            Entry::Vacant(entry) => *entry.insert(RateWindow {
                count: 1,
                window_start: now,
            }),
        };

        if window.count > self.max_requests {
            let retry_after = self
                .window
                .saturating_sub(now.duration_since(window.window_start));
            warn!(client_id, count = window.count, "rate limit exceeded");
            Err(retry_after)
        } else {
            Ok(())
        }
    }

    /// Drops windows that have already elapsed.
    pub fn prune(&self) {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows
            .retain(|_, window| now.duration_since(window.window_start) < self.window);
        debug!(
            removed = before.saturating_sub(self.windows.len()),
            "pruned rate windows"
        );
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn denies_after_max_and_resets_after_window() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        for _ in 0..3 {
            assert!(limiter.admit("10.0.0.1"));
        }
        assert!(!limiter.admit("10.0.0.1"));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(!limiter.admit("10.0.0.1"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(limiter.admit("10.0.0.1"));
    }

    #[tokio::test(start_paused = true)]
    async fn denial_reports_time_until_reset() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check("a").is_ok());
        tokio::time::advance(Duration::from_secs(45)).await;
        assert_eq!(limiter.check("a"), Err(Duration::from_secs(15)));
    }

    #[tokio::test(start_paused = true)]
    async fn clients_have_independent_windows() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.admit("a"));
        assert!(!limiter.admit("a"));
        assert!(limiter.admit("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn prune_keeps_live_windows() {
        let limiter = RateLimiter::new(5, Duration::from_secs(10));
        limiter.admit("old");
        tokio::time::advance(Duration::from_secs(6)).await;
        limiter.admit("new");
        tokio::time::advance(Duration::from_secs(5)).await;
        limiter.prune();
        assert_eq!(limiter.tracked_clients(), 1);
        assert!(limiter.admit("new"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_admissions_never_exceed_max() {
        let limiter = Arc::new(RateLimiter::new(50, Duration::from_secs(3600)));
        let tasks: Vec<_> = (0..200)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move { limiter.admit("shared") })
            })
            .collect();
        let mut admitted = 0;
        for task in tasks {
            if task.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 50);
    }
}
