//! Rate limiting primitives.
//!
//! Two variants share a sliding-window design but differ in contract:
//! - `CallRateLimiter` bounds outbound calls to one external source and
//!   *blocks* the caller until a slot frees up; work is never dropped.
//! - `QueryRateLimiter` bounds analysis requests per caller identity and
//!   answers allow/deny *instantly*.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex as StdMutex;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Sliding-window limiter for outbound calls to a single external source.
///
/// `acquire` always eventually grants a slot; there is no maximum-wait
/// ceiling. Timeouts belong at the individual call boundary, not here.
pub struct CallRateLimiter {
    max_calls: usize,
    window: Duration,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl CallRateLimiter {
    pub fn new(max_calls: usize, window: Duration) -> Self {
        Self {
            max_calls,
            window,
            timestamps: Mutex::new(VecDeque::new()),
        }
    }

    /// Block until a slot is available, then record the call.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut stamps = self.timestamps.lock().await;
                let now = Instant::now();
                while let Some(front) = stamps.front() {
                    if now.duration_since(*front) >= self.window {
                        stamps.pop_front();
                    } else {
                        break;
                    }
                }
                if stamps.len() < self.max_calls {
                    stamps.push_back(now);
                    return;
                }
                // Oldest call ages out of the window first
                let oldest = *stamps.front().expect("non-empty at capacity");
                self.window.saturating_sub(now.duration_since(oldest))
            };
            debug!("⏳ Rate limiter saturated, waiting {}ms", wait.as_millis());
            tokio::time::sleep(wait.max(Duration::from_millis(5))).await;
        }
    }
}

/// Per-identity query limiter protecting the whole pipeline from abuse.
///
/// Each identity's window is independent. On allow, the timestamp is recorded
/// before returning so two equally-timed checks cannot both slip under the
/// limit. Fully-expired identities are pruned on every check.
pub struct QueryRateLimiter {
    max_queries: usize,
    window: Duration,
    history: StdMutex<HashMap<String, Vec<Instant>>>,
}

impl QueryRateLimiter {
    pub fn new(max_queries: usize, window: Duration) -> Self {
        Self {
            max_queries,
            window,
            history: StdMutex::new(HashMap::new()),
        }
    }

    /// Non-blocking allow/deny. Records the query on allow.
    pub fn check_and_record(&self, identity: &str) -> bool {
        let mut history = self.history.lock().expect("limiter lock poisoned");
        let now = Instant::now();

        // Drop identities whose entire history has aged out
        history.retain(|_, stamps| {
            stamps.retain(|t| now.duration_since(*t) < self.window);
            !stamps.is_empty()
        });

        let stamps = history.entry(identity.to_string()).or_default();
        if stamps.len() < self.max_queries {
            stamps.push(now);
            true
        } else {
            debug!("🚫 Query limit hit for identity {}", identity);
            false
        }
    }

    /// Number of identities currently tracked
    pub fn tracked_identities(&self) -> usize {
        self.history.lock().expect("limiter lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_call_limiter_grants_up_to_capacity() {
        let limiter = CallRateLimiter::new(3, Duration::from_secs(10));
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        // First three acquisitions should be effectively instant
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_call_limiter_blocks_then_grants() {
        let limiter = CallRateLimiter::new(2, Duration::from_millis(100));
        limiter.acquire().await;
        limiter.acquire().await;
        let start = Instant::now();
        limiter.acquire().await; // must wait for the window to slide
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_query_limiter_exact_quota() {
        let limiter = QueryRateLimiter::new(3, Duration::from_secs(60));
        assert!(limiter.check_and_record("alice"));
        assert!(limiter.check_and_record("alice"));
        assert!(limiter.check_and_record("alice"));
        // The (N+1)th within the window is denied
        assert!(!limiter.check_and_record("alice"));
    }

    #[test]
    fn test_query_limiter_identities_independent() {
        let limiter = QueryRateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check_and_record("alice"));
        assert!(!limiter.check_and_record("alice"));
        assert!(limiter.check_and_record("bob"));
    }

    #[test]
    fn test_query_limiter_window_reset() {
        let limiter = QueryRateLimiter::new(1, Duration::from_millis(40));
        assert!(limiter.check_and_record("alice"));
        assert!(!limiter.check_and_record("alice"));
        std::thread::sleep(Duration::from_millis(60));
        assert!(limiter.check_and_record("alice"));
    }

    #[test]
    fn test_query_limiter_prunes_departed_identities() {
        let limiter = QueryRateLimiter::new(2, Duration::from_millis(30));
        limiter.check_and_record("ghost");
        std::thread::sleep(Duration::from_millis(50));
        limiter.check_and_record("other");
        // ghost's history fully expired and was dropped on the next check
        assert_eq!(limiter.tracked_identities(), 1);
    }
}
