//! Cross-cutting decorators (spec §4.4, C4): rate limiting, debounce, and
//! before/after middleware chains.
//!
//! Grounded in `decorators/rate_limit_decorator/rate_limit.py` and
//! `decorators/lifecycle_hooks/lifecycle_hooks.py`. The open question in
//! spec §9 ("per-route or per-client call_times?") is resolved here as
//! per-decorated-target: one `RateLimiter` instance guards one route, shared
//! by every caller of that route.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::error::RequestError;

/// A sliding-window call counter shared by all callers of one decorated
/// route (§4.4). `max_calls` successful calls are allowed per `interval`.
pub struct RateLimiter {
    max_calls: usize,
    interval: Duration,
    call_times: Mutex<Vec<Instant>>,
}

impl RateLimiter {
    pub fn new(max_calls: usize, interval: Duration) -> Self {
        Self {
            max_calls,
            interval,
            call_times: Mutex::new(Vec::new()),
        }
    }

    /// Record a call attempt, dropping entries older than `now - interval`.
    /// Fails once the window already holds `max_calls` entries.
    pub async fn check(&self) -> Result<(), RequestError> {
        let now = Instant::now();
        let mut times = self.call_times.lock().await;
        times.retain(|&t| now.duration_since(t) < self.interval);
        if times.len() >= self.max_calls {
            return Err(RequestError::RateLimitExceeded);
        }
        times.push(now);
        Ok(())
    }
}

/// Cancels-and-reschedules debounce: each call supersedes any pending timer;
/// only the last call within a quiescent `wait` period actually fires
/// (§4.4). The fired closure's return value is not observable to the caller.
pub struct Debouncer {
    wait: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(wait: Duration) -> Self {
        Self {
            wait,
            pending: Mutex::new(None),
        }
    }

    pub async fn call<F, Fut>(self: &Arc<Self>, f: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut pending = self.pending.lock().await;
        if let Some(handle) = pending.take() {
            handle.abort();
        }
        let wait = self.wait;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            f().await;
        }));
    }
}

type AsyncHook = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Ordered `before_request`/`after_request` hook lists (§4.4). Before-hooks
/// run in registration order ahead of handler dispatch; after-hooks run in
/// registration order once the handler returns, on both success and error.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    before: Vec<AsyncHook>,
    after: Vec<AsyncHook>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before_request(&mut self, hook: AsyncHook) {
        self.before.push(hook);
    }

    pub fn after_request(&mut self, hook: AsyncHook) {
        self.after.push(hook);
    }

    pub async fn run_before(&self) {
        for hook in &self.before {
            hook().await;
        }
    }

    pub async fn run_after(&self) {
        for hook in &self.after {
            hook().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn rate_limiter_admits_up_to_max_calls() {
        let limiter = RateLimiter::new(2, Duration::from_secs(1));
        assert!(limiter.check().await.is_ok());
        assert!(limiter.check().await.is_ok());
        assert!(limiter.check().await.is_err());
    }

    #[tokio::test]
    async fn rate_limiter_expires_old_entries() {
        let limiter = RateLimiter::new(1, Duration::from_millis(20));
        assert!(limiter.check().await.is_ok());
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(limiter.check().await.is_ok());
    }

    #[tokio::test]
    async fn middleware_runs_before_and_after_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = MiddlewareChain::new();

        let log_before = log.clone();
        chain.before_request(Arc::new(move || {
            let log = log_before.clone();
            Box::pin(async move {
                log.lock().await.push("before");
            })
        }));

        let log_after = log.clone();
        chain.after_request(Arc::new(move || {
            let log = log_after.clone();
            Box::pin(async move {
                log.lock().await.push("after");
            })
        }));

        chain.run_before().await;
        chain.run_after().await;

        assert_eq!(*log.lock().await, vec!["before", "after"]);
    }

    #[tokio::test]
    async fn debounce_only_fires_last_call() {
        let counter = Arc::new(AtomicUsize::new(0));
        let debouncer = Arc::new(Debouncer::new(Duration::from_millis(20)));

        for _ in 0..5 {
            let counter = counter.clone();
            debouncer
                .call(move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .await;
        }

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
