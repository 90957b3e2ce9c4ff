//! Lifecycle hook set (spec §4.4, §4.6, §9): startup hooks run concurrently
//! after the listener binds and before the accept loop begins; shutdown
//! hooks run concurrently after the listener closes and before the worker
//! pools drain. One hook's failure doesn't block the others, but a startup
//! failure aborts server start (resolving the ambiguity noted in §9 as
//! hooks-then-drain).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;

type Hook = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>> + Send + Sync>;

#[derive(Clone, Default)]
pub struct LifecycleHooks {
    startup: Vec<Hook>,
    shutdown: Vec<Hook>,
}

impl LifecycleHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_startup(&mut self, hook: Hook) {
        self.startup.push(hook);
    }

    pub fn on_shutdown(&mut self, hook: Hook) {
        self.shutdown.push(hook);
    }

    /// Run every startup hook concurrently. Aborts server start if any hook
    /// fails (§4.4).
    pub async fn run_startup(&self) -> Result<()> {
        let mut set = tokio::task::JoinSet::new();
        for hook in &self.startup {
            let fut = hook();
            set.spawn(fut);
        }
        while let Some(joined) = set.join_next().await {
            joined.expect("startup hook task panicked")?;
        }
        Ok(())
    }

    /// Run every shutdown hook concurrently; one failure does not stop the
    /// others from running. Errors are logged, not propagated — shutdown
    /// must still proceed to the worker-pool drain.
    pub async fn run_shutdown(&self) {
        let mut set = tokio::task::JoinSet::new();
        for hook in &self.shutdown {
            let fut = hook();
            set.spawn(fut);
        }
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Err(e)) => tracing::warn!("shutdown hook failed: {e}"),
                Err(e) => tracing::warn!("shutdown hook task panicked: {e}"),
                Ok(Ok(())) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn startup_hooks_all_run_before_failure_short_circuits_caller() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut hooks = LifecycleHooks::new();

        for _ in 0..3 {
            let count = count.clone();
            hooks.on_startup(Arc::new(move || {
                let count = count.clone();
                Box::pin(async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            }));
        }

        hooks.run_startup().await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn one_failing_shutdown_hook_does_not_block_others() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut hooks = LifecycleHooks::new();

        hooks.on_shutdown(Arc::new(|| Box::pin(async { anyhow::bail!("boom") })));

        let count2 = count.clone();
        hooks.on_shutdown(Arc::new(move || {
            let count = count2.clone();
            Box::pin(async move {
                count.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        }));

        hooks.run_shutdown().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
