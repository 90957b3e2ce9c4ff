//! Worker pools (spec §4.3, C3): disjoint I/O and CPU execution lanes.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

/// Execution lane a handler is annotated with. Unannotated handlers run
/// inline on the connection's dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lane {
    #[default]
    Inline,
    IoBound,
    CpuBound,
}

/// Bounded pools for I/O-bound and CPU-bound handlers. Both are backed by
/// Tokio tasks; the CPU lane additionally runs on `spawn_blocking` so it
/// never shares the reactor thread with socket I/O (§4.3).
pub struct WorkerPools {
    io_permits: Arc<Semaphore>,
    cpu_permits: Arc<Semaphore>,
}

impl WorkerPools {
    pub fn new(io_capacity: usize, cpu_capacity: usize) -> Self {
        Self {
            io_permits: Arc::new(Semaphore::new(io_capacity)),
            cpu_permits: Arc::new(Semaphore::new(cpu_capacity)),
        }
    }

    /// Size the CPU lane to the host's hardware parallelism, as the spec
    /// prescribes (§4.3): "bounded process- or OS-thread pool sized to
    /// hardware parallelism".
    pub fn with_defaults(io_capacity: usize) -> Self {
        let cpu = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self::new(io_capacity, cpu)
    }

    /// Run `fut` on the I/O lane, bounded by the pool's capacity. A panic
    /// inside `fut` is reported as `Err` rather than tearing down the lane
    /// task silently, so the caller can turn it into a 500 response (§7).
    pub async fn run_io<F>(&self, fut: F) -> Result<F::Output, tokio::task::JoinError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let permit = self
            .io_permits
            .clone()
            .acquire_owned()
            .await
            .expect("io semaphore is never closed");
        let joined = tokio::spawn(async move {
            let out = fut.await;
            drop(permit);
            out
        });
        joined.await
    }

    /// Run a blocking, CPU-bound closure on the CPU lane. The closure must
    /// not touch the request socket directly (§4.3). A panic inside `f` is
    /// reported as `Err` rather than tearing down the lane task silently.
    pub async fn run_cpu<F, T>(&self, f: F) -> Result<T, tokio::task::JoinError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .cpu_permits
            .clone()
            .acquire_owned()
            .await
            .expect("cpu semaphore is never closed");
        let joined = tokio::task::spawn_blocking(move || {
            let out = f();
            drop(permit);
            out
        });
        joined.await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn io_lane_runs_future_to_completion() {
        let pools = WorkerPools::new(2, 2);
        let result = pools.run_io(async { 1 + 1 }).await.unwrap();
        assert_eq!(result, 2);
    }

    #[tokio::test]
    async fn cpu_lane_runs_blocking_closure() {
        let pools = WorkerPools::new(2, 2);
        let result = pools.run_cpu(|| 21 * 2).await.unwrap();
        assert_eq!(result, 42);
    }

    #[tokio::test]
    async fn io_lane_reports_panic_instead_of_aborting() {
        let pools = WorkerPools::new(2, 2);
        let result = pools.run_io(async { panic!("boom") }).await;
        assert!(result.is_err());
    }
}
