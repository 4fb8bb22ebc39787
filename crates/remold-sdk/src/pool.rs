use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::error::PoolError;

/// Bounded offload of blocking pipeline runs for async hosts.
///
/// Each run holds one permit for its whole duration, so at most `size`
/// pipelines touch the filesystem at once. Runs share nothing else.
#[derive(Debug, Clone)]
pub struct BlockingPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl BlockingPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Stop accepting work. Runs already holding a permit finish normally.
    pub fn close(&self) {
        self.permits.close();
    }

    pub async fn run<F, T>(&self, job: F) -> Result<T, PoolError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Closed)?;

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        });

        handle.await.map_err(|e| PoolError::Panicked(e.to_string()))
    }
}

impl Default for BlockingPool {
    fn default() -> Self {
        let size = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self::new(size)
    }
}
