use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::Semaphore;

use crate::error::TaskError;

use super::{Executor, Job};

/// Runs jobs on a tokio runtime's blocking pool, at most `permits` at a time.
pub struct ParallelExecutor {
    name: String,
    handle: Handle,
    permits: Arc<Semaphore>,
}

impl ParallelExecutor {
    pub fn from_handle(name: impl Into<String>, handle: Handle, permits: usize) -> Self {
        Self {
            name: name.into(),
            handle,
            permits: Arc::new(Semaphore::new(permits.max(1))),
        }
    }

    /// Stop accepting jobs. Jobs waiting for a permit are dropped.
    pub fn shutdown(&self) {
        self.permits.close();
    }
}

impl Executor for ParallelExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, job: Job) -> Result<(), TaskError> {
        if self.permits.is_closed() {
            return Err(TaskError::Rejected(self.name.clone()));
        }

        let permits = self.permits.clone();
        let name = self.name.clone();
        self.handle.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                tracing::debug!(executor = %name, "job dropped at shutdown");
                return;
            };
            if let Err(e) = tokio::task::spawn_blocking(job).await {
                tracing::error!(executor = %name, error = %e, "blocking job failed");
            }
        });
        Ok(())
    }
}
