//! Executors that run plugin work.
//!
//! Two kinds back every transition:
//! - [`SyncExecutor`]: one dedicated thread, jobs run strictly one at a time
//!   in submission order.
//! - [`ParallelExecutor`]: a tokio runtime's blocking pool, bounded by a
//!   semaphore, so plugin handlers are free to block.
//!
//! ```text
//! submit(executor, f)
//!   ↓
//! Executor::execute(Box<dyn FnOnce()>)   (catch_unwind around f)
//!   ↓
//! oneshot::Receiver → Result<T, TaskError>
//! ```

mod parallel;
mod sync;

use std::any::Any;
use std::future::Future;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::config::ExecutorConfig;
use crate::error::TaskError;

pub use parallel::ParallelExecutor;
pub use sync::SyncExecutor;

/// A unit of work handed to an executor.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Somewhere to run jobs.
pub trait Executor: Send + Sync {
    fn name(&self) -> &str;

    /// Queue `job`. Returns `Rejected` once the executor has shut down.
    fn execute(&self, job: Job) -> Result<(), TaskError>;
}

/// Run `f` on `executor` and resolve to its value.
///
/// The job is queued immediately, not when the returned future is first
/// polled. A panic inside `f` resolves to [`TaskError::Panicked`].
pub fn submit<T, F>(
    executor: &dyn Executor,
    f: F,
) -> impl Future<Output = Result<T, TaskError>> + Send + 'static
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let queued = executor.execute(Box::new(move || {
        let outcome = panic::catch_unwind(AssertUnwindSafe(f))
            .map_err(|payload| TaskError::Panicked(panic_message(payload.as_ref())));
        let _ = tx.send(outcome);
    }));
    let name = executor.name().to_string();

    async move {
        queued?;
        rx.await.unwrap_or(Err(TaskError::Rejected(name)))
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// The pair of executors every transition chooses from.
#[derive(Clone)]
pub struct Executors {
    pub sync: Arc<dyn Executor>,
    pub parallel: Arc<dyn Executor>,
}

impl Executors {
    pub fn new(sync: Arc<dyn Executor>, parallel: Arc<dyn Executor>) -> Self {
        Self { sync, parallel }
    }

    /// Start a sync thread and a parallel executor on `handle`.
    pub fn start(config: &ExecutorConfig, handle: Handle) -> io::Result<Self> {
        let sync = SyncExecutor::spawn(config.sync_thread_name.clone())?;
        let parallel = ParallelExecutor::from_handle("parallel", handle, config.threads());
        tracing::debug!(
            sync = %config.sync_thread_name,
            permits = config.threads(),
            "executors started"
        );
        Ok(Self::new(sync, Arc::new(parallel)))
    }
}

impl std::fmt::Debug for Executors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executors")
            .field("sync", &self.sync.name())
            .field("parallel", &self.parallel.name())
            .finish()
    }
}
