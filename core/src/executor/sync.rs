use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};

use tokio::sync::mpsc;

use crate::error::TaskError;

use super::{panic_message, Executor, Job};

/// Runs jobs one at a time, in order, on a single named thread.
pub struct SyncExecutor {
    name: String,
    thread_id: ThreadId,
    tx: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SyncExecutor {
    pub fn spawn(name: impl Into<String>) -> io::Result<Arc<Self>> {
        let name = name.into();
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();

        let thread_name = name.clone();
        let handle = thread::Builder::new().name(name.clone()).spawn(move || {
            while let Some(job) = rx.blocking_recv() {
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                    tracing::error!(
                        thread = %thread_name,
                        panic = %panic_message(payload.as_ref()),
                        "job panicked on sync executor"
                    );
                }
            }
            tracing::debug!(thread = %thread_name, "sync executor drained");
        })?;

        Ok(Arc::new(Self {
            name,
            thread_id: handle.thread().id(),
            tx: Mutex::new(Some(tx)),
            handle: Mutex::new(Some(handle)),
        }))
    }

    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Whether the caller is running on this executor's thread.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Stop accepting jobs. Already queued jobs still run.
    pub fn shutdown(&self) {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

impl Executor for SyncExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, job: Job) -> Result<(), TaskError> {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        match tx.as_ref() {
            Some(tx) => tx
                .send(job)
                .map_err(|_| TaskError::Rejected(self.name.clone())),
            None => Err(TaskError::Rejected(self.name.clone())),
        }
    }
}

impl Drop for SyncExecutor {
    fn drop(&mut self) {
        self.shutdown();
        // The last reference may be dropped by a job on this very thread.
        if self.is_current() {
            return;
        }
        if let Some(handle) = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::submit;

    #[tokio::test]
    async fn test_runs_on_named_thread_in_order() {
        let exec = SyncExecutor::spawn("sync-test").unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));

        let futures: Vec<_> = (0..5)
            .map(|i| {
                let log = log.clone();
                submit(exec.as_ref(), move || {
                    log.lock().unwrap().push(i);
                    thread::current().name().map(str::to_string)
                })
            })
            .collect();

        for fut in futures {
            assert_eq!(fut.await.unwrap().as_deref(), Some("sync-test"));
        }
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_panic_is_reported_and_thread_survives() {
        let exec = SyncExecutor::spawn("sync-panic").unwrap();
        let err = submit(exec.as_ref(), || panic!("handler exploded"))
            .await
            .map(|_: ()| ())
            .unwrap_err();
        assert_eq!(err, TaskError::Panicked("handler exploded".into()));

        let value = submit(exec.as_ref(), || 42).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_rejects_after_shutdown() {
        let exec = SyncExecutor::spawn("sync-closed").unwrap();
        exec.shutdown();
        let err = submit(exec.as_ref(), || ()).await.unwrap_err();
        assert_eq!(err, TaskError::Rejected("sync-closed".into()));
    }

    #[test]
    fn test_is_current() {
        let exec = SyncExecutor::spawn("sync-current").unwrap();
        assert!(!exec.is_current());
        let (tx, rx) = std::sync::mpsc::channel();
        let probe = exec.clone();
        exec.execute(Box::new(move || {
            let _ = tx.send(probe.is_current());
        }))
        .unwrap();
        assert!(rx.recv().unwrap());
    }
}
