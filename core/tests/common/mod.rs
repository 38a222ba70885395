#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use stagehand_core::transition::NextStageFn;
use stagehand_core::{
    Executors, ParallelExecutor, PluginList, ProgressSink, StageHooks, StageName, StateTransition,
    SyncExecutor, TransitionError,
};
use tokio::runtime::Handle;

pub const SYNC_THREAD: &str = "test-sync";

/// Route core logs to the test harness; `RUST_LOG` selects the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Records increments and labels so tests can check progress accounting.
#[derive(Default)]
pub struct CountingProgress {
    pub increments: AtomicUsize,
    pub labels: Mutex<Vec<String>>,
    pub completed: AtomicUsize,
}

impl CountingProgress {
    pub fn count(&self) -> usize {
        self.increments.load(Ordering::SeqCst)
    }

    pub fn labels(&self) -> Vec<String> {
        self.labels.lock().unwrap().clone()
    }
}

impl ProgressSink for CountingProgress {
    fn name(&self) -> &str {
        "test"
    }

    fn increment(&self) {
        self.increments.fetch_add(1, Ordering::SeqCst);
    }

    fn set_label(&self, label: &str) {
        self.labels.lock().unwrap().push(label.to_string());
    }

    fn complete(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Sync thread plus a parallel executor on the current (multi-thread) runtime.
pub fn executors() -> Executors {
    init_tracing();
    let sync = SyncExecutor::spawn(SYNC_THREAD).unwrap();
    let parallel = ParallelExecutor::from_handle("test-parallel", Handle::current(), 4);
    Executors::new(sync, Arc::new(parallel))
}

/// Success goes to `next`, failure to `error`.
pub fn next_to(next: &str) -> NextStageFn {
    let next = StageName::from(next);
    Arc::new(move |_: &StageName, failed: bool| {
        if failed {
            StageName::error()
        } else {
            next.clone()
        }
    })
}

pub async fn dispatch(
    transition: &StateTransition,
    stage: &str,
    plugins: &PluginList,
    executors: &Executors,
    progress: Arc<CountingProgress>,
    hooks: &StageHooks,
) -> Result<(), TransitionError> {
    transition
        .build(&stage.into(), plugins, executors, progress, hooks, &next_to("done"))
        .await
}

/// Small deterministic generator for property-style tests.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407))
    }

    pub fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    pub fn below(&mut self, n: usize) -> usize {
        (self.next() % n as u64) as usize
    }

    pub fn chance(&mut self, percent: u64) -> bool {
        self.next() % 100 < percent
    }
}
