use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Progress of one stage. Incremented once per plugin per transition.
pub trait ProgressSink: Send + Sync {
    fn name(&self) -> &str;
    fn increment(&self);
    fn set_label(&self, label: &str);
    fn complete(&self);
}

/// Hands out one [`ProgressSink`] per stage of a run.
pub trait ProgressReporter: Send + Sync {
    fn begin(&self, stage: &str, message: &str, units: usize) -> Arc<dyn ProgressSink>;
    fn finish(&self, success: bool);
}

/// Discards all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn name(&self) -> &str {
        "loading"
    }

    fn increment(&self) {}

    fn set_label(&self, _label: &str) {}

    fn complete(&self) {}
}

impl ProgressReporter for NoopProgress {
    fn begin(&self, _stage: &str, _message: &str, _units: usize) -> Arc<dyn ProgressSink> {
        Arc::new(NoopProgress)
    }

    fn finish(&self, _success: bool) {}
}

/// Terminal progress bars for a loading run
///
/// One overall bar counts stages; each stage gets its own bar counting
/// plugins, or a spinner when the stage has no per-plugin units.
pub struct ProgressMonitor {
    /// Multi-progress container
    multi: MultiProgress,
    /// Overall progress bar
    overall: ProgressBar,
    /// Bar of the stage in flight
    current: Mutex<Option<ProgressBar>>,
    /// Whether monitoring is enabled
    enabled: bool,
}

impl ProgressMonitor {
    /// Create a new progress monitor
    ///
    /// # Arguments
    ///
    /// * `total_stages` - Number of stages in the catalog
    /// * `enabled` - Whether to draw anything (disabled for `--json` output)
    pub fn new(total_stages: usize, enabled: bool) -> Self {
        if !enabled {
            return Self {
                multi: MultiProgress::new(),
                overall: ProgressBar::hidden(),
                current: Mutex::new(None),
                enabled: false,
            };
        }

        let multi = MultiProgress::new();
        let overall = multi.add(ProgressBar::new(total_stages as u64));
        overall.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} stages {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓▒░  "),
        );
        overall.set_message("Starting...");

        Self {
            multi,
            overall,
            current: Mutex::new(None),
            enabled: true,
        }
    }

    fn stage_bar(&self, units: usize) -> ProgressBar {
        if units == 0 {
            let bar = self.multi.add(ProgressBar::new_spinner());
            bar.set_style(
                ProgressStyle::default_spinner()
                    .template("  {spinner:.green} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner())
                    .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        } else {
            let bar = self.multi.add(ProgressBar::new(units as u64));
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("  {bar:30.green/white} {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar
        }
    }
}

impl ProgressReporter for ProgressMonitor {
    fn begin(&self, stage: &str, message: &str, units: usize) -> Arc<dyn ProgressSink> {
        let bar = if self.enabled {
            self.overall.set_message(message.to_string());
            self.stage_bar(units)
        } else {
            ProgressBar::hidden()
        };
        bar.set_message(message.to_string());

        let previous = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(bar.clone());
        if let Some(previous) = previous {
            previous.finish_and_clear();
        }

        Arc::new(StageProgress {
            name: stage.to_string(),
            bar,
            overall: self.overall.clone(),
        })
    }

    fn finish(&self, success: bool) {
        if !self.enabled {
            return;
        }

        let msg = if success {
            "✅ Loading complete"
        } else {
            "❌ Loading failed"
        };

        self.overall.finish_with_message(msg);
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        if let Some(bar) = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            bar.finish_and_clear();
        }
    }
}

/// Sink for a single stage, backed by that stage's bar.
struct StageProgress {
    name: String,
    bar: ProgressBar,
    overall: ProgressBar,
}

impl ProgressSink for StageProgress {
    fn name(&self) -> &str {
        &self.name
    }

    fn increment(&self) {
        self.bar.inc(1);
    }

    fn set_label(&self, label: &str) {
        self.bar.set_message(label.to_string());
    }

    fn complete(&self) {
        self.bar.finish_and_clear();
        self.overall.inc(1);
    }
}
