//! Use-case services: the orchestrator state machines and the readiness poller.
//!
//! Each module imports only from `crate::domain` and
//! `crate::application::ports`; all I/O is routed through injected port traits.

pub mod deploy;
pub mod poller;
pub mod provision;
pub mod teardown;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::application::ports::ProgressReporter;
use crate::domain::report::{Phase, RunReport, RunStatus};

/// Cooperative cancellation flag checked at phase boundaries.
///
/// An operator interrupt stops the run cleanly at the next boundary rather
/// than mid-call, leaving a well-defined last completed phase in the report.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// A flag wired to Ctrl-C.
    #[must_use]
    pub fn on_ctrl_c() -> Self {
        let flag = Self::new();
        let inner = flag.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                inner.cancel();
            }
        });
        flag
    }
}

/// Seal a report as FAILED because the operator cancelled before `phase`.
pub(crate) fn cancelled_before(
    mut report: RunReport,
    phase: Phase,
    reporter: &impl ProgressReporter,
) -> RunReport {
    let msg = format!("run cancelled by operator before {phase}");
    reporter.warn(&msg);
    report.error = Some(msg);
    report.finish(RunStatus::Failed)
}

/// Record a failed phase and seal the report as FAILED.
pub(crate) fn fail_at(
    mut report: RunReport,
    phase: Phase,
    error: String,
    attempts: u32,
    elapsed: Duration,
    reporter: &impl ProgressReporter,
) -> RunReport {
    reporter.warn(&format!("{phase} failed: {error}"));
    report.record(phase, false, error.clone(), attempts, elapsed);
    report.error = Some(error);
    report.finish(RunStatus::Failed)
}
