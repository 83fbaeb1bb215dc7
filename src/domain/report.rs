//! Run report — the structured record of what one orchestrator run did.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Orchestrator phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Provisioning,
    Authenticating,
    Building,
    Applying,
    AwaitingReady,
    Draining,
    Destroying,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Provisioning => "PROVISIONING",
            Self::Authenticating => "AUTHENTICATING",
            Self::Building => "BUILDING",
            Self::Applying => "APPLYING",
            Self::AwaitingReady => "AWAITING_READY",
            Self::Draining => "DRAINING",
            Self::Destroying => "DESTROYING",
        };
        f.write_str(s)
    }
}

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// All phases completed and the endpoint answered.
    Succeeded,
    /// Infrastructure and workload exist, but readiness was not confirmed
    /// within the timeout. Deliberately distinct from `Failed`: resources
    /// are running and billable.
    Degraded,
    /// A phase failed; the run stopped at that hard gate.
    Failed,
    /// Teardown completed.
    Destroyed,
}

impl RunStatus {
    /// Process exit code — distinct per status so calling automation can
    /// branch on FAILED vs DEGRADED.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Succeeded | Self::Destroyed => 0,
            Self::Failed => 1,
            Self::Degraded => 2,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Succeeded => "SUCCEEDED",
            Self::Degraded => "DEGRADED",
            Self::Failed => "FAILED",
            Self::Destroyed => "DESTROYED",
        };
        f.write_str(s)
    }
}

/// Outcome of one phase.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseOutcome {
    pub phase: Phase,
    pub ok: bool,
    pub detail: String,
    /// Adapter calls / poll attempts made during the phase.
    pub attempts: u32,
    pub duration_ms: u64,
}

/// Structured record of one orchestrator run.
///
/// Created at run start, appended to by every phase, emitted once at the end
/// and never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub app: String,
    pub environment: String,
    pub started_at: DateTime<Utc>,
    pub status: RunStatus,
    pub phases: Vec<PhaseOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub total_duration_ms: u64,
}

impl RunReport {
    #[must_use]
    pub fn begin(app: &str, environment: &str) -> Self {
        Self {
            app: app.to_string(),
            environment: environment.to_string(),
            started_at: Utc::now(),
            status: RunStatus::Failed,
            phases: Vec::new(),
            endpoint: None,
            error: None,
            total_duration_ms: 0,
        }
    }

    /// Append a phase outcome.
    pub fn record(
        &mut self,
        phase: Phase,
        ok: bool,
        detail: impl Into<String>,
        attempts: u32,
        elapsed: Duration,
    ) {
        self.phases.push(PhaseOutcome {
            phase,
            ok,
            detail: detail.into(),
            attempts,
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        });
    }

    /// Seal the report with its terminal status and total duration.
    #[must_use]
    pub fn finish(mut self, status: RunStatus) -> Self {
        self.status = status;
        let elapsed = Utc::now() - self.started_at;
        self.total_duration_ms = u64::try_from(elapsed.num_milliseconds()).unwrap_or(0);
        self
    }

    /// The last phase that completed successfully, if any.
    #[must_use]
    pub fn last_completed_phase(&self) -> Option<Phase> {
        self.phases.iter().rev().find(|p| p.ok).map(|p| p.phase)
    }

    /// The first phase that failed, if any.
    #[must_use]
    pub fn failed_phase(&self) -> Option<Phase> {
        self.phases.iter().find(|p| !p.ok).map(|p| p.phase)
    }

    /// Concrete next action for the operator, derived from the outcome.
    #[must_use]
    pub fn next_action(&self) -> String {
        match self.status {
            RunStatus::Succeeded => match &self.endpoint {
                Some(url) => format!("Open {url}"),
                None => "Run 'eksdeploy deploy' to roll out the workload.".to_string(),
            },
            RunStatus::Degraded => "Infrastructure and workload exist (and are billable). \
                 Wait and re-run 'eksdeploy deploy', inspect pods with kubectl, \
                 or run 'eksdeploy destroy' to tear down."
                .to_string(),
            RunStatus::Destroyed => "Nothing further to do.".to_string(),
            RunStatus::Failed => self.failed_next_action(),
        }
    }

    fn failed_next_action(&self) -> String {
        match self.failed_phase() {
            Some(Phase::Provisioning) => "Inspect the Terraform error, then retry \
                 'eksdeploy provision'. No workload was deployed."
                .to_string(),
            Some(Phase::Authenticating | Phase::Building | Phase::Applying) => {
                "Infrastructure exists but the app was not rolled out. Fix the reported \
                 error and retry 'eksdeploy deploy', or run 'eksdeploy destroy' to tear down."
                    .to_string()
            }
            Some(Phase::AwaitingReady) => "Infrastructure and workload exist. Inspect pod \
                 logs with kubectl, then retry 'eksdeploy deploy' or run 'eksdeploy destroy'."
                .to_string(),
            Some(Phase::Draining | Phase::Destroying) => {
                "Re-run 'eksdeploy destroy'; teardown converges on repeated runs.".to_string()
            }
            None => "Retry the command.".to_string(),
        }
    }
}
