//! Teardown use-case: drain the workload, then destroy the infrastructure.
//!
//! Draining is best-effort. Load-balancer-backed services that are deleted
//! along with the VPC can leave orphaned provider resources, so the workload
//! is removed first when the cluster is reachable; if draining fails the run
//! still proceeds to destruction, recording the drain failure in the report.

use tokio::time::Instant;

use crate::application::ports::{ClusterClient, InfraProvisioner, ProgressReporter};
use crate::application::services::{CancelFlag, cancelled_before, fail_at};
use crate::domain::report::{Phase, RunReport, RunStatus};
use crate::domain::request::DeploymentRequest;

/// Drive one teardown run to a terminal status.
///
/// Idempotent: destroying absent infrastructure is a successful no-op and
/// reports zero resources destroyed.
pub async fn teardown(
    infra: &impl InfraProvisioner,
    cluster: &impl ClusterClient,
    reporter: &impl ProgressReporter,
    request: &DeploymentRequest,
    cancel: &CancelFlag,
) -> RunReport {
    let mut report = RunReport::begin(&request.app, &request.environment);

    // ── DRAINING ──────────────────────────────────────────────────────────
    if cancel.is_cancelled() {
        return cancelled_before(report, Phase::Draining, reporter);
    }
    reporter.step("draining workload...");
    let started = Instant::now();
    match infra.describe(request).await {
        Ok(Some(handle)) => match cluster.authenticate(&handle).await {
            Ok(auth) => match cluster.drain(&auth, request).await {
                Ok(()) => {
                    report.record(
                        Phase::Draining,
                        true,
                        "workload removed",
                        1,
                        started.elapsed(),
                    );
                }
                Err(e) => {
                    reporter.warn(&format!("drain incomplete, continuing to destroy: {e}"));
                    report.record(Phase::Draining, false, e.to_string(), 1, started.elapsed());
                }
            },
            Err(e) => {
                reporter.warn(&format!(
                    "cluster unreachable, skipping drain and continuing to destroy: {e}"
                ));
                report.record(Phase::Draining, false, e.to_string(), 1, started.elapsed());
            }
        },
        Ok(None) => {
            report.record(
                Phase::Draining,
                true,
                "no infrastructure found, nothing to drain",
                1,
                started.elapsed(),
            );
        }
        Err(e) => {
            reporter.warn(&format!(
                "could not read provider state, continuing to destroy: {e}"
            ));
            report.record(Phase::Draining, false, e.to_string(), 1, started.elapsed());
        }
    }

    // ── DESTROYING ────────────────────────────────────────────────────────
    if cancel.is_cancelled() {
        return cancelled_before(report, Phase::Destroying, reporter);
    }
    reporter.step("destroying infrastructure...");
    let started = Instant::now();
    match infra.destroy(request).await {
        Ok(count) => {
            let detail = format!("{count} resources destroyed");
            report.record(Phase::Destroying, true, detail.clone(), 1, started.elapsed());
            reporter.success(&detail);
            report.finish(RunStatus::Destroyed)
        }
        Err(e) => fail_at(
            report,
            Phase::Destroying,
            e.to_string(),
            1,
            started.elapsed(),
            reporter,
        ),
    }
}
