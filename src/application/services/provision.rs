//! Provision-only use-case: converge infrastructure and verify credentials
//! without building or deploying anything.

use tokio::time::Instant;

use crate::application::ports::{ClusterClient, InfraProvisioner, ProgressReporter};
use crate::application::services::{CancelFlag, cancelled_before, fail_at};
use crate::domain::report::{Phase, RunReport, RunStatus};
use crate::domain::request::DeploymentRequest;

/// Converge infrastructure for the request and confirm the cluster is
/// reachable with fresh credentials.
pub async fn provision(
    infra: &impl InfraProvisioner,
    cluster: &impl ClusterClient,
    reporter: &impl ProgressReporter,
    request: &DeploymentRequest,
    cancel: &CancelFlag,
) -> RunReport {
    let mut report = RunReport::begin(&request.app, &request.environment);

    if cancel.is_cancelled() {
        return cancelled_before(report, Phase::Provisioning, reporter);
    }
    reporter.step("provisioning infrastructure...");
    let started = Instant::now();
    if let Err(e) = infra.ensure(request).await {
        return fail_at(
            report,
            Phase::Provisioning,
            e.to_string(),
            1,
            started.elapsed(),
            reporter,
        );
    }
    let handle = match infra.describe(request).await {
        Ok(Some(handle)) => handle,
        Ok(None) => {
            return fail_at(
                report,
                Phase::Provisioning,
                "infrastructure handle could not be re-derived after apply".to_string(),
                2,
                started.elapsed(),
                reporter,
            );
        }
        Err(e) => {
            return fail_at(
                report,
                Phase::Provisioning,
                e.to_string(),
                2,
                started.elapsed(),
                reporter,
            );
        }
    };
    report.record(
        Phase::Provisioning,
        true,
        format!("cluster '{}' ready", handle.cluster_name),
        2,
        started.elapsed(),
    );
    reporter.success(&format!("cluster '{}' ready", handle.cluster_name));

    if cancel.is_cancelled() {
        return cancelled_before(report, Phase::Authenticating, reporter);
    }
    reporter.step("configuring cluster credentials...");
    let started = Instant::now();
    match cluster.authenticate(&handle).await {
        Ok(auth) => {
            report.record(
                Phase::Authenticating,
                true,
                format!("kubeconfig written to {}", auth.path().display()),
                1,
                started.elapsed(),
            );
            reporter.success("cluster credentials verified");
            report.finish(RunStatus::Succeeded)
        }
        Err(e) => fail_at(
            report,
            Phase::Authenticating,
            e.to_string(),
            1,
            started.elapsed(),
            reporter,
        ),
    }
}
