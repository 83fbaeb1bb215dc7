//! Deployment use-case — the forward state machine.
//!
//! PROVISIONING → AUTHENTICATING → BUILDING → APPLYING → AWAITING_READY.
//! Every phase is a hard gate: a failure stops the run before the next phase
//! so a workload is never applied against absent or misconfigured
//! infrastructure. Readiness timeouts end in DEGRADED, not FAILED — the
//! infrastructure and workload exist and are billable, and the report must
//! say so rather than imply total failure. Completed phases are never rolled
//! back automatically; destruction is operator-initiated.

use std::time::Duration;

use tokio::time::Instant;

use crate::application::ports::{
    ApplyOutcome, ClusterClient, EndpointProbe, ImagePublisher, InfraProvisioner, ProgressReporter,
};
use crate::application::services::poller::{self, PollOutcome};
use crate::application::services::{CancelFlag, cancelled_before, fail_at};
use crate::domain::request::{DeploymentRequest, WorkloadSpec};
use crate::domain::report::{Phase, RunReport, RunStatus};

/// Poll budgets for the AWAITING_READY phase.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    pub rollout_timeout: Duration,
    pub hostname_timeout: Duration,
    /// The final HTTP check gets the longest budget — DNS propagation for a
    /// fresh load balancer routinely takes minutes.
    pub endpoint_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            rollout_timeout: Duration::from_secs(300),
            hostname_timeout: Duration::from_secs(300),
            endpoint_timeout: Duration::from_secs(600),
            poll_interval: Duration::from_secs(10),
        }
    }
}

/// Drive one deployment run to a terminal status.
///
/// Never returns an error: every outcome, including failure, is expressed in
/// the returned `RunReport` so the caller can render it and map the status to
/// an exit code.
#[allow(clippy::too_many_lines)]
pub async fn deploy(
    infra: &impl InfraProvisioner,
    publisher: &impl ImagePublisher,
    cluster: &impl ClusterClient,
    endpoint: &impl EndpointProbe,
    reporter: &impl ProgressReporter,
    request: &DeploymentRequest,
    config: &DeployConfig,
    cancel: &CancelFlag,
) -> RunReport {
    let mut report = RunReport::begin(&request.app, &request.environment);

    // ── PROVISIONING ──────────────────────────────────────────────────────
    if cancel.is_cancelled() {
        return cancelled_before(report, Phase::Provisioning, reporter);
    }
    reporter.step("provisioning infrastructure...");
    let started = Instant::now();
    let ensured = match infra.ensure(request).await {
        Ok(handle) => handle,
        Err(e) => {
            return fail_at(
                report,
                Phase::Provisioning,
                e.to_string(),
                1,
                started.elapsed(),
                reporter,
            );
        }
    };
    // The provider's state store is the source of truth: re-derive the handle
    // before letting any later phase depend on it.
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
    if ensured != handle {
        reporter.warn("provider state changed between apply and describe; using described state");
    }
    report.record(
        Phase::Provisioning,
        true,
        format!("cluster '{}' ready", handle.cluster_name),
        2,
        started.elapsed(),
    );
    reporter.success(&format!("cluster '{}' ready", handle.cluster_name));

    // ── AUTHENTICATING ────────────────────────────────────────────────────
    if cancel.is_cancelled() {
        return cancelled_before(report, Phase::Authenticating, reporter);
    }
    reporter.step("configuring cluster credentials...");
    let started = Instant::now();
    let auth = match cluster.authenticate(&handle).await {
        Ok(auth) => auth,
        Err(e) => {
            return fail_at(
                report,
                Phase::Authenticating,
                e.to_string(),
                1,
                started.elapsed(),
                reporter,
            );
        }
    };
    report.record(
        Phase::Authenticating,
        true,
        format!("kubeconfig written to {}", auth.path().display()),
        1,
        started.elapsed(),
    );

    // ── BUILDING ──────────────────────────────────────────────────────────
    if cancel.is_cancelled() {
        return cancelled_before(report, Phase::Building, reporter);
    }
    reporter.step(&format!(
        "building and publishing {}:{}...",
        handle.registry_uri, request.tag
    ));
    let started = Instant::now();
    let image = match publisher
        .build_and_publish(&request.build_context, &handle, &request.tag)
        .await
    {
        Ok(image) => image,
        Err(e) => {
            return fail_at(
                report,
                Phase::Building,
                e.to_string(),
                1,
                started.elapsed(),
                reporter,
            );
        }
    };
    report.record(
        Phase::Building,
        true,
        format!("pushed {image}"),
        1,
        started.elapsed(),
    );
    reporter.success(&format!("pushed {image}"));

    // ── APPLYING ──────────────────────────────────────────────────────────
    if cancel.is_cancelled() {
        return cancelled_before(report, Phase::Applying, reporter);
    }
    reporter.step("applying workload...");
    let started = Instant::now();
    let spec = WorkloadSpec::from_request(request, image);
    match cluster.apply(&auth, request, &spec).await {
        Ok(ApplyOutcome::Unchanged) => {
            report.record(
                Phase::Applying,
                true,
                "spec unchanged, no rollout triggered",
                1,
                started.elapsed(),
            );
        }
        Ok(ApplyOutcome::Configured) => {
            report.record(
                Phase::Applying,
                true,
                "workload configured, rolling update in progress",
                1,
                started.elapsed(),
            );
        }
        Err(e) => {
            return fail_at(
                report,
                Phase::Applying,
                e.to_string(),
                1,
                started.elapsed(),
                reporter,
            );
        }
    }

    // ── AWAITING_READY ────────────────────────────────────────────────────
    if cancel.is_cancelled() {
        return cancelled_before(report, Phase::AwaitingReady, reporter);
    }
    let started = Instant::now();
    let mut attempts: u32 = 0;

    reporter.step("waiting for rollout to complete...");
    let rollout = poller::poll(config.rollout_timeout, config.poll_interval, || {
        cluster.rollout_status(&auth, request)
    })
    .await;
    attempts += rollout.attempts;
    match rollout.outcome {
        PollOutcome::Satisfied(()) => {}
        PollOutcome::TimedOut { last_observation } => {
            return degrade(
                report,
                reporter,
                attempts,
                started.elapsed(),
                format!(
                    "rollout incomplete after {}s: {last_observation}",
                    config.rollout_timeout.as_secs()
                ),
                None,
            );
        }
        PollOutcome::Aborted(message) => {
            return fail_at(
                report,
                Phase::AwaitingReady,
                message,
                attempts,
                started.elapsed(),
                reporter,
            );
        }
    }

    reporter.step("waiting for the service endpoint...");
    let hostname = poller::poll(config.hostname_timeout, config.poll_interval, || {
        cluster.service_hostname(&auth, request)
    })
    .await;
    attempts += hostname.attempts;
    let url = match hostname.outcome {
        PollOutcome::Satisfied(host) => format!("http://{host}"),
        PollOutcome::TimedOut { last_observation } => {
            return degrade(
                report,
                reporter,
                attempts,
                started.elapsed(),
                format!(
                    "no endpoint hostname after {}s: {last_observation}",
                    config.hostname_timeout.as_secs()
                ),
                None,
            );
        }
        PollOutcome::Aborted(message) => {
            return fail_at(
                report,
                Phase::AwaitingReady,
                message,
                attempts,
                started.elapsed(),
                reporter,
            );
        }
    };

    reporter.step(&format!("waiting for {url} to respond..."));
    let http = poller::poll(config.endpoint_timeout, config.poll_interval, || {
        endpoint.http_ok(&url)
    })
    .await;
    attempts += http.attempts;
    match http.outcome {
        PollOutcome::Satisfied(_) => {
            report.record(
                Phase::AwaitingReady,
                true,
                format!("{url} returned HTTP 200"),
                attempts,
                started.elapsed(),
            );
            report.endpoint = Some(url);
            reporter.success("deployment ready");
            report.finish(RunStatus::Succeeded)
        }
        PollOutcome::TimedOut { last_observation } => degrade(
            report,
            reporter,
            attempts,
            started.elapsed(),
            format!(
                "{url} not healthy after {}s: {last_observation}",
                config.endpoint_timeout.as_secs()
            ),
            Some(url),
        ),
        PollOutcome::Aborted(message) => fail_at(
            report,
            Phase::AwaitingReady,
            message,
            attempts,
            started.elapsed(),
            reporter,
        ),
    }
}

/// Seal a report as DEGRADED after a readiness timeout.
fn degrade(
    mut report: RunReport,
    reporter: &impl ProgressReporter,
    attempts: u32,
    elapsed: Duration,
    detail: String,
    endpoint: Option<String>,
) -> RunReport {
    reporter.warn(&format!("deployment is DEGRADED: {detail}"));
    reporter.warn("infrastructure and workload exist; the app is not confirmed healthy");
    report.record(Phase::AwaitingReady, false, detail.clone(), attempts, elapsed);
    report.endpoint = endpoint;
    report.error = Some(detail);
    report.finish(RunStatus::Degraded)
}
