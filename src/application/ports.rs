//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` — never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::Path;
use std::process::Output;
use std::time::Duration;

use anyhow::Result;

use crate::domain::error::{
    ApplyError, AuthError, BuildError, DestroyError, ProbeError, ProvisionError,
};
use crate::domain::handle::{InfrastructureHandle, KubeconfigGuard};
use crate::domain::request::{DeploymentRequest, ImageReference, WorkloadSpec};

// ── Value types ───────────────────────────────────────────────────────────────

/// One observation from a readiness probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    /// The awaited condition holds.
    Ready(T),
    /// Not yet; carries a human-readable observation for the report.
    Pending(String),
}

/// What `kubectl apply` did with the submitted spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Identical spec — no rollout was triggered.
    Unchanged,
    /// Spec created or changed — a rolling update is in progress.
    Configured,
}

// ── Command runner port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output, using the instance's default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;

    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output>;

    /// Run a program with stdin piped from `input`.
    async fn run_with_stdin(&self, program: &str, args: &[&str], input: &[u8]) -> Result<Output>;

    /// Run a program with extra environment variables set for this
    /// invocation only. Used where per-process state must not leak through
    /// files shared between concurrent runs.
    async fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        envs: &[(&str, &str)],
    ) -> Result<Output>;
}

/// Delegating impl so one runner can be shared between adapter slots via `Arc`.
impl<T: CommandRunner> CommandRunner for std::sync::Arc<T> {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        T::run(self, program, args).await
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output> {
        T::run_with_timeout(self, program, args, timeout).await
    }

    async fn run_with_stdin(&self, program: &str, args: &[&str], input: &[u8]) -> Result<Output> {
        T::run_with_stdin(self, program, args, input).await
    }

    async fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        envs: &[(&str, &str)],
    ) -> Result<Output> {
        T::run_with_env(self, program, args, envs).await
    }
}

// ── Provider adapter ports ────────────────────────────────────────────────────

/// Infrastructure provisioning: ensure-present, describe, destroy.
#[allow(async_fn_in_trait)]
pub trait InfraProvisioner {
    /// Converge infrastructure for the request and return its handle.
    ///
    /// Idempotent: if matching infrastructure already exists and is healthy,
    /// the existing handle is returned without re-creating anything, and the
    /// underlying tool reporting "no changes" is success. State is always
    /// re-derived from the provider — never from a local done-flag — so an
    /// interrupted prior run resumes rather than restarting.
    async fn ensure(&self, request: &DeploymentRequest)
    -> Result<InfrastructureHandle, ProvisionError>;

    /// Read the current handle from provider state, `None` if absent.
    async fn describe(
        &self,
        request: &DeploymentRequest,
    ) -> Result<Option<InfrastructureHandle>, ProvisionError>;

    /// Tear down everything `ensure` created; returns the number of resources
    /// destroyed. Safe on partially created or already-gone infrastructure.
    async fn destroy(&self, request: &DeploymentRequest) -> Result<u32, DestroyError>;
}

/// Container image build and publish.
#[allow(async_fn_in_trait)]
pub trait ImagePublisher {
    /// Build the image from `context` and push it to the handle's registry.
    ///
    /// Fails fast on build errors; transient push failures are retried with a
    /// small fixed bound before surfacing a terminal error.
    async fn build_and_publish(
        &self,
        context: &Path,
        handle: &InfrastructureHandle,
        tag: &str,
    ) -> Result<ImageReference, BuildError>;
}

/// Cluster control-plane operations.
#[allow(async_fn_in_trait)]
pub trait ClusterClient {
    /// Configure credentials for the cluster; the returned guard owns the
    /// scoped kubeconfig file and removes it on drop.
    async fn authenticate(
        &self,
        handle: &InfrastructureHandle,
    ) -> Result<KubeconfigGuard, AuthError>;

    /// Submit the workload definition. Idempotent: re-applying an identical
    /// spec is a no-op; a changed spec triggers a rolling update.
    async fn apply(
        &self,
        auth: &KubeconfigGuard,
        request: &DeploymentRequest,
        spec: &WorkloadSpec,
    ) -> Result<ApplyOutcome, ApplyError>;

    /// One rollout-complete observation (pods transitioning is `Pending`,
    /// never an error).
    async fn rollout_status(
        &self,
        auth: &KubeconfigGuard,
        request: &DeploymentRequest,
    ) -> Result<Probe<()>, ProbeError>;

    /// One load-balancer-hostname observation.
    async fn service_hostname(
        &self,
        auth: &KubeconfigGuard,
        request: &DeploymentRequest,
    ) -> Result<Probe<String>, ProbeError>;

    /// Best-effort delete of the workload objects.
    async fn drain(
        &self,
        auth: &KubeconfigGuard,
        request: &DeploymentRequest,
    ) -> Result<(), ApplyError>;
}

/// HTTP reachability check against the public endpoint.
#[allow(async_fn_in_trait)]
pub trait EndpointProbe {
    /// One HTTP observation: `Ready` on 200, `Pending` on any other status,
    /// transient error on transport failures (DNS lag, connection refused).
    async fn http_ok(&self, url: &str) -> Result<Probe<u16>, ProbeError>;
}

// ── Progress reporting port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait — no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}
