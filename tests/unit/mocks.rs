//! Shared stub infrastructure for unit tests.
//!
//! Provides canned port implementations and output helpers so each test file
//! doesn't have to re-define the same boilerplate.

#![allow(clippy::expect_used)]
#![allow(dead_code)] // Not every test file uses every stub

use std::collections::HashMap;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;

use eksdeploy::application::ports::{
    ApplyOutcome, ClusterClient, CommandRunner, EndpointProbe, ImagePublisher, InfraProvisioner,
    Probe, ProgressReporter,
};
use eksdeploy::domain::error::{
    ApplyError, AuthError, BuildError, DestroyError, ProbeError, ProvisionError,
};
use eksdeploy::domain::handle::{InfrastructureHandle, KubeconfigGuard};
use eksdeploy::domain::request::{DeploymentRequest, ImageReference, WorkloadSpec};

// ── Output helpers ────────────────────────────────────────────────────────────

pub fn ok_output(stdout: &[u8]) -> Output {
    Output {
        status: ExitStatus::from_raw(0),
        stdout: stdout.to_vec(),
        stderr: Vec::new(),
    }
}

pub fn err_output(stderr: &[u8]) -> Output {
    Output {
        status: ExitStatus::from_raw(1 << 8),
        stdout: Vec::new(),
        stderr: stderr.to_vec(),
    }
}

pub fn exit_output(code: i32, stdout: &[u8]) -> Output {
    Output {
        status: ExitStatus::from_raw(code << 8),
        stdout: stdout.to_vec(),
        stderr: Vec::new(),
    }
}

pub fn handle() -> InfrastructureHandle {
    InfrastructureHandle {
        cluster_name: "demo-dev-eks".into(),
        registry_uri: "123.dkr.ecr.us-east-2.amazonaws.com/demo-dev".into(),
        network_id: "vpc-0abc".into(),
        region: "us-east-2".into(),
    }
}

pub fn request() -> DeploymentRequest {
    DeploymentRequest {
        app: "demo".into(),
        environment: "dev".into(),
        region: "us-east-2".into(),
        replicas: 2,
        build_context: PathBuf::from("."),
        tag: "abc123".into(),
        allow_network_change: false,
    }
}

fn guard() -> KubeconfigGuard {
    KubeconfigGuard::unmanaged(PathBuf::from("/tmp/kubeconfig-unit-test"))
}

// ── Reporter ──────────────────────────────────────────────────────────────────

pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn step(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warn(&self, _: &str) {}
}

// ── Infra provisioner stub ────────────────────────────────────────────────────

pub struct StubInfra {
    pub handle: InfrastructureHandle,
    /// What `describe` reports after `ensure` ran.
    pub present: bool,
    pub ensure_error: Option<ProvisionError>,
    pub destroy_error: Option<DestroyError>,
    pub destroyed: u32,
    pub ensure_calls: Mutex<u32>,
    pub destroy_calls: Mutex<u32>,
}

impl Default for StubInfra {
    fn default() -> Self {
        Self {
            handle: handle(),
            present: true,
            ensure_error: None,
            destroy_error: None,
            destroyed: 31,
            ensure_calls: Mutex::new(0),
            destroy_calls: Mutex::new(0),
        }
    }
}

impl InfraProvisioner for StubInfra {
    async fn ensure(
        &self,
        _: &DeploymentRequest,
    ) -> std::result::Result<InfrastructureHandle, ProvisionError> {
        *self.ensure_calls.lock().expect("lock") += 1;
        match &self.ensure_error {
            Some(e) => Err(e.clone()),
            None => Ok(self.handle.clone()),
        }
    }

    async fn describe(
        &self,
        _: &DeploymentRequest,
    ) -> std::result::Result<Option<InfrastructureHandle>, ProvisionError> {
        Ok(self.present.then(|| self.handle.clone()))
    }

    async fn destroy(&self, _: &DeploymentRequest) -> std::result::Result<u32, DestroyError> {
        *self.destroy_calls.lock().expect("lock") += 1;
        match &self.destroy_error {
            Some(e) => Err(e.clone()),
            None => Ok(self.destroyed),
        }
    }
}

// ── Image publisher stub ──────────────────────────────────────────────────────

#[derive(Default)]
pub struct StubPublisher {
    pub error: Option<BuildError>,
    pub calls: Mutex<u32>,
}

impl ImagePublisher for StubPublisher {
    async fn build_and_publish(
        &self,
        _: &Path,
        handle: &InfrastructureHandle,
        tag: &str,
    ) -> std::result::Result<ImageReference, BuildError> {
        *self.calls.lock().expect("lock") += 1;
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(ImageReference {
                repository: handle.registry_uri.clone(),
                tag: tag.to_string(),
                digest: Some("sha256:abc".into()),
            }),
        }
    }
}

// ── Cluster client stub ───────────────────────────────────────────────────────

pub struct StubCluster {
    pub auth_error: Option<AuthError>,
    pub apply_error: Option<ApplyError>,
    pub apply_outcome: ApplyOutcome,
    pub apply_calls: Mutex<u32>,
    pub drain_error: Option<ApplyError>,
    pub drain_calls: Mutex<u32>,
    /// Number of `Pending` rollout observations before `Ready`.
    pub rollout_ready_after: u32,
    pub rollout_fatal: Option<String>,
    pub rollout_calls: Mutex<u32>,
    /// `None` keeps the hostname probe pending forever.
    pub hostname: Option<String>,
}

impl Default for StubCluster {
    fn default() -> Self {
        Self {
            auth_error: None,
            apply_error: None,
            apply_outcome: ApplyOutcome::Configured,
            apply_calls: Mutex::new(0),
            drain_error: None,
            drain_calls: Mutex::new(0),
            rollout_ready_after: 0,
            rollout_fatal: None,
            rollout_calls: Mutex::new(0),
            hostname: Some("demo.dev.example.com".into()),
        }
    }
}

impl ClusterClient for StubCluster {
    async fn authenticate(
        &self,
        _: &InfrastructureHandle,
    ) -> std::result::Result<KubeconfigGuard, AuthError> {
        match &self.auth_error {
            Some(e) => Err(e.clone()),
            None => Ok(guard()),
        }
    }

    async fn apply(
        &self,
        _: &KubeconfigGuard,
        _: &DeploymentRequest,
        _: &WorkloadSpec,
    ) -> std::result::Result<ApplyOutcome, ApplyError> {
        *self.apply_calls.lock().expect("lock") += 1;
        match &self.apply_error {
            Some(e) => Err(e.clone()),
            None => Ok(self.apply_outcome),
        }
    }

    async fn rollout_status(
        &self,
        _: &KubeconfigGuard,
        _: &DeploymentRequest,
    ) -> std::result::Result<Probe<()>, ProbeError> {
        if let Some(message) = &self.rollout_fatal {
            return Err(ProbeError::Fatal(message.clone()));
        }
        let mut calls = self.rollout_calls.lock().expect("lock");
        *calls += 1;
        if *calls > self.rollout_ready_after {
            Ok(Probe::Ready(()))
        } else {
            Ok(Probe::Pending("1 of 2 replicas updated".into()))
        }
    }

    async fn service_hostname(
        &self,
        _: &KubeconfigGuard,
        _: &DeploymentRequest,
    ) -> std::result::Result<Probe<String>, ProbeError> {
        match &self.hostname {
            Some(host) => Ok(Probe::Ready(host.clone())),
            None => Ok(Probe::Pending("load balancer hostname not yet assigned".into())),
        }
    }

    async fn drain(
        &self,
        _: &KubeconfigGuard,
        _: &DeploymentRequest,
    ) -> std::result::Result<(), ApplyError> {
        *self.drain_calls.lock().expect("lock") += 1;
        match &self.drain_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

// ── Endpoint probe stub ───────────────────────────────────────────────────────

pub struct StubEndpoint {
    pub ready: bool,
    pub calls: Mutex<u32>,
}

impl Default for StubEndpoint {
    fn default() -> Self {
        Self {
            ready: true,
            calls: Mutex::new(0),
        }
    }
}

impl EndpointProbe for StubEndpoint {
    async fn http_ok(&self, _: &str) -> std::result::Result<Probe<u16>, ProbeError> {
        *self.calls.lock().expect("lock") += 1;
        if self.ready {
            Ok(Probe::Ready(200))
        } else {
            Err(ProbeError::Transient("connection refused".into()))
        }
    }
}

// ── Scripted command runner ───────────────────────────────────────────────────

/// Replays canned outputs keyed by subcommand (the first non-flag argument)
/// and records every invocation.
pub struct ScriptedRunner {
    outputs: Mutex<HashMap<String, Vec<Output>>>,
    pub calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self {
            outputs: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a response for a subcommand. Responses are consumed in order;
    /// the last one repeats once the queue runs dry.
    pub fn on(self, subcommand: &str, output: Output) -> Self {
        self.outputs
            .lock()
            .expect("lock")
            .entry(subcommand.to_string())
            .or_default()
            .push(output);
        self
    }

    /// Invocations whose subcommand matched `subcommand`.
    pub fn calls_to(&self, subcommand: &str) -> usize {
        self.calls
            .lock()
            .expect("lock")
            .iter()
            .filter(|args| args.iter().any(|a| a == subcommand))
            .count()
    }

    fn respond(&self, program: &str, args: &[&str], envs: &[(&str, &str)]) -> Result<Output> {
        // Env pairs are recorded as "KEY=VALUE" entries alongside the argv.
        self.calls.lock().expect("lock").push(
            std::iter::once(program.to_string())
                .chain(args.iter().map(ToString::to_string))
                .chain(envs.iter().map(|(k, v)| format!("{k}={v}")))
                .collect(),
        );
        let key = args
            .iter()
            .find(|a| !a.starts_with('-'))
            .map_or_else(String::new, ToString::to_string);
        let mut outputs = self.outputs.lock().expect("lock");
        let queue = outputs
            .get_mut(&key)
            .ok_or_else(|| anyhow::anyhow!("no scripted output for '{program} {key}'"))?;
        if queue.len() > 1 {
            Ok(queue.remove(0))
        } else {
            Ok(queue[0].clone())
        }
    }
}

// Adapters take runners by value; sharing one script between two runner
// slots goes through `Arc`, covered by the library's blanket impl.
impl CommandRunner for ScriptedRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        self.respond(program, args, &[])
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        _: Duration,
    ) -> Result<Output> {
        self.respond(program, args, &[])
    }

    async fn run_with_stdin(&self, program: &str, args: &[&str], _: &[u8]) -> Result<Output> {
        self.respond(program, args, &[])
    }

    async fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        envs: &[(&str, &str)],
    ) -> Result<Output> {
        self.respond(program, args, envs)
    }
}
