//! Terraform adapter implementing the `InfraProvisioner` port.
//!
//! All state is derived from Terraform's own state store, never from local
//! done-flags, so an interrupted run resumes where it left off. Concurrency
//! safety comes from Terraform's state locking: every mutating invocation
//! passes `-lock=true -lock-timeout=60s`, and a lock held past the timeout
//! surfaces as a transient `StateLocked` error.
//!
//! The workspace is passed per-invocation via `TF_WORKSPACE` and the plan
//! file is named per prefix. `terraform workspace select` persists its choice
//! in `.terraform/environment`, which concurrent runs sharing one module
//! checkout would overwrite under each other; nothing here reads that file.

use std::process::Output;
use std::time::Duration;

use regex::Regex;
use semver::Version;
use serde_json::Value;

use crate::application::ports::{CommandRunner, InfraProvisioner};
use crate::domain::error::{DestroyError, ProvisionError};
use crate::domain::handle::InfrastructureHandle;
use crate::domain::request::DeploymentRequest;
use crate::infra::command_runner::{DEFAULT_CMD_TIMEOUT, DEFAULT_SLOW_TIMEOUT, TokioCommandRunner};

/// Minimum supported terraform release. `-detailed-exitcode` plan handling
/// and `-lock-timeout` behave consistently from this line onward.
const MIN_TERRAFORM_VERSION: &str = "1.4.0";

/// Retries for a mutating call that lost the state-lock race.
const LOCK_ATTEMPTS: u32 = 3;
const LOCK_BACKOFF: Duration = Duration::from_secs(5);

/// Terraform adapter that routes all CLI calls through a `CommandRunner`.
///
/// Generic over `R: CommandRunner` so that tests can inject a scripted runner
/// without spawning real processes. `quick` covers version/output/workspace
/// calls; `slow` covers plan, apply, and destroy.
pub struct TerraformCli<R: CommandRunner> {
    quick: R,
    slow: R,
    module_dir: String,
    lock_backoff: Duration,
}

impl TerraformCli<TokioCommandRunner> {
    /// Production constructor pointing at the Terraform module directory.
    #[must_use]
    pub fn new(module_dir: &str) -> Self {
        Self {
            quick: TokioCommandRunner::new(DEFAULT_CMD_TIMEOUT),
            slow: TokioCommandRunner::new(DEFAULT_SLOW_TIMEOUT),
            module_dir: module_dir.to_string(),
            lock_backoff: LOCK_BACKOFF,
        }
    }
}

impl<R: CommandRunner> TerraformCli<R> {
    pub fn with_runners(quick: R, slow: R, module_dir: &str) -> Self {
        Self {
            quick,
            slow,
            module_dir: module_dir.to_string(),
            lock_backoff: LOCK_BACKOFF,
        }
    }

    /// Override the lock-retry backoff. Tests use `Duration::ZERO`.
    #[must_use]
    pub fn lock_backoff(mut self, backoff: Duration) -> Self {
        self.lock_backoff = backoff;
        self
    }

    fn chdir(&self) -> String {
        format!("-chdir={}", self.module_dir)
    }

    /// Refuse to proceed on a missing or out-of-date terraform binary.
    async fn version_gate(&self) -> Result<(), ProvisionError> {
        let output = self
            .quick
            .run("terraform", &["version", "-json"])
            .await
            .map_err(|e| runner_error("version", &e))?;
        if !output.status.success() {
            return Err(ProvisionError::ToolMissing);
        }
        let found = parse_terraform_version(&String::from_utf8_lossy(&output.stdout))?;
        let min = Version::parse(MIN_TERRAFORM_VERSION)
            .map_err(|e| ProvisionError::BadOutputs(e.to_string()))?;
        if found < min {
            return Err(ProvisionError::ToolTooOld {
                found: found.to_string(),
                min: MIN_TERRAFORM_VERSION.to_string(),
            });
        }
        Ok(())
    }

    /// `init` plus creating the per-deployment workspace. Both are
    /// idempotent; the workspace isolates state between app/environment pairs
    /// sharing one backend. The workspace is never *selected*: selection is
    /// a per-checkout file, so every later command names it via
    /// `TF_WORKSPACE` instead.
    async fn prepare(&self, request: &DeploymentRequest) -> Result<(), ProvisionError> {
        let chdir = self.chdir();
        let output = self
            .slow
            .run("terraform", &[&chdir, "init", "-input=false", "-no-color"])
            .await
            .map_err(|e| runner_error("init", &e))?;
        if !output.status.success() {
            return Err(classify("init", &output));
        }

        let workspace = request.prefix();
        let output = self
            .quick
            .run(
                "terraform",
                &[&chdir, "workspace", "new", workspace.as_str()],
            )
            .await
            .map_err(|e| runner_error("workspace new", &e))?;
        if !output.status.success()
            && !String::from_utf8_lossy(&output.stderr)
                .to_lowercase()
                .contains("already exists")
        {
            return Err(classify("workspace new", &output));
        }
        Ok(())
    }

    fn var_args(request: &DeploymentRequest) -> Vec<String> {
        vec![
            format!("-var=name_prefix={}", request.prefix()),
            format!("-var=region={}", request.region),
        ]
    }

    /// Run a mutating terraform command in the request's workspace, retrying
    /// a bounded number of times when the state lock is held by another run.
    async fn run_locked(
        &self,
        step: &'static str,
        args: &[&str],
        workspace: &str,
    ) -> Result<Output, ProvisionError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let output = self
                .slow
                .run_with_env("terraform", args, &[("TF_WORKSPACE", workspace)])
                .await
                .map_err(|e| ProvisionError::ToolFailed {
                    step,
                    stderr: format!("{e:#}"),
                })?;
            if output.status.success() || output.status.code() == Some(2) {
                return Ok(output);
            }
            let error = classify(step, &output);
            if attempt >= LOCK_ATTEMPTS || !matches!(error, ProvisionError::StateLocked(_)) {
                return Err(error);
            }
            tokio::time::sleep(self.lock_backoff).await;
        }
    }

    async fn read_outputs(
        &self,
        request: &DeploymentRequest,
    ) -> Result<InfrastructureHandle, ProvisionError> {
        let chdir = self.chdir();
        let output = self
            .quick
            .run_with_env(
                "terraform",
                &[&chdir, "output", "-json"],
                &[("TF_WORKSPACE", request.prefix().as_str())],
            )
            .await
            .map_err(|e| runner_error("output", &e))?;
        if !output.status.success() {
            return Err(classify("output", &output));
        }
        handle_from_outputs(&String::from_utf8_lossy(&output.stdout), &request.region)
    }
}

impl<R: CommandRunner> InfraProvisioner for TerraformCli<R> {
    async fn ensure(
        &self,
        request: &DeploymentRequest,
    ) -> Result<InfrastructureHandle, ProvisionError> {
        self.version_gate().await?;
        self.prepare(request).await?;

        let chdir = self.chdir();
        let workspace = request.prefix();
        // Plan files from concurrent runs must not overwrite each other.
        let plan_file = format!("tfplan-{workspace}");
        let plan_out = format!("-out={plan_file}");
        let vars = Self::var_args(request);
        let mut plan_args: Vec<&str> = vec![
            &chdir,
            "plan",
            "-detailed-exitcode",
            "-input=false",
            "-no-color",
            "-lock=true",
            "-lock-timeout=60s",
            &plan_out,
        ];
        plan_args.extend(vars.iter().map(String::as_str));
        let plan = self.run_locked("plan", &plan_args, &workspace).await?;

        match plan.status.code() {
            // Exit 0: state already matches the request. Converged.
            Some(0) => self.read_outputs(request).await,
            // Exit 2: changes pending.
            Some(2) => {
                let plan_text = String::from_utf8_lossy(&plan.stdout);
                // A first-time create touches network resources by definition;
                // the gate applies only when prior state exists.
                if !request.allow_network_change
                    && self.read_outputs(request).await.is_ok()
                    && let Some(resources) = topology_changes(&plan_text)
                {
                    return Err(ProvisionError::TopologyChange { resources });
                }

                let apply_args: Vec<&str> = vec![
                    &chdir,
                    "apply",
                    "-input=false",
                    "-no-color",
                    "-lock=true",
                    "-lock-timeout=60s",
                    "-auto-approve",
                    &plan_file,
                ];
                let apply = self.run_locked("apply", &apply_args, &workspace).await?;
                if !apply.status.success() {
                    return Err(classify("apply", &apply));
                }
                self.read_outputs(request).await
            }
            _ => Err(classify("plan", &plan)),
        }
    }

    async fn describe(
        &self,
        request: &DeploymentRequest,
    ) -> Result<Option<InfrastructureHandle>, ProvisionError> {
        match self.read_outputs(request).await {
            Ok(handle) => Ok(Some(handle)),
            // Empty outputs mean no state for this workspace.
            Err(ProvisionError::BadOutputs(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn destroy(&self, request: &DeploymentRequest) -> Result<u32, DestroyError> {
        self.version_gate()
            .await
            .map_err(|e| DestroyError::ToolFailed(e.to_string()))?;
        self.prepare(request)
            .await
            .map_err(|e| DestroyError::ToolFailed(e.to_string()))?;

        let chdir = self.chdir();
        let workspace = request.prefix();
        let vars = Self::var_args(request);
        let mut args: Vec<&str> = vec![
            &chdir,
            "destroy",
            "-input=false",
            "-no-color",
            "-lock=true",
            "-lock-timeout=60s",
            "-auto-approve",
        ];
        args.extend(vars.iter().map(String::as_str));
        let output = self
            .run_locked("destroy", &args, &workspace)
            .await
            .map_err(|e| match e {
                ProvisionError::StateLocked(held) => DestroyError::StateLocked(held),
                other => DestroyError::ToolFailed(other.to_string()),
            })?;
        if !output.status.success() {
            return Err(DestroyError::ToolFailed(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }
        Ok(destroyed_count(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Map a runner-level error to a typed one: spawn failures mean the binary is
/// absent; anything else (timeout kill, wait failure) keeps its message.
fn runner_error(step: &'static str, e: &anyhow::Error) -> ProvisionError {
    let message = format!("{e:#}");
    if message.contains("failed to spawn") {
        ProvisionError::ToolMissing
    } else {
        ProvisionError::ToolFailed {
            step,
            stderr: message,
        }
    }
}

/// Map a failed terraform invocation to a typed error.
fn classify(step: &'static str, output: &Output) -> ProvisionError {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let lowered = stderr.to_lowercase();
    if lowered.contains("error acquiring the state lock")
        || lowered.contains("state lock")
        || lowered.contains("lock info")
    {
        return ProvisionError::StateLocked(stderr);
    }
    ProvisionError::ToolFailed { step, stderr }
}

/// Extract the semver from `terraform version -json` output.
fn parse_terraform_version(stdout: &str) -> Result<Version, ProvisionError> {
    let value: Value = serde_json::from_str(stdout)
        .map_err(|e| ProvisionError::BadOutputs(format!("version output: {e}")))?;
    let raw = value
        .get("terraform_version")
        .and_then(Value::as_str)
        .ok_or_else(|| ProvisionError::BadOutputs("version output missing field".to_string()))?;
    Version::parse(raw).map_err(|e| ProvisionError::BadOutputs(format!("version '{raw}': {e}")))
}

/// Scan plan text for modifications to network-topology resources.
///
/// Returns the affected resource addresses when the plan updates, replaces,
/// or destroys VPC-level resources. Pure additions are allowed: growing a
/// cluster is routine, rewiring its network is not.
fn topology_changes(plan_text: &str) -> Option<String> {
    #[allow(clippy::expect_used)] // pattern is a compile-time constant
    let re = Regex::new(
        r#"(?m)^\s*#\s+((?:module\.[\w.\[\]"-]+\.)?aws_(?:vpc|subnet|route_table|route|internet_gateway|nat_gateway|security_group)\.[\w\[\]".-]+)\s+(?:will be updated|must be replaced|will be destroyed)"#,
    )
    .expect("valid regex");
    let hits: Vec<&str> = re
        .captures_iter(plan_text)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    if hits.is_empty() {
        None
    } else {
        Some(hits.join(", "))
    }
}

/// Build a handle from `terraform output -json`.
fn handle_from_outputs(stdout: &str, region: &str) -> Result<InfrastructureHandle, ProvisionError> {
    let value: Value = serde_json::from_str(stdout)
        .map_err(|e| ProvisionError::BadOutputs(format!("output json: {e}")))?;
    let field = |key: &str| -> Result<String, ProvisionError> {
        value
            .get(key)
            .and_then(|v| v.get("value"))
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| ProvisionError::BadOutputs(format!("missing output '{key}'")))
    };
    Ok(InfrastructureHandle {
        cluster_name: field("cluster_name")?,
        registry_uri: field("registry_url")?,
        network_id: field("vpc_id")?,
        region: region.to_string(),
    })
}

/// Parse the resource count from "Destroy complete! Resources: N destroyed."
fn destroyed_count(stdout: &str) -> u32 {
    #[allow(clippy::expect_used)] // pattern is a compile-time constant
    let re = Regex::new(r"Destroy complete! Resources: (\d+) destroyed").expect("valid regex");
    re.captures(stdout)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}
