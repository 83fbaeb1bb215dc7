//! Kubectl/EKS adapter implementing the `ClusterClient` port.
//!
//! Credentials are written to a run-scoped kubeconfig under the tool's own
//! directory, never merged into `~/.kube/config`; the returned guard deletes
//! the file when the run ends. Manifests are rendered in-process and piped to
//! `kubectl apply -f -`, so nothing is written to the build context.

use std::path::PathBuf;

use serde_json::{Value, json};

use crate::application::ports::{ApplyOutcome, ClusterClient, CommandRunner, Probe};
use crate::domain::error::{ApplyError, AuthError, ProbeError};
use crate::domain::handle::{InfrastructureHandle, KubeconfigGuard};
use crate::domain::request::{DeploymentRequest, SERVICE_PORT, WorkloadSpec};
use crate::infra::command_runner::{DEFAULT_CMD_TIMEOUT, TokioCommandRunner};

/// Kubectl adapter that routes all CLI calls through a `CommandRunner`.
///
/// Generic over `R: CommandRunner` so that tests can inject a scripted runner
/// without spawning real processes.
pub struct KubectlCli<R: CommandRunner> {
    runner: R,
    kubeconfig_dir: PathBuf,
}

impl KubectlCli<TokioCommandRunner> {
    /// Production constructor; kubeconfigs land under `~/.eksdeploy/`.
    ///
    /// # Errors
    ///
    /// Fails when the home directory cannot be resolved.
    pub fn new() -> anyhow::Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot locate home directory"))?;
        Ok(Self {
            runner: TokioCommandRunner::new(DEFAULT_CMD_TIMEOUT),
            kubeconfig_dir: home.join(".eksdeploy"),
        })
    }
}

impl<R: CommandRunner> KubectlCli<R> {
    pub fn with_runner(runner: R, kubeconfig_dir: PathBuf) -> Self {
        Self {
            runner,
            kubeconfig_dir,
        }
    }

    fn kubeconfig_args<'a>(auth: &'a KubeconfigGuard) -> [&'a str; 2] {
        let path = auth.path().to_str().unwrap_or_default();
        ["--kubeconfig", path]
    }
}

impl<R: CommandRunner> ClusterClient for KubectlCli<R> {
    async fn authenticate(
        &self,
        handle: &InfrastructureHandle,
    ) -> Result<KubeconfigGuard, AuthError> {
        std::fs::create_dir_all(&self.kubeconfig_dir).map_err(|e| AuthError::Io(e.to_string()))?;
        let path = self
            .kubeconfig_dir
            .join(format!("kubeconfig-{}", handle.cluster_name));
        let path_arg = path.to_string_lossy().to_string();

        let output = self
            .runner
            .run(
                "aws",
                &[
                    "eks",
                    "update-kubeconfig",
                    "--region",
                    &handle.region,
                    "--name",
                    &handle.cluster_name,
                    "--kubeconfig",
                    &path_arg,
                ],
            )
            .await
            .map_err(|e| AuthError::UpdateFailed(e.to_string()))?;
        if !output.status.success() {
            return Err(AuthError::UpdateFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(KubeconfigGuard::scoped(path))
    }

    async fn apply(
        &self,
        auth: &KubeconfigGuard,
        request: &DeploymentRequest,
        spec: &WorkloadSpec,
    ) -> Result<ApplyOutcome, ApplyError> {
        let manifests = render_manifests(request, spec)?;
        let [kc_flag, kc_path] = Self::kubeconfig_args(auth);
        let output = self
            .runner
            .run_with_stdin(
                "kubectl",
                &[kc_flag, kc_path, "apply", "-f", "-"],
                manifests.as_bytes(),
            )
            .await
            .map_err(|e| ApplyError::ToolFailed(e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if stderr.to_lowercase().contains("error validating") {
                return Err(ApplyError::Rejected(stderr));
            }
            return Err(ApplyError::ToolFailed(stderr));
        }
        Ok(apply_outcome(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn rollout_status(
        &self,
        auth: &KubeconfigGuard,
        request: &DeploymentRequest,
    ) -> Result<Probe<()>, ProbeError> {
        let [kc_flag, kc_path] = Self::kubeconfig_args(auth);
        let name = format!("deployment/{}", request.prefix());
        let output = self
            .runner
            .run(
                "kubectl",
                &[
                    kc_flag,
                    kc_path,
                    "rollout",
                    "status",
                    &name,
                    "--timeout=5s",
                ],
            )
            .await
            .map_err(|e| ProbeError::Transient(e.to_string()))?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        if output.status.success() && stdout.contains("successfully rolled out") {
            return Ok(Probe::Ready(()));
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if output.status.success() {
            return Ok(Probe::Pending(stdout.trim().to_string()));
        }
        Err(classify_probe_stderr(&stderr))
    }

    async fn service_hostname(
        &self,
        auth: &KubeconfigGuard,
        request: &DeploymentRequest,
    ) -> Result<Probe<String>, ProbeError> {
        let [kc_flag, kc_path] = Self::kubeconfig_args(auth);
        let name = format!("service/{}", request.prefix());
        let output = self
            .runner
            .run("kubectl", &[kc_flag, kc_path, "get", &name, "-o", "json"])
            .await
            .map_err(|e| ProbeError::Transient(e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(classify_probe_stderr(&stderr));
        }
        let value: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| ProbeError::Transient(format!("service json: {e}")))?;
        match value
            .pointer("/status/loadBalancer/ingress/0/hostname")
            .and_then(Value::as_str)
        {
            Some(hostname) => Ok(Probe::Ready(hostname.to_string())),
            None => Ok(Probe::Pending(
                "load balancer hostname not yet assigned".to_string(),
            )),
        }
    }

    async fn drain(
        &self,
        auth: &KubeconfigGuard,
        request: &DeploymentRequest,
    ) -> Result<(), ApplyError> {
        let [kc_flag, kc_path] = Self::kubeconfig_args(auth);
        let prefix = request.prefix();
        let deployment = format!("deployment/{prefix}");
        let service = format!("service/{prefix}");
        let output = self
            .runner
            .run(
                "kubectl",
                &[
                    kc_flag,
                    kc_path,
                    "delete",
                    &deployment,
                    &service,
                    "--ignore-not-found=true",
                    "--wait=true",
                ],
            )
            .await
            .map_err(|e| ApplyError::ToolFailed(e.to_string()))?;
        if !output.status.success() {
            return Err(ApplyError::ToolFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(())
    }
}

/// Render the Deployment and Service manifests as one multi-document YAML
/// stream.
fn render_manifests(request: &DeploymentRequest, spec: &WorkloadSpec) -> Result<String, ApplyError> {
    let name = request.prefix();
    let labels = json!({ "app": name });
    let deployment = json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": { "name": name, "labels": labels },
        "spec": {
            "replicas": spec.replicas,
            "selector": { "matchLabels": labels },
            "template": {
                "metadata": { "labels": labels },
                "spec": {
                    "containers": [{
                        "name": request.app,
                        "image": spec.image.to_string(),
                        "ports": [{ "containerPort": spec.container_port }],
                        "resources": {
                            "requests": {
                                "cpu": spec.cpu_request,
                                "memory": spec.memory_request,
                            },
                            "limits": {
                                "cpu": spec.cpu_limit,
                                "memory": spec.memory_limit,
                            },
                        },
                        "readinessProbe": {
                            "httpGet": {
                                "path": spec.readiness_path,
                                "port": spec.container_port,
                            },
                            "initialDelaySeconds": 5,
                            "periodSeconds": 10,
                        },
                    }],
                },
            },
        },
    });
    let service = json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": { "name": name, "labels": labels },
        "spec": {
            "type": "LoadBalancer",
            "selector": labels,
            "ports": [{
                "port": SERVICE_PORT,
                "targetPort": spec.container_port,
                "protocol": "TCP",
            }],
        },
    });

    let docs = [deployment, service]
        .iter()
        .map(|doc| serde_yaml::to_string(doc).map_err(|e| ApplyError::Render(e.to_string())))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(docs.join("---\n"))
}

/// Unchanged only when every applied object reported `unchanged`. Output
/// with no object lines at all is treated as a rollout, never as a no-op.
fn apply_outcome(stdout: &str) -> ApplyOutcome {
    let mut lines = stdout.lines().filter(|l| !l.trim().is_empty()).peekable();
    if lines.peek().is_none() {
        return ApplyOutcome::Configured;
    }
    if lines.all(|l| l.trim_end().ends_with("unchanged")) {
        ApplyOutcome::Unchanged
    } else {
        ApplyOutcome::Configured
    }
}

/// Split probe stderr into fatal (credentials, bad spec) and transient
/// (everything else, including a control plane that is not answering yet).
fn classify_probe_stderr(stderr: &str) -> ProbeError {
    let lowered = stderr.to_lowercase();
    if lowered.contains("unauthorized")
        || lowered.contains("forbidden")
        || lowered.contains("error validating")
        || lowered.contains("the server doesn't have a resource type")
    {
        ProbeError::Fatal(stderr.to_string())
    } else {
        ProbeError::Transient(stderr.to_string())
    }
}
