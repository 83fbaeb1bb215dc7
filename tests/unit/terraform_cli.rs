//! Terraform adapter: converge flow, topology gating, workspace isolation,
//! and destroy accounting.

use std::process::Output;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use eksdeploy::application::ports::{CommandRunner, InfraProvisioner};
use eksdeploy::domain::error::ProvisionError;
use eksdeploy::infra::terraform::TerraformCli;

use crate::mocks::{ScriptedRunner, err_output, exit_output, ok_output, request};

/// Runner whose every invocation fails with a fixed message.
#[derive(Clone, Copy)]
struct ErrRunner(&'static str);

impl CommandRunner for ErrRunner {
    async fn run(&self, _: &str, _: &[&str]) -> Result<Output> {
        Err(anyhow::anyhow!(self.0))
    }

    async fn run_with_timeout(&self, _: &str, _: &[&str], _: Duration) -> Result<Output> {
        Err(anyhow::anyhow!(self.0))
    }

    async fn run_with_stdin(&self, _: &str, _: &[&str], _: &[u8]) -> Result<Output> {
        Err(anyhow::anyhow!(self.0))
    }

    async fn run_with_env(&self, _: &str, _: &[&str], _: &[(&str, &str)]) -> Result<Output> {
        Err(anyhow::anyhow!(self.0))
    }
}

const VERSION_JSON: &[u8] = br#"{"terraform_version":"1.7.5"}"#;
const OUTPUTS_JSON: &[u8] = br#"{
    "cluster_name": {"value": "demo-dev-eks"},
    "registry_url": {"value": "123.dkr.ecr.us-east-2.amazonaws.com/demo-dev"},
    "vpc_id": {"value": "vpc-0abc"}
}"#;

fn cli(runner: Arc<ScriptedRunner>) -> TerraformCli<Arc<ScriptedRunner>> {
    TerraformCli::with_runners(Arc::clone(&runner), runner, "infra").lock_backoff(Duration::ZERO)
}

fn base_script() -> ScriptedRunner {
    ScriptedRunner::new()
        .on("version", ok_output(VERSION_JSON))
        .on("init", ok_output(b"Terraform has been successfully initialized!"))
        .on("workspace", ok_output(b"Switched to workspace \"demo-dev\"."))
}

#[tokio::test]
async fn converged_state_skips_apply() {
    let runner = Arc::new(
        base_script()
            .on("plan", exit_output(0, b"No changes. Your infrastructure matches."))
            .on("output", ok_output(OUTPUTS_JSON)),
    );
    let handle = cli(Arc::clone(&runner))
        .ensure(&request())
        .await
        .expect("ensure succeeds");

    assert_eq!(handle.cluster_name, "demo-dev-eks");
    assert_eq!(runner.calls_to("apply"), 0);
    assert_eq!(runner.calls_to("plan"), 1);
}

#[tokio::test]
async fn repeated_ensure_is_idempotent() {
    let runner = Arc::new(
        base_script()
            .on("plan", exit_output(0, b"No changes."))
            .on("output", ok_output(OUTPUTS_JSON)),
    );
    let cli = cli(Arc::clone(&runner));
    let first = cli.ensure(&request()).await.expect("first ensure");
    let second = cli.ensure(&request()).await.expect("second ensure");

    assert_eq!(first, second);
    assert_eq!(runner.calls_to("apply"), 0);
    assert_eq!(runner.calls_to("destroy"), 0);
}

#[tokio::test]
async fn pending_changes_run_apply() {
    let runner = Arc::new(
        base_script()
            .on(
                "plan",
                exit_output(2, b"  # aws_eks_node_group.default will be updated in-place"),
            )
            .on("apply", ok_output(b"Apply complete! Resources: 2 added."))
            .on("output", ok_output(OUTPUTS_JSON)),
    );
    let handle = cli(Arc::clone(&runner))
        .ensure(&request())
        .await
        .expect("ensure succeeds");

    assert_eq!(handle.network_id, "vpc-0abc");
    assert_eq!(runner.calls_to("apply"), 1);
}

#[tokio::test]
async fn topology_change_is_refused_without_flag() {
    let runner = Arc::new(
        base_script()
            .on(
                "plan",
                exit_output(2, b"  # aws_vpc.main will be destroyed\n  # aws_subnet.private[0] must be replaced"),
            )
            .on("output", ok_output(OUTPUTS_JSON)),
    );
    let err = cli(Arc::clone(&runner))
        .ensure(&request())
        .await
        .expect_err("topology gate fires");

    match err {
        ProvisionError::TopologyChange { resources } => {
            assert!(resources.contains("aws_vpc.main"));
        }
        other => panic!("expected TopologyChange, got {other}"),
    }
    assert_eq!(runner.calls_to("apply"), 0);
}

#[tokio::test]
async fn topology_change_applies_with_flag() {
    let runner = Arc::new(
        base_script()
            .on("plan", exit_output(2, b"  # aws_vpc.main will be destroyed"))
            .on("apply", ok_output(b"Apply complete!"))
            .on("output", ok_output(OUTPUTS_JSON)),
    );
    let mut req = request();
    req.allow_network_change = true;
    cli(Arc::clone(&runner))
        .ensure(&req)
        .await
        .expect("ensure proceeds when confirmed");

    assert_eq!(runner.calls_to("apply"), 1);
}

#[tokio::test]
async fn state_lock_retries_then_surfaces() {
    let runner = Arc::new(
        base_script()
            .on("plan", err_output(b"Error acquiring the state lock: ConditionalCheckFailed")),
    );
    let err = cli(Arc::clone(&runner))
        .ensure(&request())
        .await
        .expect_err("lock error surfaces");

    assert!(matches!(err, ProvisionError::StateLocked(_)));
    assert_eq!(runner.calls_to("plan"), 3);
}

#[tokio::test]
async fn outdated_terraform_is_rejected() {
    let runner = Arc::new(
        ScriptedRunner::new().on("version", ok_output(br#"{"terraform_version":"1.2.9"}"#)),
    );
    let err = cli(runner)
        .ensure(&request())
        .await
        .expect_err("version gate fires");

    match err {
        ProvisionError::ToolTooOld { found, min } => {
            assert_eq!(found, "1.2.9");
            assert_eq!(min, "1.4.0");
        }
        other => panic!("expected ToolTooOld, got {other}"),
    }
}

#[tokio::test]
async fn describe_reports_absent_state_as_none() {
    let runner = Arc::new(ScriptedRunner::new().on("output", ok_output(b"{}")));
    let described = cli(runner)
        .describe(&request())
        .await
        .expect("describe succeeds");
    assert_eq!(described, None);
}

#[tokio::test]
async fn workspace_travels_with_each_invocation() {
    let runner = Arc::new(
        base_script()
            .on("plan", exit_output(2, b"  # aws_eks_node_group.default will be updated in-place"))
            .on("apply", ok_output(b"Apply complete!"))
            .on("output", ok_output(OUTPUTS_JSON)),
    );
    cli(Arc::clone(&runner))
        .ensure(&request())
        .await
        .expect("ensure succeeds");

    let calls = runner.calls.lock().expect("lock");
    for call in calls.iter() {
        // Selection must never be persisted into the shared checkout.
        assert!(
            !call.iter().any(|a| a == "select"),
            "workspace select leaks per-checkout state: {call:?}"
        );
        if call.iter().any(|a| a == "plan" || a == "apply" || a == "output") {
            assert!(
                call.iter().any(|a| a == "TF_WORKSPACE=demo-dev"),
                "workspace not passed per-invocation: {call:?}"
            );
        }
    }
    // The plan file is per prefix so parallel runs cannot clobber it.
    let plan_call = calls
        .iter()
        .find(|c| c.iter().any(|a| a == "plan"))
        .expect("plan invoked");
    assert!(plan_call.iter().any(|a| a == "-out=tfplan-demo-dev"));
    let apply_call = calls
        .iter()
        .find(|c| c.iter().any(|a| a == "apply"))
        .expect("apply invoked");
    assert!(apply_call.iter().any(|a| a == "tfplan-demo-dev"));
}

#[tokio::test]
async fn existing_workspace_is_tolerated() {
    let runner = Arc::new(
        ScriptedRunner::new()
            .on("version", ok_output(VERSION_JSON))
            .on("init", ok_output(b"Initialized."))
            .on("workspace", err_output(b"Workspace \"demo-dev\" already exists"))
            .on("plan", exit_output(0, b"No changes."))
            .on("output", ok_output(OUTPUTS_JSON)),
    );
    cli(runner)
        .ensure(&request())
        .await
        .expect("existing workspace is not an error");
}

#[tokio::test]
async fn timeout_errors_are_not_reported_as_missing_binary() {
    let runner = ErrRunner("terraform timed out after 60s");
    let err = TerraformCli::with_runners(runner, runner, "infra")
        .lock_backoff(Duration::ZERO)
        .ensure(&request())
        .await
        .expect_err("runner failure surfaces");

    match err {
        ProvisionError::ToolFailed { stderr, .. } => assert!(stderr.contains("timed out")),
        other => panic!("expected ToolFailed, got {other}"),
    }
}

#[tokio::test]
async fn spawn_failure_reports_missing_binary() {
    let runner = ErrRunner("failed to spawn terraform");
    let err = TerraformCli::with_runners(runner, runner, "infra")
        .lock_backoff(Duration::ZERO)
        .ensure(&request())
        .await
        .expect_err("runner failure surfaces");

    assert!(matches!(err, ProvisionError::ToolMissing));
}

#[tokio::test]
async fn destroy_counts_destroyed_resources() {
    let runner = Arc::new(
        base_script().on(
            "destroy",
            ok_output(b"Destroy complete! Resources: 31 destroyed."),
        ),
    );
    let count = cli(runner)
        .destroy(&request())
        .await
        .expect("destroy succeeds");
    assert_eq!(count, 31);
}

#[tokio::test]
async fn double_destroy_reports_zero() {
    let runner = Arc::new(
        base_script().on(
            "destroy",
            ok_output(b"Destroy complete! Resources: 0 destroyed."),
        ),
    );
    let cli = cli(runner);
    let first = cli.destroy(&request()).await.expect("first destroy");
    let second = cli.destroy(&request()).await.expect("second destroy");
    assert_eq!(first, 0);
    assert_eq!(second, 0);
}
