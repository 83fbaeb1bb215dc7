//! `eksdeploy deploy` — the end-to-end forward run.

use anyhow::Result;
use chrono::Utc;

use crate::app::AppContext;
use crate::application::services::deploy::{DeployConfig, deploy};
use crate::application::services::CancelFlag;
use crate::cli::DeployArgs;
use crate::commands::{emit_report, reporter, validated_request};
use crate::infra::docker::DockerCli;
use crate::infra::http::UreqEndpointProbe;
use crate::infra::kubectl::KubectlCli;
use crate::infra::terraform::TerraformCli;

pub async fn run(app: &AppContext, args: &DeployArgs) -> Result<i32> {
    let tag = args
        .tag
        .clone()
        .unwrap_or_else(|| Utc::now().format("%Y%m%d%H%M%S").to_string());
    let Some(request) = validated_request(app, &args.target, &args.context, tag)? else {
        return Ok(1);
    };

    let infra = TerraformCli::new(&args.target.infra_dir);
    let publisher = DockerCli::new();
    let cluster = KubectlCli::new()?;
    let endpoint = UreqEndpointProbe::new();
    let progress = reporter(app);
    let cancel = CancelFlag::on_ctrl_c();

    let report = deploy(
        &infra,
        &publisher,
        &cluster,
        &endpoint,
        &progress,
        &request,
        &DeployConfig::default(),
        &cancel,
    )
    .await;
    emit_report(app, &report)?;
    Ok(report.status.exit_code())
}
