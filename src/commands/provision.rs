//! `eksdeploy provision` — infrastructure only, no build or rollout.

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::CancelFlag;
use crate::application::services::provision::provision;
use crate::cli::TargetArgs;
use crate::commands::{emit_report, reporter, validated_request};
use crate::infra::kubectl::KubectlCli;
use crate::infra::terraform::TerraformCli;

pub async fn run(app: &AppContext, args: &TargetArgs) -> Result<i32> {
    // The tag is unused for provisioning; validation still applies.
    let Some(request) = validated_request(app, args, ".", "latest".to_string())? else {
        return Ok(1);
    };

    let infra = TerraformCli::new(&args.infra_dir);
    let cluster = KubectlCli::new()?;
    let progress = reporter(app);
    let cancel = CancelFlag::on_ctrl_c();

    let report = provision(&infra, &cluster, &progress, &request, &cancel).await;
    emit_report(app, &report)?;
    Ok(report.status.exit_code())
}
