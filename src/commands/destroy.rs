//! `eksdeploy destroy` — drain the workload and tear everything down.

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::CancelFlag;
use crate::application::services::teardown::teardown;
use crate::cli::TargetArgs;
use crate::commands::{emit_report, reporter, validated_request};
use crate::infra::kubectl::KubectlCli;
use crate::infra::terraform::TerraformCli;

pub async fn run(app: &AppContext, args: &TargetArgs) -> Result<i32> {
    let Some(request) = validated_request(app, args, ".", "latest".to_string())? else {
        return Ok(1);
    };

    let confirmed = app.non_interactive
        || app.confirm(
            &format!(
                "Destroy all infrastructure for '{}'? This cannot be undone",
                request.prefix()
            ),
            false,
        )?;
    if !confirmed {
        app.output.info("Cancelled.");
        return Ok(0);
    }

    let infra = TerraformCli::new(&args.infra_dir);
    let cluster = KubectlCli::new()?;
    let progress = reporter(app);
    let cancel = CancelFlag::on_ctrl_c();

    let report = teardown(&infra, &cluster, &progress, &request, &cancel).await;
    emit_report(app, &report)?;
    Ok(report.status.exit_code())
}
