//! Command handlers — thin wiring between CLI args, adapters, and services.

pub mod deploy;
pub mod destroy;
pub mod provision;
pub mod version;

use anyhow::Result;

use crate::app::AppContext;
use crate::cli::TargetArgs;
use crate::domain::report::RunReport;
use crate::domain::request::DeploymentRequest;
use crate::output::reporter::{RunReporter, TerminalReporter};
use crate::output::{human, json};

/// Build and validate a request from target args plus build inputs.
///
/// On a validation error, prints it in the active output mode and returns
/// `None`; the caller exits with code 1.
fn validated_request(
    app: &AppContext,
    args: &TargetArgs,
    build_context: &str,
    tag: String,
) -> Result<Option<DeploymentRequest>> {
    let request = DeploymentRequest {
        app: args.app.clone(),
        environment: args.environment.clone(),
        region: args.region.clone(),
        replicas: args.replicas,
        build_context: build_context.into(),
        tag,
        allow_network_change: args.allow_network_change,
    };
    if let Err(e) = request.validate() {
        if app.is_json() {
            println!("{}", json::format_error(&e.to_string(), "INVALID_REQUEST")?);
        } else {
            app.output.error(&e.to_string());
        }
        return Ok(None);
    }
    Ok(Some(request))
}

/// Pick the progress reporter for the active output mode. JSON runs stay
/// silent so stdout carries exactly one document.
fn reporter(app: &AppContext) -> RunReporter<'_> {
    if app.is_json() {
        RunReporter::Silent
    } else {
        RunReporter::Terminal(TerminalReporter::new(&app.output))
    }
}

/// Emit the final run report in the active output mode.
fn emit_report(app: &AppContext, report: &RunReport) -> Result<()> {
    if app.is_json() {
        println!("{}", json::render_report(report)?);
    } else {
        human::render_report(&app.output, report);
    }
    Ok(())
}
