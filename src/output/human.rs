//! Human-readable rendering of the run report.

use owo_colors::OwoColorize as _;

use crate::domain::report::{RunReport, RunStatus};
use crate::output::OutputContext;

/// Render the final run report to stdout.
pub fn render_report(ctx: &OutputContext, report: &RunReport) {
    if ctx.quiet {
        // Quiet mode still reports a failure reason on stderr.
        if let Some(error) = &report.error {
            ctx.error(error);
        }
        return;
    }

    println!();
    ctx.header(&format!(
        "{} / {} — {}",
        report.app, report.environment, report.status
    ));

    for phase in &report.phases {
        let marker = if phase.ok {
            "✓".style(ctx.styles.success).to_string()
        } else {
            "✗".style(ctx.styles.error).to_string()
        };
        let attempts = if phase.attempts > 1 {
            format!(", {} attempts", phase.attempts)
        } else {
            String::new()
        };
        println!(
            "  {marker} {:<15} {} ({}ms{attempts})",
            phase.phase.to_string(),
            phase.detail,
            phase.duration_ms,
        );
    }

    match report.status {
        RunStatus::Succeeded => ctx.success("deployment succeeded"),
        RunStatus::Destroyed => ctx.success("teardown complete"),
        RunStatus::Degraded => ctx.warn("deployment is DEGRADED"),
        RunStatus::Failed => {
            if let Some(error) = &report.error {
                ctx.error(error);
            }
        }
    }

    if let Some(endpoint) = &report.endpoint {
        ctx.kv("endpoint", endpoint);
    }
    ctx.kv("next", &report.next_action());
}
