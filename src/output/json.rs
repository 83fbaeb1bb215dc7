//! JSON output helpers.
//!
//! `--json` runs emit exactly one document on stdout: either the run report
//! or the error object below.

use anyhow::{Context, Result};

use crate::domain::report::RunReport;

/// Serialize the run report as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if JSON serialization fails (should not happen in
/// practice — the report contains only strings, numbers, and enums).
pub fn render_report(report: &RunReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("JSON serialization failed")
}

/// Format a JSON error object for failures that occur before a run report
/// exists (argument validation, refused confirmation).
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails (should not happen in
/// practice — `serde_json` only fails on non-finite floats and maps with
/// non-string keys, neither of which appear here).
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}
