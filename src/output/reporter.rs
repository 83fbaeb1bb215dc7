//! `TerminalReporter` — Presentation-layer implementation of `ProgressReporter`.
//!
//! Wraps `&OutputContext` and implements the `application::ports::ProgressReporter`
//! trait so application services can emit progress events without depending on
//! any presentation type directly.

use std::sync::Mutex;

use indicatif::ProgressBar;
use owo_colors::OwoColorize as _;

use crate::application::ports::ProgressReporter;
use crate::output::{OutputContext, progress};

/// Terminal progress reporter that wraps an `OutputContext`.
///
/// On a TTY each `step()` starts a spinner that the next event resolves; off
/// a TTY steps print as plain `"  → {message}"` lines.
pub struct TerminalReporter<'a> {
    ctx: &'a OutputContext,
    active: Mutex<Option<ProgressBar>>,
}

impl<'a> TerminalReporter<'a> {
    /// Create a new `TerminalReporter` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self {
            ctx,
            active: Mutex::new(None),
        }
    }

    fn take_active(&self) -> Option<ProgressBar> {
        self.active.lock().ok().and_then(|mut slot| slot.take())
    }
}

impl ProgressReporter for TerminalReporter<'_> {
    fn step(&self, message: &str) {
        if self.ctx.quiet {
            return;
        }
        if let Some(pb) = self.take_active() {
            pb.finish_and_clear();
        }
        if self.ctx.show_progress() {
            if let Ok(mut slot) = self.active.lock() {
                *slot = Some(progress::spinner(message));
            }
        } else {
            println!("  {} {message}", "→".cyan());
        }
    }

    fn success(&self, message: &str) {
        if self.ctx.quiet {
            return;
        }
        if let Some(pb) = self.take_active() {
            progress::finish_ok(&pb, message);
        } else {
            println!("  {} {message}", "✓".green());
        }
    }

    fn warn(&self, message: &str) {
        if self.ctx.quiet {
            return;
        }
        if let Some(pb) = self.take_active() {
            progress::finish_warn(&pb, message);
        } else {
            println!("  {} {message}", "!".yellow());
        }
    }
}

/// Reporter selection for a run: terminal output for humans, silence for
/// `--json` runs where stdout must carry exactly one JSON document.
pub enum RunReporter<'a> {
    Terminal(TerminalReporter<'a>),
    Silent,
}

impl ProgressReporter for RunReporter<'_> {
    fn step(&self, message: &str) {
        if let Self::Terminal(inner) = self {
            inner.step(message);
        }
    }

    fn success(&self, message: &str) {
        if let Self::Terminal(inner) = self {
            inner.success(message);
        }
    }

    fn warn(&self, message: &str) {
        if let Self::Terminal(inner) = self {
            inner.warn(message);
        }
    }
}
