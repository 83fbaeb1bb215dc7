//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`, or
//! `crate::application`. All error types implement `thiserror::Error` and
//! carry a transient/permanent classification: transient kinds may be retried
//! locally with bounded attempts, permanent kinds propagate immediately.

use thiserror::Error;

/// Whether an error is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transience {
    /// Likely to succeed on retry (network blip, lock contention).
    Transient,
    /// Retrying without operator intervention will not help.
    Permanent,
}

// ── Request validation ────────────────────────────────────────────────────────

/// Errors produced while validating a `DeploymentRequest`.
#[derive(Debug, Clone, Error)]
pub enum RequestError {
    #[error("invalid name '{0}': must be a lowercase DNS label (a-z, 0-9, '-')")]
    InvalidName(String),

    #[error("resource prefix '{0}' exceeds 63 characters")]
    PrefixTooLong(String),

    #[error("replica count must be at least 1")]
    NoReplicas,

    #[error("AWS region must not be empty")]
    EmptyRegion,
}

// ── Provisioning ──────────────────────────────────────────────────────────────

/// Errors from the infrastructure provisioning adapter.
#[derive(Debug, Clone, Error)]
pub enum ProvisionError {
    #[error("terraform is not installed or not on PATH")]
    ToolMissing,

    #[error("terraform {found} is too old (need >= {min})")]
    ToolTooOld { found: String, min: String },

    #[error("could not acquire the state lock: {0}")]
    StateLocked(String),

    #[error(
        "plan modifies network topology ({resources}); re-run with --allow-network-change to confirm"
    )]
    TopologyChange { resources: String },

    #[error("terraform {step} failed: {stderr}")]
    ToolFailed { step: &'static str, stderr: String },

    #[error("infrastructure outputs missing or malformed: {0}")]
    BadOutputs(String),
}

impl ProvisionError {
    #[must_use]
    pub fn transience(&self) -> Transience {
        match self {
            Self::StateLocked(_) => Transience::Transient,
            _ => Transience::Permanent,
        }
    }
}

// ── Authentication ────────────────────────────────────────────────────────────

/// Errors while configuring cluster credentials.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("aws eks update-kubeconfig failed: {0}")]
    UpdateFailed(String),

    #[error("cannot prepare kubeconfig directory: {0}")]
    Io(String),
}

// ── Build & publish ───────────────────────────────────────────────────────────

/// Errors from the container build/publish adapter.
#[derive(Debug, Clone, Error)]
pub enum BuildError {
    #[error("{0} is not installed or not on PATH")]
    ToolMissing(String),

    #[error("registry login failed: {0}")]
    LoginFailed(String),

    #[error("image build failed:\n{0}")]
    BuildFailed(String),

    #[error("image push rejected: {0}")]
    PushFailed(String),

    #[error("image push failed after {attempts} attempts: {last}")]
    PushExhausted { attempts: u32, last: String },
}

impl BuildError {
    #[must_use]
    pub fn transience(&self) -> Transience {
        match self {
            Self::PushExhausted { .. } => Transience::Transient,
            _ => Transience::Permanent,
        }
    }
}

// ── Workload apply ────────────────────────────────────────────────────────────

/// Errors while submitting the workload definition.
#[derive(Debug, Clone, Error)]
pub enum ApplyError {
    #[error("could not render workload manifests: {0}")]
    Render(String),

    #[error("workload spec rejected by the cluster: {0}")]
    Rejected(String),

    #[error("kubectl apply failed: {0}")]
    ToolFailed(String),
}

impl ApplyError {
    #[must_use]
    pub fn transience(&self) -> Transience {
        match self {
            Self::ToolFailed(_) => Transience::Transient,
            _ => Transience::Permanent,
        }
    }
}

// ── Destroy ───────────────────────────────────────────────────────────────────

/// Errors while tearing down infrastructure.
#[derive(Debug, Clone, Error)]
pub enum DestroyError {
    #[error("could not acquire the state lock: {0}")]
    StateLocked(String),

    #[error("terraform destroy failed: {0}")]
    ToolFailed(String),
}

impl DestroyError {
    #[must_use]
    pub fn transience(&self) -> Transience {
        match self {
            Self::StateLocked(_) => Transience::Transient,
            Self::ToolFailed(_) => Transience::Permanent,
        }
    }
}

// ── Readiness probes ──────────────────────────────────────────────────────────

/// Error raised by a readiness probe invocation.
///
/// The poller treats `Transient` as "not yet satisfied" and keeps waiting;
/// `Fatal` short-circuits the poll immediately instead of burning the timeout.
#[derive(Debug, Clone, Error)]
pub enum ProbeError {
    #[error("{0}")]
    Transient(String),

    #[error("{0}")]
    Fatal(String),
}
