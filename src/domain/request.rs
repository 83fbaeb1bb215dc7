//! Deployment request and workload spec types, plus pure validation.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::domain::error::RequestError;

/// Container port the web app listens on.
pub const CONTAINER_PORT: u16 = 8080;

/// Service port exposed by the load balancer.
pub const SERVICE_PORT: u16 = 80;

/// Immutable input to one orchestrator run.
#[derive(Debug, Clone)]
pub struct DeploymentRequest {
    /// Application name (lowercase DNS label).
    pub app: String,
    /// Target environment name (lowercase DNS label).
    pub environment: String,
    /// AWS region to deploy into.
    pub region: String,
    /// Desired replica count.
    pub replicas: u32,
    /// Container build context path.
    pub build_context: PathBuf,
    /// Image tag to build and publish.
    pub tag: String,
    /// Operator confirmation for plans that change network topology.
    pub allow_network_change: bool,
}

impl DeploymentRequest {
    /// Resource-name prefix shared by all resources of this run.
    ///
    /// Concurrent runs with distinct prefixes never collide on the same
    /// infrastructure handle; the Terraform workspace and all Kubernetes
    /// object names derive from it.
    #[must_use]
    pub fn prefix(&self) -> String {
        format!("{}-{}", self.app, self.environment)
    }

    /// Validate names, replica bounds, and region.
    ///
    /// # Errors
    ///
    /// Returns a `RequestError` describing the first violated constraint.
    pub fn validate(&self) -> Result<(), RequestError> {
        validate_label(&self.app)?;
        validate_label(&self.environment)?;
        let prefix = self.prefix();
        if prefix.len() > 63 {
            return Err(RequestError::PrefixTooLong(prefix));
        }
        if self.replicas == 0 {
            return Err(RequestError::NoReplicas);
        }
        if self.region.trim().is_empty() {
            return Err(RequestError::EmptyRegion);
        }
        Ok(())
    }
}

/// A name must be a lowercase DNS label: a-z, 0-9, '-', no leading/trailing '-'.
fn validate_label(name: &str) -> Result<(), RequestError> {
    let valid = !name.is_empty()
        && !name.starts_with('-')
        && !name.ends_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(RequestError::InvalidName(name.to_string()))
    }
}

/// A container image that was confirmed pushed to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageReference {
    /// Full repository URI, e.g. `123456789.dkr.ecr.us-east-2.amazonaws.com/demo-dev`.
    pub repository: String,
    /// Image tag.
    pub tag: String,
    /// Push digest (`sha256:...`), when the registry reported one.
    pub digest: Option<String>,
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

/// Workload definition submitted to the cluster.
///
/// Built from a `DeploymentRequest` plus the `ImageReference` resolved after
/// a successful build-and-publish — never before.
#[derive(Debug, Clone)]
pub struct WorkloadSpec {
    pub image: ImageReference,
    pub replicas: u32,
    pub cpu_request: String,
    pub memory_request: String,
    pub cpu_limit: String,
    pub memory_limit: String,
    /// HTTP path probed to decide pod readiness.
    pub readiness_path: String,
    pub container_port: u16,
}

impl WorkloadSpec {
    /// Build a spec from the request and a confirmed-pushed image.
    #[must_use]
    pub fn from_request(request: &DeploymentRequest, image: ImageReference) -> Self {
        Self {
            image,
            replicas: request.replicas,
            cpu_request: "250m".to_string(),
            memory_request: "256Mi".to_string(),
            cpu_limit: "500m".to_string(),
            memory_limit: "512Mi".to_string(),
            readiness_path: "/".to_string(),
            container_port: CONTAINER_PORT,
        }
    }
}
