//! Infrastructure handle and scoped credential guard.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Cached view of provisioned infrastructure.
///
/// Produced from the provisioning tool's named outputs. The tool's external
/// state store remains the source of truth — this value is re-derived via
/// `describe` before any phase that depends on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfrastructureHandle {
    /// EKS cluster name.
    pub cluster_name: String,
    /// ECR repository URI the image is pushed to.
    pub registry_uri: String,
    /// VPC id the cluster runs in.
    pub network_id: String,
    /// AWS region.
    pub region: String,
}

/// Scoped kubeconfig file — the authentication context for one run.
///
/// The file is explicitly acquired by `authenticate` and removed when the
/// guard drops, so a run never leaves credentials dangling in the user's
/// default kubeconfig.
#[derive(Debug)]
pub struct KubeconfigGuard {
    path: PathBuf,
    remove_on_drop: bool,
}

impl KubeconfigGuard {
    /// Guard a freshly written kubeconfig; the file is deleted on drop.
    #[must_use]
    pub fn scoped(path: PathBuf) -> Self {
        Self {
            path,
            remove_on_drop: true,
        }
    }

    /// Wrap an existing path without taking ownership of the file.
    #[must_use]
    pub fn unmanaged(path: PathBuf) -> Self {
        Self {
            path,
            remove_on_drop: false,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for KubeconfigGuard {
    fn drop(&mut self) {
        if self.remove_on_drop {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
