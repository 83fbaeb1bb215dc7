//! HTTP endpoint probe implementing the `EndpointProbe` port.
//!
//! ureq is blocking, so each probe runs on the blocking thread pool. A
//! non-200 status is a `Pending` observation, not an error: a load balancer
//! answering 503 while targets register is the normal path to ready.

use std::time::Duration;

use crate::application::ports::{EndpointProbe, Probe};
use crate::domain::error::ProbeError;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Endpoint probe backed by a short-timeout ureq agent.
pub struct UreqEndpointProbe {
    timeout: Duration,
}

impl UreqEndpointProbe {
    #[must_use]
    pub fn new() -> Self {
        Self {
            timeout: HTTP_TIMEOUT,
        }
    }
}

impl Default for UreqEndpointProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl EndpointProbe for UreqEndpointProbe {
    async fn http_ok(&self, url: &str) -> Result<Probe<u16>, ProbeError> {
        let url = url.to_string();
        let timeout = self.timeout;
        let result = tokio::task::spawn_blocking(move || {
            let agent = ureq::AgentBuilder::new().timeout(timeout).build();
            agent.get(&url).call()
        })
        .await
        .map_err(|e| ProbeError::Fatal(format!("probe task failed: {e}")))?;

        match result {
            Ok(response) if response.status() == 200 => Ok(Probe::Ready(response.status())),
            Ok(response) => Ok(Probe::Pending(format!(
                "endpoint returned HTTP {}",
                response.status()
            ))),
            Err(ureq::Error::Status(code, _)) => {
                Ok(Probe::Pending(format!("endpoint returned HTTP {code}")))
            }
            // DNS lag and connection refusal while the LB comes up.
            Err(ureq::Error::Transport(t)) => Err(ProbeError::Transient(t.to_string())),
        }
    }
}
