//! Docker/ECR adapter implementing the `ImagePublisher` port.
//!
//! Login flow: `aws ecr get-login-password` is piped straight into
//! `docker login --password-stdin` so the token never lands in an argv or a
//! shell history. Build failures surface immediately; pushes retry a small
//! fixed number of times because registry-side throttling and connection
//! resets are routine on fresh repositories.

use std::path::Path;
use std::time::Duration;

use crate::application::ports::{CommandRunner, ImagePublisher};
use crate::domain::error::BuildError;
use crate::domain::handle::InfrastructureHandle;
use crate::domain::request::ImageReference;
use crate::infra::command_runner::{DEFAULT_SLOW_TIMEOUT, TokioCommandRunner};

const PUSH_ATTEMPTS: u32 = 3;
const PUSH_BACKOFF: Duration = Duration::from_secs(5);

/// Docker adapter that routes all CLI calls through a `CommandRunner`.
///
/// Generic over `R: CommandRunner` so that tests can inject a scripted runner
/// without spawning real processes.
pub struct DockerCli<R: CommandRunner> {
    runner: R,
    push_backoff: Duration,
}

impl DockerCli<TokioCommandRunner> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            runner: TokioCommandRunner::new(DEFAULT_SLOW_TIMEOUT),
            push_backoff: PUSH_BACKOFF,
        }
    }
}

impl Default for DockerCli<TokioCommandRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> DockerCli<R> {
    pub fn with_runner(runner: R) -> Self {
        Self {
            runner,
            push_backoff: PUSH_BACKOFF,
        }
    }

    /// Override the push-retry backoff. Tests use `Duration::ZERO`.
    #[must_use]
    pub fn push_backoff(mut self, backoff: Duration) -> Self {
        self.push_backoff = backoff;
        self
    }

    async fn login(&self, handle: &InfrastructureHandle) -> Result<(), BuildError> {
        let token = self
            .runner
            .run(
                "aws",
                &["ecr", "get-login-password", "--region", &handle.region],
            )
            .await
            .map_err(|_| BuildError::ToolMissing("aws".to_string()))?;
        if !token.status.success() {
            return Err(BuildError::LoginFailed(
                String::from_utf8_lossy(&token.stderr).trim().to_string(),
            ));
        }

        let registry_host = handle
            .registry_uri
            .split('/')
            .next()
            .unwrap_or(&handle.registry_uri);
        let login = self
            .runner
            .run_with_stdin(
                "docker",
                &[
                    "login",
                    "--username",
                    "AWS",
                    "--password-stdin",
                    registry_host,
                ],
                &token.stdout,
            )
            .await
            .map_err(|_| BuildError::ToolMissing("docker".to_string()))?;
        if !login.status.success() {
            return Err(BuildError::LoginFailed(
                String::from_utf8_lossy(&login.stderr).trim().to_string(),
            ));
        }
        Ok(())
    }

    async fn push(&self, image: &str) -> Result<Option<String>, BuildError> {
        let mut last = String::new();
        for attempt in 1..=PUSH_ATTEMPTS {
            let output = self
                .runner
                .run("docker", &["push", image])
                .await
                .map_err(|_| BuildError::ToolMissing("docker".to_string()))?;
            if output.status.success() {
                return Ok(parse_digest(&String::from_utf8_lossy(&output.stdout)));
            }
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if !is_transient_push_error(&stderr) {
                return Err(BuildError::PushFailed(stderr));
            }
            last = stderr;
            if attempt < PUSH_ATTEMPTS {
                tokio::time::sleep(self.push_backoff * attempt).await;
            }
        }
        Err(BuildError::PushExhausted {
            attempts: PUSH_ATTEMPTS,
            last,
        })
    }
}

impl<R: CommandRunner> ImagePublisher for DockerCli<R> {
    async fn build_and_publish(
        &self,
        context: &Path,
        handle: &InfrastructureHandle,
        tag: &str,
    ) -> Result<ImageReference, BuildError> {
        self.login(handle).await?;

        let image = format!("{}:{tag}", handle.registry_uri);
        let context_arg = context.to_string_lossy();
        let build = self
            .runner
            .run("docker", &["build", "-t", &image, context_arg.as_ref()])
            .await
            .map_err(|_| BuildError::ToolMissing("docker".to_string()))?;
        if !build.status.success() {
            return Err(BuildError::BuildFailed(
                String::from_utf8_lossy(&build.stderr).trim().to_string(),
            ));
        }

        let digest = self.push(&image).await?;
        Ok(ImageReference {
            repository: handle.registry_uri.clone(),
            tag: tag.to_string(),
            digest,
        })
    }
}

/// Push errors worth retrying: throttling, resets, timeouts, upstream blips.
/// Auth and nonexistent-repository errors are not on the list; retrying those
/// only delays the inevitable.
fn is_transient_push_error(stderr: &str) -> bool {
    let lowered = stderr.to_lowercase();
    [
        "timeout",
        "timed out",
        "connection reset",
        "connection refused",
        "too many requests",
        "throttl",
        "temporarily unavailable",
        "tls handshake",
        "eof",
        "502",
        "503",
    ]
    .iter()
    .any(|needle| lowered.contains(needle))
}

/// Pull the content digest out of `docker push` output.
fn parse_digest(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .rev()
        .find_map(|line| line.split_whitespace().find(|w| w.starts_with("sha256:")))
        .map(ToString::to_string)
}
