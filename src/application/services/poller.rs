//! Generic bounded readiness poller.
//!
//! One parameterized primitive instead of per-check sleep/recheck loops: a
//! pure control-flow utility with no side effects of its own, reused for the
//! rollout-complete, hostname-assigned, and HTTP-200 checks.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::application::ports::Probe;
use crate::domain::error::ProbeError;

/// Result of one poll: outcome plus attempt and timing accounting.
#[derive(Debug)]
pub struct PollResult<T> {
    pub outcome: PollOutcome<T>,
    /// Probe invocations made, including the immediate first call.
    pub attempts: u32,
    pub elapsed: Duration,
}

/// How a poll ended.
#[derive(Debug)]
pub enum PollOutcome<T> {
    /// The condition was observed to hold.
    Satisfied(T),
    /// The timeout elapsed; carries the most recent observation.
    TimedOut { last_observation: String },
    /// A permanent probe error short-circuited the poll.
    Aborted(String),
}

impl<T> PollResult<T> {
    #[must_use]
    pub fn satisfied(&self) -> bool {
        matches!(self.outcome, PollOutcome::Satisfied(_))
    }
}

/// Wait until `probe` reports ready, up to `timeout`.
///
/// The probe is invoked immediately, then once per `interval`. Transient probe
/// errors count as "not yet satisfied"; a fatal error aborts the poll at once
/// instead of silently burning the timeout. Returns no earlier than `timeout`
/// on a never-ready condition, and no later than `timeout` plus one interval.
pub async fn poll<T, F, Fut>(timeout: Duration, interval: Duration, mut probe: F) -> PollResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Probe<T>, ProbeError>>,
{
    let start = Instant::now();
    let mut attempts: u32 = 0;
    let mut last_observation = String::from("no observation yet");

    loop {
        attempts += 1;
        match probe().await {
            Ok(Probe::Ready(value)) => {
                return PollResult {
                    outcome: PollOutcome::Satisfied(value),
                    attempts,
                    elapsed: start.elapsed(),
                };
            }
            Ok(Probe::Pending(observation)) | Err(ProbeError::Transient(observation)) => {
                last_observation = observation;
            }
            Err(ProbeError::Fatal(message)) => {
                return PollResult {
                    outcome: PollOutcome::Aborted(message),
                    attempts,
                    elapsed: start.elapsed(),
                };
            }
        }

        if start.elapsed() >= timeout {
            return PollResult {
                outcome: PollOutcome::TimedOut { last_observation },
                attempts,
                elapsed: start.elapsed(),
            };
        }
        tokio::time::sleep(interval).await;
    }
}
