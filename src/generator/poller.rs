//! Waits for a prediction to reach a terminal status.
//!
//! The loop is bounded by an elapsed-time budget and stops as soon as the
//! [`CancellationToken`] fires, so an abandoned request never keeps polling.

use std::time::Duration;

use tokio::time::{sleep, timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    errors::GeneratorError,
    response::{Outcome, Prediction}
};

use super::client::ReplicateClient;

/// Tunable parameters for the poll loop.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay before the first status check.
    pub interval: Duration,
    /// Upper bound on the delay between checks.
    pub max_interval: Duration,
    /// Factor by which the delay grows after each check, `1.0` keeps it fixed.
    pub multiplier: f64,
    /// Total time allowed before giving up.
    pub budget: Duration
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(10),
            multiplier: 1.0,
            budget: Duration::from_secs(300)
        }
    }
}

/// Calculate the next delay, clamped to [`PollConfig::max_interval`].
///
/// A multiplier below `1.0` never shrinks the delay.
pub fn next_delay(current: Duration, config: &PollConfig) -> Duration {
    if config.multiplier <= 1.0 {
        return current;
    }

    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_interval.max(current))
}

/// Poll `prediction` until it succeeds or fails, within [`PollConfig::budget`].
///
/// Returns the terminal snapshot. A snapshot carrying an error stops the loop
/// with [`GeneratorError::RemoteRejection`] whatever its status is.
pub async fn wait_for_completion(
    client: &ReplicateClient,
    prediction: Prediction,
    config: &PollConfig,
    cancel: &CancellationToken
) -> Result<Prediction, GeneratorError> {
    let deadline = Instant::now() + config.budget;
    wait_until(client, prediction, config, deadline, cancel).await
}

/// Same as [`wait_for_completion`] against a deadline the caller already started.
///
/// Time spent inside a status request counts against the deadline too.
pub async fn wait_until(
    client: &ReplicateClient,
    mut prediction: Prediction,
    config: &PollConfig,
    deadline: Instant,
    cancel: &CancellationToken
) -> Result<Prediction, GeneratorError> {
    let started = Instant::now();
    let mut delay = config.interval;
    let mut polls = 0u32;

    loop {
        let terminal = match prediction.outcome() {
            Outcome::Rejected { message } => {
                warn!("[Prediction {}] Rejected after {} polls: {}", prediction.id, polls, message);
                return Err(GeneratorError::RemoteRejection(message))
            },
            Outcome::Pending => false,
            Outcome::Succeeded { .. } | Outcome::Failed { .. } => true
        };

        if terminal {
            info!("[Prediction {}] Finished with status {} after {} polls", prediction.id, prediction.status, polls);
            return Ok(prediction)
        }

        if Instant::now() + delay > deadline {
            warn!("[Prediction {}] Still {} after {:?}, giving up", prediction.id, prediction.status, started.elapsed());
            return Err(GeneratorError::DeadlineExceeded(config.budget))
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("[Prediction {}] Polling cancelled", prediction.id);
                return Err(GeneratorError::Cancelled)
            }
            _ = sleep(delay) => {}
        }

        let next = tokio::select! {
            _ = cancel.cancelled() => {
                info!("[Prediction {}] Polling cancelled", prediction.id);
                return Err(GeneratorError::Cancelled)
            }
            next = timeout_at(deadline, client.fetch(&prediction)) => match next {
                Ok(next) => next?,
                Err(_) => {
                    warn!("[Prediction {}] Status request still pending at the deadline", prediction.id);
                    return Err(GeneratorError::DeadlineExceeded(config.budget))
                }
            }
        };
        polls += 1;

        if next.status.stage() < prediction.status.stage() {
            warn!("[Prediction {}] Status went back from {} to {}", prediction.id, prediction.status, next.status);
        }

        debug!("[Prediction {}] Poll {}: {}", next.id, polls, next.status);
        prediction = next;
        delay = next_delay(delay, config);
    }
}
