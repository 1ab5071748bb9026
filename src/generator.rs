pub mod client;
pub mod output;
pub mod poller;

use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::errors::GeneratorError;
use self::{client::ReplicateClient, poller::PollConfig};

/// A finished prediction, reduced to what the result page shows.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub prediction_id: String,
    pub image_url: String,
    /// Seconds the model ran, when Replicate reports it.
    pub predict_time: Option<f64>
}

/// Submit `prompt`, wait for the prediction to finish and return the image.
///
/// The poll budget covers the whole exchange, the creation request included.
pub async fn generate_image(
    client: &ReplicateClient,
    prompt: &str,
    guidance: f64,
    poll: &PollConfig,
    cancel: &CancellationToken
) -> Result<Generation, GeneratorError> {
    let deadline = Instant::now() + poll.budget;

    let prediction = tokio::select! {
        _ = cancel.cancelled() => return Err(GeneratorError::Cancelled),
        prediction = timeout_at(deadline, client.submit(prompt, guidance)) => match prediction {
            Ok(prediction) => prediction?,
            Err(_) => {
                warn!("Creating the prediction took longer than {:?}", poll.budget);
                return Err(GeneratorError::DeadlineExceeded(poll.budget))
            }
        }
    };

    info!("[Prediction {}] Created with status {}", prediction.id, prediction.status);
    let prediction = poller::wait_until(client, prediction, poll, deadline, cancel).await?;

    Ok(Generation {
        image_url: output::image_url(&prediction)?,
        predict_time: prediction.metrics.and_then(|metrics| metrics.predict_time),
        prediction_id: prediction.id
    })
}
