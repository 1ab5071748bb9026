use std::time::Duration;

use axum::response::{IntoResponse, Response};
use hyper::StatusCode;
use tracing::error;

use crate::response::PredictionStatus;

pub fn internal_error(err: &GeneratorError) -> (StatusCode, String) {
        match err {
            GeneratorError::MissingPrompt => (StatusCode::BAD_REQUEST, err.to_string()),
            GeneratorError::DeadlineExceeded(_) => (StatusCode::GATEWAY_TIMEOUT, err.to_string()),
            GeneratorError::MissingCredential
            | GeneratorError::Transport(_)
            | GeneratorError::Decode(_)
            | GeneratorError::RemoteRejection(_)
            | GeneratorError::JobFailed(_)
            | GeneratorError::MalformedResult(_)
            | GeneratorError::Cancelled
            | GeneratorError::Render(_) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        }
}

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// Internal Server Error, code 500
    /// REPLICATE_API_TOKEN was not set when the service started.
    #[error("The Replicate API token is not configured!")]
    MissingCredential,

    /// Bad Request, code 400
    #[error("You need to enter a prompt!")]
    MissingPrompt,

    /// Internal Server Error, code 500
    #[error("Could not reach the image service: {0}")]
    Transport(#[from] reqwest::Error),

    /// Internal Server Error, code 500
    #[error("Could not read the response of the image service: {0}")]
    Decode(#[from] serde_json::Error),

    /// Internal Server Error, code 500
    /// The image service answered, but reported an error of its own.
    #[error("Image generation was rejected: {0}")]
    RemoteRejection(String),

    /// Internal Server Error, code 500
    #[error("Image generation failed with status \"{0}\"")]
    JobFailed(PredictionStatus),

    /// Internal Server Error, code 500
    #[error("Image generation succeeded, but {0}")]
    MalformedResult(&'static str),

    /// Gateway Timeout, code 504
    #[error("Image generation did not finish within {0:?}")]
    DeadlineExceeded(Duration),

    /// Internal Server Error, code 500
    /// Only ever seen by callers that cancel the token themselves,
    /// a disconnected browser never reads it.
    #[error("Image generation was cancelled")]
    Cancelled,

    /// Internal Server Error, code 500
    #[error("Unable to render page: {0}")]
    Render(#[from] askama::Error),
}

impl IntoResponse for GeneratorError {

    fn into_response(self) -> Response {
        let (code, message) = internal_error(&self);
        if code.is_server_error() {
            error!("Responding with {}: {}", code, message);
        }

        (code, message).into_response()
    }

}
