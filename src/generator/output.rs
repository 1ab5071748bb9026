use serde_json::Value;

use crate::{
    errors::GeneratorError,
    response::{Outcome, Prediction}
};

const NO_IMAGE: &str = "no image was generated";
const UNREADABLE_IMAGE: &str = "the generated image could not be read";

/// Image URL of a finished prediction: the first entry of its output.
pub fn image_url(prediction: &Prediction) -> Result<String, GeneratorError> {
    match prediction.outcome() {
        Outcome::Succeeded { output } => first_image(output),
        Outcome::Rejected { message } => Err(GeneratorError::RemoteRejection(message)),
        Outcome::Failed { status } => Err(GeneratorError::JobFailed(status.clone())),
        Outcome::Pending => Err(GeneratorError::JobFailed(prediction.status.clone()))
    }
}

fn first_image(output: Option<&Value>) -> Result<String, GeneratorError> {
    let items = match output {
        None => return Err(GeneratorError::MalformedResult(NO_IMAGE)),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(GeneratorError::MalformedResult(UNREADABLE_IMAGE))
    };

    match items.first() {
        Some(Value::String(url)) => Ok(url.clone()),
        Some(_) => Err(GeneratorError::MalformedResult(UNREADABLE_IMAGE)),
        None => Err(GeneratorError::MalformedResult(NO_IMAGE))
    }
}
