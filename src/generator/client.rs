use reqwest::header::AUTHORIZATION;
use tracing::debug;

use crate::{
    config::Config,
    errors::GeneratorError,
    response::{ApiProblem, NewInput, NewPrediction, Prediction}
};

/// Authenticated access to the Replicate predictions API for one model.
#[derive(Clone)]
pub struct ReplicateClient {
    http: reqwest::Client,
    api_url: String,
    model: String,
    token: String
}

impl ReplicateClient {

    pub fn new(http: reqwest::Client, api_url: impl Into<String>, model: impl Into<String>, token: impl Into<String>) -> ReplicateClient {
        ReplicateClient {
            http,
            api_url: api_url.into(),
            model: model.into(),
            token: token.into()
        }
    }

    /// Fails with [`GeneratorError::MissingCredential`] before anything touches the network.
    pub fn from_config(http: reqwest::Client, config: &Config) -> Result<ReplicateClient, GeneratorError> {
        let token = config.api_token
            .clone()
            .ok_or(GeneratorError::MissingCredential)?;

        Ok(ReplicateClient::new(http, config.api_url.clone(), config.model.clone(), token))
    }

    pub fn predictions_url(&self) -> String {
        format!("{}/models/{}/predictions", self.api_url, self.model)
    }

    /// Create a prediction. A prediction the API rejects up front, e.g. on
    /// input validation, is returned as [`GeneratorError::RemoteRejection`].
    pub async fn submit(&self, prompt: &str, guidance: f64) -> Result<Prediction, GeneratorError> {
        let body = NewPrediction {
            input: NewInput { prompt, guidance }
        };

        let response = self.http.post(self.predictions_url())
            .header(AUTHORIZATION, self.authorization())
            .json(&body)
            .send()
            .await?;

        let prediction = Self::parse_response(response).await?;
        if let Some(message) = prediction.error_message() {
            return Err(GeneratorError::RemoteRejection(message))
        }

        Ok(prediction)
    }

    /// Re-read a prediction from its status URL.
    pub async fn fetch(&self, prediction: &Prediction) -> Result<Prediction, GeneratorError> {
        let response = self.http.get(&prediction.urls.get)
            .header(AUTHORIZATION, self.authorization())
            .send()
            .await?;

        Self::parse_response(response).await
    }

    fn authorization(&self) -> String {
        format!("Token {}", self.token)
    }

    async fn parse_response(response: reqwest::Response) -> Result<Prediction, GeneratorError> {
        let status = response.status();
        let body = response.text().await?;
        debug!("Replicate answered {} with {} bytes", status, body.len());

        if !status.is_success() {
            let message = ApiProblem::message(&body);
            return Err(GeneratorError::RemoteRejection(format!("{} ({})", message, status)))
        }

        Ok(serde_json::from_str(&body)?)
    }

}
