use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /models/{owner}/{name}/predictions`.
#[derive(Serialize)]
pub struct NewPrediction<'de> {
    pub input: NewInput<'de>
}

#[derive(Serialize)]
pub struct NewInput<'de> {
    pub prompt: &'de str,
    pub guidance: f64
}

/// A snapshot of a prediction as reported by Replicate.
///
/// Only the fields this service acts on are decoded, serde skips the rest
/// (`input`, `logs`, timestamps, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct Prediction {
    pub id: String,
    pub status: PredictionStatus,
    pub urls: PredictionUrls,

    #[serde(default)]
    pub output: Option<Value>,

    #[serde(default)]
    pub error: Option<Value>,

    #[serde(default)]
    pub metrics: Option<PredictionMetrics>
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictionUrls {
    pub get: String
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictionMetrics {
    #[serde(default)]
    pub predict_time: Option<f64>
}

/// Error document Replicate sends along with a non-2xx status.
#[derive(Debug, Default, Deserialize)]
pub struct ApiProblem {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub detail: Option<String>
}

impl ApiProblem {

    /// Best human readable message for a failed call, falling back to the raw body.
    pub fn message(body: &str) -> String {
        let problem: ApiProblem = serde_json::from_str(body).unwrap_or_default();
        match (problem.detail, problem.title) {
            (Some(detail), _) if !detail.is_empty() => detail,
            (_, Some(title)) if !title.is_empty() => title,
            _ => body.trim().to_string()
        }
    }

}

/// Replicate reports `starting` while queued and `processing` while running.
/// Anything it may add later is kept verbatim and treated as terminal.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum PredictionStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    Other(String)
}

impl PredictionStatus {

    pub fn as_str(&self) -> &str {
        match self {
            PredictionStatus::Starting => "starting",
            PredictionStatus::Processing => "processing",
            PredictionStatus::Succeeded => "succeeded",
            PredictionStatus::Failed => "failed",
            PredictionStatus::Canceled => "canceled",
            PredictionStatus::Other(status) => status
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PredictionStatus::Starting | PredictionStatus::Processing)
    }

    /// Position in the forward-only lifecycle, all terminal states share the last one.
    pub fn stage(&self) -> u8 {
        match self {
            PredictionStatus::Starting => 0,
            PredictionStatus::Processing => 1,
            _ => 2
        }
    }

}

impl From<String> for PredictionStatus {

    fn from(value: String) -> Self {
        match value.as_str() {
            "starting" => PredictionStatus::Starting,
            "processing" => PredictionStatus::Processing,
            "succeeded" => PredictionStatus::Succeeded,
            "failed" => PredictionStatus::Failed,
            "canceled" => PredictionStatus::Canceled,
            _ => PredictionStatus::Other(value)
        }
    }

}

impl fmt::Display for PredictionStatus {

    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }

}

/// What a single snapshot means for the caller waiting on it.
#[derive(Debug, PartialEq)]
pub enum Outcome<'a> {
    Pending,
    Succeeded { output: Option<&'a Value> },
    Rejected { message: String },
    Failed { status: &'a PredictionStatus }
}

impl Prediction {

    /// The `error` field as text. `null` and `""` count as no error.
    pub fn error_message(&self) -> Option<String> {
        match &self.error {
            None | Some(Value::Null) => None,
            Some(Value::String(message)) if message.is_empty() => None,
            Some(Value::String(message)) => Some(message.clone()),
            Some(other) => Some(other.to_string())
        }
    }

    /// A populated error wins over whatever the status says.
    pub fn outcome(&self) -> Outcome<'_> {
        if let Some(message) = self.error_message() {
            return Outcome::Rejected { message }
        }

        match &self.status {
            status if !status.is_terminal() => Outcome::Pending,
            PredictionStatus::Succeeded => Outcome::Succeeded {
                output: self.output.as_ref().filter(|output| !output.is_null())
            },
            status => Outcome::Failed { status }
        }
    }

}
