use std::net::SocketAddr;

use askama::Template;
use axum::{extract::{ConnectInfo, Query, State}, response::Html, Form};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    errors::GeneratorError,
    generator::{client::ReplicateClient, generate_image},
    templates::GeneratedImage,
    SharedState
};

#[derive(Deserialize)]
pub struct GenerateForm {
    #[serde(default)]
    pub prompt: String
}

/// `GET /generate?prompt=..` or `POST /generate` with a form body.
/// A prompt in the body takes precedence over the query string.
pub async fn generate(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(query): Query<GenerateForm>,
    form: Option<Form<GenerateForm>>
) -> Result<Html<String>, GeneratorError> {
    info!("[{}] Recieved request on /generate", addr);

    let client = ReplicateClient::from_config(state.http.clone(), &state.config)?;

    let prompt = form
        .map(|Form(form)| form.prompt)
        .filter(|prompt| !prompt.trim().is_empty())
        .unwrap_or(query.prompt);
    let prompt = prompt.trim();
    if prompt.is_empty() {
        info!("[{}] Could not find a prompt...", addr);
        return Err(GeneratorError::MissingPrompt)
    }

    debug!("[{}] Prompt: {}", addr, prompt);

    // A disconnected browser makes axum drop this future, which is what stops
    // polling. The guard cancels the token on that same drop.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let generation = generate_image(
        &client,
        prompt,
        state.config.guidance,
        &state.config.poll,
        &cancel
    ).await?;

    info!("[{}] Rendering generated image {}", addr, generation.image_url);
    let page = GeneratedImage {
        image_url: generation.image_url,
        prompt: prompt.to_string(),
        prediction_id: generation.prediction_id,
        predict_time: generation.predict_time.map(|seconds| format!("{:.1}", seconds))
    };

    Ok(Html(page.render()?))
}
