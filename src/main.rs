use std::{net::SocketAddr, sync::Arc};

use anyhow::Result;
use dotenvy::dotenv;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use image_generator::{app, config::Config, SharedState, State};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "image_generator=debug,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
        )
        .init();

    let config = Config::from_env()?;
    if config.api_token.is_none() {
        warn!("REPLICATE_API_TOKEN is not set! /generate will refuse every request.");
    }

    info!("Initializing service for model {}...", config.model);

    let addr = config.address.clone();
    let shared_state: SharedState = Arc::new(State::new(config));
    let app = app(shared_state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await?;

    info!("Service now listening on {}", &addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>()
    ).await?;

    Ok(())
}
