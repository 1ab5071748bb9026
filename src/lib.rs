pub mod config;
pub mod endpoints;
pub mod errors;
pub mod generator;
pub mod response;
pub mod templates;


use std::sync::Arc;

use axum::Router;
use config::Config;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Everything a request handler needs, built once in `main`.
pub struct State {
    pub config: Config,
    pub http: reqwest::Client
}

impl State {
    pub fn new(config: Config) -> State {
        State {
            config,
            http: reqwest::Client::new()
        }
    }

}

pub type SharedState = Arc<State>;

pub fn app(state: SharedState) -> Router {
    endpoints::get_router()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
        )
        .with_state(state)
}
