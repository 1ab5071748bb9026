use std::net::SocketAddr;

use askama::Template;
use axum::{extract::{ConnectInfo, State}, response::Html};
use tracing::info;

use crate::{errors::GeneratorError, templates::Index, SharedState};

pub async fn index(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>
) -> Result<Html<String>, GeneratorError> {
    info!("[{}] Recieved GET request on /", addr);
    let index_template = Index {
        model: state.config.model.clone()
    };

    Ok(Html(index_template.render()?))
}
