pub(crate) mod index;
pub(crate) mod generate;
pub(crate) mod not_found;

use axum::{routing::get, Router};
use tower_http::services::ServeDir;

use crate::SharedState;
use self::{
    index::index,
    generate::generate,
    not_found::not_found
};

pub fn get_router() -> Router<SharedState> {
    Router::new()
        .route("/", get(index))
        .route("/generate", get(generate).post(generate))
        .nest_service("/static", ServeDir::new("static"))
        .fallback(not_found)
}
