pub mod automation;

use axum::{routing::get, Router};

use crate::state::AppState;

pub fn configure(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status))
        .merge(automation::routes(state))
}

async fn status() -> &'static str {
    "ok"
}
