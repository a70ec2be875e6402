pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::model_match::handlers::handle_suggest_models;
use crate::photoshoot::handlers::handle_generate_idea;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/model-match", post(handle_suggest_models))
        .route("/api/v1/photoshoot-idea", post(handle_generate_idea))
        .with_state(state)
}
