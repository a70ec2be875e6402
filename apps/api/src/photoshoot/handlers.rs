//! Axum route handlers for the Photoshoot Hub API.

use axum::{extract::State, Json};

use crate::errors::{AppError, JsonInput};
use crate::photoshoot::flow::PhotoshootIdea;
use crate::state::AppState;

/// POST /api/v1/photoshoot-idea
pub async fn handle_generate_idea(
    State(state): State<AppState>,
    JsonInput(raw_input): JsonInput,
) -> Result<Json<PhotoshootIdea>, AppError> {
    let idea = state.photoshoot.generate_idea(&raw_input).await?;
    Ok(Json(idea))
}
