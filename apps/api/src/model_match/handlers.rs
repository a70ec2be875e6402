//! Axum route handlers for the Model Match API.

use axum::{extract::State, Json};

use crate::errors::{AppError, JsonInput};
use crate::model_match::flow::ModelSuggestions;
use crate::state::AppState;

/// POST /api/v1/model-match
///
/// Body is the raw criteria object; shape checks happen in the flow, not the extractor.
pub async fn handle_suggest_models(
    State(state): State<AppState>,
    JsonInput(raw_input): JsonInput,
) -> Result<Json<ModelSuggestions>, AppError> {
    let suggestions = state.model_match.suggest_models(&raw_input).await?;
    Ok(Json(suggestions))
}
