use std::sync::Arc;

use crate::llm_client::GenerationClient;
use crate::model_match::flow::ModelMatchFlow;
use crate::photoshoot::flow::PhotoshootFlow;

/// Shared application state injected into all route handlers via Axum extractors.
/// Read-only after startup; every request's work is call-local.
#[derive(Clone)]
pub struct AppState {
    pub model_match: Arc<ModelMatchFlow>,
    pub photoshoot: Arc<PhotoshootFlow>,
}

impl AppState {
    /// Wires both feature flows to the same provider client.
    pub fn new(llm: Arc<dyn GenerationClient>) -> Self {
        Self {
            model_match: Arc::new(ModelMatchFlow::new(llm.clone())),
            photoshoot: Arc::new(PhotoshootFlow::new(llm)),
        }
    }
}
