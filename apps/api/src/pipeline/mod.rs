// Structured-generation pipeline shared by every AI feature.
// Validation, rendering and adaptation are pure; the only suspension point is the
// provider call made through llm_client.

pub mod adapter;
pub mod orchestrator;
pub mod schema;
pub mod template;
