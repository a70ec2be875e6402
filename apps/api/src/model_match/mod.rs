// Model Match: suggests roster talent for a set of physical and professional criteria.
// All provider calls go through llm_client, via the shared pipeline.

pub mod flow;
pub mod handlers;
pub mod prompts;
