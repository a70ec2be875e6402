// Photoshoot Hub: turns a theme into a written concept and a visualisation image.
// Two provider calls per request, chained through PhotoshootStep.

pub mod flow;
pub mod handlers;
pub mod prompts;
