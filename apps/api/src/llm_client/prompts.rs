// Shared prompt fragments and prompt-building utilities.
// Each feature defines its own prompts.rs alongside its flow.

use crate::pipeline::schema::Schema;

/// Header placed before the JSON schema appended to structured prompts.
pub const OUTPUT_INSTRUCTIONS_HEADER: &str = "Output should be in JSON format and conform to the following schema:";

/// Trailing line that keeps the model from wrapping its answer.
pub const JSON_ONLY_INSTRUCTION: &str =
    "Do NOT include any text outside the JSON object. Do NOT use markdown code fences.";

/// Appends the output format for `schema` to a rendered prompt.
pub fn with_output_instructions(prompt: &str, schema: &Schema) -> String {
    let schema_json = serde_json::to_string_pretty(&schema.to_response_schema())
        .unwrap_or_else(|_| "{}".to_string());
    format!(
        "{}\n\n{OUTPUT_INSTRUCTIONS_HEADER}\n\n```\n{schema_json}\n```\n\n{JSON_ONLY_INSTRUCTION}",
        prompt.trim_end()
    )
}
