//! LLM Client — the single point of entry for all model provider calls in Muse.
//!
//! ARCHITECTURAL RULE: No other module may call the provider API directly.
//! Feature flows receive an `Arc<dyn GenerationClient>` and never construct one.
//!
//! One attempt per call. There is no retry loop here or anywhere above it.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::pipeline::schema::Schema;

pub mod gemini;
pub mod prompts;
#[cfg(test)]
pub mod stub;

pub use gemini::GeminiClient;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("provider refused the request: {0}")]
    Refused(String),

    #[error("provider returned empty content")]
    EmptyContent,

    #[error("provider returned malformed output: {0}")]
    Malformed(String),
}

/// Whether the provider is asked for text only or text plus an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    Text,
    TextAndImage,
}

/// One call's worth of work for the provider. Built fresh per call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub instructions: String,
    pub input_fields: Map<String, Value>,
    /// When set, the provider is constrained to emit a value of this shape.
    pub output_shape: Option<&'static Schema>,
    pub mode: GenerationMode,
}

impl GenerationRequest {
    /// A schema-constrained text request. The output format is appended to `prompt`.
    pub fn structured(
        prompt: &str,
        input_fields: Map<String, Value>,
        output_shape: &'static Schema,
    ) -> Self {
        Self {
            instructions: prompts::with_output_instructions(prompt, output_shape),
            input_fields,
            output_shape: Some(output_shape),
            mode: GenerationMode::Text,
        }
    }

    /// A text+image request with no output constraint.
    pub fn image(prompt: String, input_fields: Map<String, Value>) -> Self {
        Self {
            instructions: prompt,
            input_fields,
            output_shape: None,
            mode: GenerationMode::TextAndImage,
        }
    }
}

/// Binary media returned by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Media {
    pub mime_type: String,
    pub data: Bytes,
}

impl Media {
    /// An embedded `data:` reference suitable for an `<img src>`.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.data))
    }
}

/// The provider's answer before adaptation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawGeneration {
    /// Parsed structured output, present only for schema-constrained requests.
    pub output: Option<Value>,
    pub text: Option<String>,
    pub media: Option<Media>,
}

/// The remote model provider as seen by the pipeline: opaque, slow, fallible.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<RawGeneration, GenerationError>;
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub(crate) fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));
    match inner {
        Some(stripped) => stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start()),
        None => text,
    }
}
