//! Response Adapter — coerces a raw provider answer into the declared output shape.
//!
//! The provider is asked to honour the schema but is not trusted to: every structured
//! output is validated again here before any feature sees it.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::llm_client::{Media, RawGeneration};
use crate::pipeline::schema::{self, Schema, ValidationError};

#[derive(Debug, Error)]
pub enum AdaptationError {
    #[error("provider returned no structured output")]
    EmptyOutput,

    #[error("structured output does not match the declared shape: {0}")]
    Shape(#[from] ValidationError),

    #[error("structured output could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("provider returned no image")]
    MissingMedia,
}

/// A provider answer that conforms to its output shape. Owned by the call that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResult {
    pub structured_output: Value,
    // Structured features never ask for media; kept so an answer is not silently truncated.
    #[allow(dead_code)]
    pub raw_media: Option<Media>,
}

impl GenerationResult {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, AdaptationError> {
        Ok(T::deserialize(&self.structured_output)?)
    }
}

/// Re-validates `raw.output` against `shape`. Undeclared keys are dropped.
pub fn adapt(raw: RawGeneration, shape: &Schema) -> Result<GenerationResult, AdaptationError> {
    let output = match raw.output {
        None | Some(Value::Null) => return Err(AdaptationError::EmptyOutput),
        Some(output) => output,
    };

    let validated = schema::validate(&output, shape)?;

    Ok(GenerationResult {
        structured_output: validated.into_value(),
        raw_media: raw.media,
    })
}

/// Extracts the image from a text+image answer.
pub fn adapt_media(raw: RawGeneration) -> Result<Media, AdaptationError> {
    if let Some(text) = &raw.text {
        debug!("Image answer carried {} chars of text", text.len());
    }
    raw.media.ok_or(AdaptationError::MissingMedia)
}

/// Checks an assembled value against the shape it is declared to have.
pub fn ensure_shape(value: &Value, shape: &Schema) -> Result<(), AdaptationError> {
    schema::validate(value, shape)?;
    Ok(())
}
