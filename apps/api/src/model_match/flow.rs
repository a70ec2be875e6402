//! Model suggestion flow — one structured generation call, then link rewriting.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::errors::AppError;
use crate::llm_client::{GenerationClient, GenerationRequest};
use crate::model_match::prompts::{PLACEHOLDER_PROFILE_LINK, SUGGEST_MODELS_PROMPT_TEMPLATE};
use crate::pipeline::adapter::adapt;
use crate::pipeline::orchestrator::{run, CallState, FeatureSpec, Flow, PipelineError, Stage};
use crate::pipeline::schema::{Field, Rule, Schema, Validated};
use crate::pipeline::template::render;

pub const FAILURE_MESSAGE: &str = "Failed to get suggestions from the AI model.";

// ────────────────────────────────────────────────────────────────────────────
// Schemas
// ────────────────────────────────────────────────────────────────────────────

static SUGGEST_MODELS_INPUT: Schema = Schema {
    fields: &[
        Field::number("age", "The age of the model.").with_rules(&[Rule::Min(0.0)]),
        Field::string("hairColor", "The hair color of the model.").with_rules(&[Rule::NonEmpty]),
        Field::string("bodyType", "The body type of the model.").with_rules(&[Rule::NonEmpty]),
        Field::string("expertise", "The expertise of the model.").with_rules(&[Rule::NonEmpty]),
    ],
};

static MODEL_SUGGESTION: Schema = Schema {
    fields: &[
        Field::string("name", "The name of the suggested model."),
        Field::string("profileLink", "The link to the model profile."),
        Field::string("reason", "Why this model was suggested."),
    ],
};

static SUGGEST_MODELS_OUTPUT: Schema = Schema {
    fields: &[Field::array(
        "modelSuggestions",
        "A list of suggested models and why they are suitable.",
        &MODEL_SUGGESTION,
    )],
};

pub static MODEL_SUGGESTION_FEATURE: FeatureSpec = FeatureSpec {
    name: "model-suggestion",
    input_schema: &SUGGEST_MODELS_INPUT,
    output_schema: &SUGGEST_MODELS_OUTPUT,
    prompt_template: SUGGEST_MODELS_PROMPT_TEMPLATE,
};

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMatchInput {
    pub age: f64,
    pub hair_color: String,
    pub body_type: String,
    pub expertise: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSuggestion {
    pub name: String,
    pub profile_link: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSuggestions {
    pub model_suggestions: Vec<ModelSuggestion>,
}

/// Replaces every model-provided profile link with the roster placeholder.
pub fn with_placeholder_links(mut suggestions: ModelSuggestions) -> ModelSuggestions {
    for suggestion in &mut suggestions.model_suggestions {
        suggestion.profile_link = PLACEHOLDER_PROFILE_LINK.to_string();
    }
    suggestions
}

// ────────────────────────────────────────────────────────────────────────────
// Flow
// ────────────────────────────────────────────────────────────────────────────

pub struct ModelMatchFlow {
    client: Arc<dyn GenerationClient>,
}

impl ModelMatchFlow {
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self { client }
    }

    /// Entry point: untyped criteria in, suggestions with placeholder links out.
    pub async fn suggest_models(&self, raw_input: &Value) -> Result<ModelSuggestions, AppError> {
        run(self, raw_input).await
    }
}

#[async_trait]
impl Flow for ModelMatchFlow {
    type Input = ModelMatchInput;
    type Output = ModelSuggestions;

    fn spec(&self) -> &'static FeatureSpec {
        &MODEL_SUGGESTION_FEATURE
    }

    fn failure_message(&self) -> &'static str {
        FAILURE_MESSAGE
    }

    async fn execute(
        &self,
        input: ModelMatchInput,
        fields: Validated,
        state: &mut CallState,
    ) -> Result<ModelSuggestions, PipelineError> {
        let spec = self.spec();

        state.enter(Stage::Rendering);
        let prompt = render(spec.prompt_template, fields.fields())?;

        state.enter(Stage::Generating);
        info!(
            "Requesting model suggestions: age={}, hair={}, body={}, expertise={}",
            input.age, input.hair_color, input.body_type, input.expertise
        );
        let request =
            GenerationRequest::structured(&prompt, fields.fields().clone(), spec.output_schema);
        let raw = self.client.generate(&request).await?;

        state.enter(Stage::Adapting);
        let result = adapt(raw, spec.output_schema)?;
        let suggestions = with_placeholder_links(result.decode::<ModelSuggestions>()?);
        info!(
            "Received {} model suggestions",
            suggestions.model_suggestions.len()
        );

        Ok(suggestions)
    }
}
