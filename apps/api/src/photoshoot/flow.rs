//! Photoshoot idea flow — a concept call, then an image call built from that concept.
//!
//! The two calls are an explicit machine (`PhotoshootStep`) so that the intermediate
//! "concept known, image pending" state can be built and advanced on its own.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::errors::AppError;
use crate::llm_client::{GenerationClient, GenerationRequest};
use crate::photoshoot::prompts::{IMAGE_PROMPT_TEMPLATE, PHOTOSHOOT_CONCEPT_PROMPT_TEMPLATE};
use crate::pipeline::adapter::{adapt, adapt_media, ensure_shape, AdaptationError};
use crate::pipeline::orchestrator::{run, CallState, FeatureSpec, Flow, PipelineError, Stage};
use crate::pipeline::schema::{Field, Rule, Schema, Validated};
use crate::pipeline::template::{render, TemplateError};

pub const FAILURE_MESSAGE: &str = "Failed to get a photoshoot idea from the AI model.";

// ────────────────────────────────────────────────────────────────────────────
// Schemas
// ────────────────────────────────────────────────────────────────────────────

static PHOTOSHOOT_INPUT: Schema = Schema {
    fields: &[Field::string("theme", "The theme or concept for the photoshoot.")
        .with_rules(&[Rule::MinLength(3)])],
};

static PHOTOSHOOT_CONCEPT: Schema = Schema {
    fields: &[
        Field::string("mood", "The overall mood and art direction."),
        Field::string("location", "Suggestions for the location and scenery."),
        Field::string("styling", "Concepts for model styling and wardrobe."),
        Field::string("props", "Ideas for potential props to use."),
    ],
};

static PHOTOSHOOT_IMAGE: Schema = Schema {
    fields: &[
        Field::string("url", "The data URI of the generated visualization image."),
        Field::string("prompt", "The prompt used to generate the image."),
    ],
};

static PHOTOSHOOT_OUTPUT: Schema = Schema {
    fields: &[
        Field::object("concept", "The photoshoot concept.", &PHOTOSHOOT_CONCEPT),
        Field::object(
            "image",
            "A visualization of the photoshoot concept.",
            &PHOTOSHOOT_IMAGE,
        ),
    ],
};

pub static PHOTOSHOOT_IDEA_FEATURE: FeatureSpec = FeatureSpec {
    name: "photoshoot-idea",
    input_schema: &PHOTOSHOOT_INPUT,
    output_schema: &PHOTOSHOOT_OUTPUT,
    prompt_template: PHOTOSHOOT_CONCEPT_PROMPT_TEMPLATE,
};

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoshootInput {
    pub theme: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoshootConcept {
    pub mood: String,
    pub location: String,
    pub styling: String,
    pub props: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoshootImage {
    /// `data:` URL of the generated image.
    pub url: String,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoshootIdea {
    pub concept: PhotoshootConcept,
    pub image: PhotoshootImage,
}

// ────────────────────────────────────────────────────────────────────────────
// Two-step machine
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum PhotoshootStep {
    /// Nothing generated yet.
    Concept { fields: Validated },
    /// Concept known, image pending.
    Image {
        fields: Validated,
        concept: PhotoshootConcept,
        image_prompt: String,
    },
    Done(PhotoshootIdea),
}

impl PhotoshootStep {
    pub fn start(fields: Validated) -> Self {
        PhotoshootStep::Concept { fields }
    }

    /// Performs exactly one provider call and moves to the next step. `Done` is a no-op.
    pub async fn advance(
        self,
        client: &dyn GenerationClient,
        state: &mut CallState,
    ) -> Result<Self, PipelineError> {
        match self {
            PhotoshootStep::Concept { fields } => {
                state.enter(Stage::Rendering);
                let prompt = render(PHOTOSHOOT_IDEA_FEATURE.prompt_template, fields.fields())?;

                state.enter(Stage::Generating);
                let request = GenerationRequest::structured(
                    &prompt,
                    fields.fields().clone(),
                    &PHOTOSHOOT_CONCEPT,
                );
                let result = adapt(client.generate(&request).await?, &PHOTOSHOOT_CONCEPT)?;

                let image_prompt = build_image_prompt(&fields, &result.structured_output)?;
                let concept = result.decode::<PhotoshootConcept>()?;

                Ok(PhotoshootStep::Image {
                    fields,
                    concept,
                    image_prompt,
                })
            }
            PhotoshootStep::Image {
                fields,
                concept,
                image_prompt,
            } => {
                state.enter(Stage::Generating);
                let request = GenerationRequest::image(image_prompt.clone(), fields.fields().clone());
                let raw = client.generate(&request).await?;

                state.enter(Stage::Adapting);
                let media = adapt_media(raw)?;
                let idea = PhotoshootIdea {
                    concept,
                    image: PhotoshootImage {
                        url: media.data_url(),
                        prompt: image_prompt,
                    },
                };
                let value = serde_json::to_value(&idea).map_err(AdaptationError::Decode)?;
                ensure_shape(&value, PHOTOSHOOT_IDEA_FEATURE.output_schema)?;

                Ok(PhotoshootStep::Done(idea))
            }
            done @ PhotoshootStep::Done(_) => Ok(done),
        }
    }
}

/// Renders the image prompt from the validated input and the adapted concept.
pub fn build_image_prompt(fields: &Validated, concept: &Value) -> Result<String, TemplateError> {
    let mut values = fields.fields().clone();
    if let Some(concept) = concept.as_object() {
        values.extend(concept.clone());
    }
    render(IMAGE_PROMPT_TEMPLATE, &values)
}

// ────────────────────────────────────────────────────────────────────────────
// Flow
// ────────────────────────────────────────────────────────────────────────────

pub struct PhotoshootFlow {
    client: Arc<dyn GenerationClient>,
}

impl PhotoshootFlow {
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self { client }
    }

    /// Entry point: untyped theme in, concept plus visualisation out.
    pub async fn generate_idea(&self, raw_input: &Value) -> Result<PhotoshootIdea, AppError> {
        run(self, raw_input).await
    }
}

#[async_trait]
impl Flow for PhotoshootFlow {
    type Input = PhotoshootInput;
    type Output = PhotoshootIdea;

    fn spec(&self) -> &'static FeatureSpec {
        &PHOTOSHOOT_IDEA_FEATURE
    }

    fn failure_message(&self) -> &'static str {
        FAILURE_MESSAGE
    }

    async fn execute(
        &self,
        input: PhotoshootInput,
        fields: Validated,
        state: &mut CallState,
    ) -> Result<PhotoshootIdea, PipelineError> {
        info!("Generating photoshoot idea for theme {:?}", input.theme);

        let mut step = PhotoshootStep::start(fields);
        loop {
            step = match step.advance(self.client.as_ref(), state).await? {
                PhotoshootStep::Done(idea) => return Ok(idea),
                next => next,
            };
        }
    }
}
