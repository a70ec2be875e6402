//! Request Orchestrator — one externally callable entry point per feature.
//!
//! Flow: validate → render → generate (once, or twice for image features) → adapt.
//! Each step is a hard gate. Failures are logged here with their real cause and
//! collapsed into the feature's generic message before they reach the caller.

use std::fmt;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm_client::GenerationError;
use crate::pipeline::adapter::AdaptationError;
use crate::pipeline::schema::{validate, Schema, Validated, ValidationError};
use crate::pipeline::template::TemplateError;

/// Static description of one generation feature. Created at startup, never mutated.
#[derive(Debug)]
pub struct FeatureSpec {
    pub name: &'static str,
    pub input_schema: &'static Schema,
    pub output_schema: &'static Schema,
    pub prompt_template: &'static str,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Adaptation(#[from] AdaptationError),
}

// ────────────────────────────────────────────────────────────────────────────
// Call state machine
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Validating,
    Rendering,
    Generating,
    Adapting,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Validating => "validating",
            Stage::Rendering => "rendering",
            Stage::Generating => "generating",
            Stage::Adapting => "adapting",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Per-call progress. Lives for exactly one orchestrated call.
#[derive(Debug, Clone)]
pub struct CallState {
    stage: Stage,
    history: Vec<Stage>,
}

impl Default for CallState {
    fn default() -> Self {
        Self {
            stage: Stage::Idle,
            history: vec![Stage::Idle],
        }
    }
}

impl CallState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Every stage entered so far, starting with `Idle`.
    #[cfg(test)]
    pub fn history(&self) -> &[Stage] {
        &self.history
    }

    pub fn enter(&mut self, next: Stage) {
        debug!("stage {} -> {}", self.stage, next);
        self.stage = next;
        self.history.push(next);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Flow trait
// ────────────────────────────────────────────────────────────────────────────

/// A feature's side of the pipeline: its static description and steps 2–4 for checked input.
#[async_trait]
pub trait Flow: Send + Sync {
    /// The typed form of a validated input.
    type Input: DeserializeOwned + Send;
    type Output: Send;

    fn spec(&self) -> &'static FeatureSpec;

    /// The only failure text a caller ever sees for steps 2–4.
    fn failure_message(&self) -> &'static str;

    async fn execute(
        &self,
        input: Self::Input,
        fields: Validated,
        state: &mut CallState,
    ) -> Result<Self::Output, PipelineError>;
}

/// Runs one orchestrated call of `flow` for an untyped input.
pub async fn run<F: Flow>(flow: &F, raw_input: &Value) -> Result<F::Output, AppError> {
    let mut state = CallState::new();
    run_with_state(flow, raw_input, &mut state).await
}

/// As [`run`], recording stage transitions into `state`.
pub async fn run_with_state<F: Flow>(
    flow: &F,
    raw_input: &Value,
    state: &mut CallState,
) -> Result<F::Output, AppError> {
    let spec = flow.spec();
    let span = info_span!("flow", feature = spec.name, call_id = %Uuid::new_v4());

    async move {
        state.enter(Stage::Validating);
        let fields = match validate(raw_input, spec.input_schema) {
            Ok(fields) => fields,
            Err(e) => {
                warn!("Rejected {} input: {e}", spec.name);
                state.enter(Stage::Failed);
                return Err(AppError::InvalidInput);
            }
        };
        let input = match fields.deserialize::<F::Input>() {
            Ok(input) => input,
            Err(e) => {
                warn!("Rejected {} input: {e}", spec.name);
                state.enter(Stage::Failed);
                return Err(AppError::InvalidInput);
            }
        };

        match flow.execute(input, fields, state).await {
            Ok(output) => {
                state.enter(Stage::Done);
                info!("{} completed", spec.name);
                Ok(output)
            }
            Err(e) => {
                error!("{} failed while {}: {e}", spec.name, state.stage());
                state.enter(Stage::Failed);
                Err(AppError::Generation(flow.failure_message()))
            }
        }
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::schema::{Field, Rule};
    use serde::Deserialize;
    use serde_json::json;

    static ECHO_INPUT: Schema = Schema {
        fields: &[Field::string("word", "").with_rules(&[Rule::MinLength(2)])],
    };

    static ECHO: FeatureSpec = FeatureSpec {
        name: "echo",
        input_schema: &ECHO_INPUT,
        output_schema: &ECHO_INPUT,
        prompt_template: "Say {word}",
    };

    #[derive(Deserialize)]
    struct EchoInput {
        word: String,
    }

    /// Renders its template and either returns the prompt or fails with a template error.
    struct EchoFlow {
        template: &'static str,
    }

    #[async_trait]
    impl Flow for EchoFlow {
        type Input = EchoInput;
        type Output = String;

        fn spec(&self) -> &'static FeatureSpec {
            &ECHO
        }

        fn failure_message(&self) -> &'static str {
            "Echo failed."
        }

        async fn execute(
            &self,
            input: EchoInput,
            fields: Validated,
            state: &mut CallState,
        ) -> Result<String, PipelineError> {
            state.enter(Stage::Rendering);
            let prompt = crate::pipeline::template::render(self.template, fields.fields())?;
            assert!(prompt.contains(&input.word));
            Ok(prompt)
        }
    }

    #[tokio::test]
    async fn test_run_success_walks_stages() {
        let flow = EchoFlow {
            template: ECHO.prompt_template,
        };
        let mut state = CallState::new();
        let out = run_with_state(&flow, &json!({"word": "hello"}), &mut state)
            .await
            .unwrap();
        assert_eq!(out, "Say hello");
        assert_eq!(
            state.history(),
            &[Stage::Idle, Stage::Validating, Stage::Rendering, Stage::Done]
        );
    }

    #[tokio::test]
    async fn test_invalid_input_collapses_to_generic_error() {
        let flow = EchoFlow {
            template: ECHO.prompt_template,
        };
        let mut state = CallState::new();
        let err = run_with_state(&flow, &json!({"word": "h"}), &mut state)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput));
        assert_eq!(err.to_string(), "Invalid input.");
        assert_eq!(
            state.history(),
            &[Stage::Idle, Stage::Validating, Stage::Failed]
        );
    }

    #[tokio::test]
    async fn test_execute_failure_hides_cause() {
        let flow = EchoFlow {
            template: "Say {missing}",
        };
        let mut state = CallState::new();
        let err = run_with_state(&flow, &json!({"word": "hello"}), &mut state)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Echo failed.");
        assert!(!err.to_string().contains("missing"));
        assert_eq!(state.stage(), Stage::Failed);
        assert_eq!(
            state.history(),
            &[Stage::Idle, Stage::Validating, Stage::Rendering, Stage::Failed]
        );
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Generating.to_string(), "generating");
        assert_eq!(Stage::Failed.to_string(), "failed");
    }
}
