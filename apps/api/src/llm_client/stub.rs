//! Scripted [`GenerationClient`] for tests: canned answers in order, every request captured.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use super::{GenerationClient, GenerationError, GenerationRequest, Media, RawGeneration};

#[derive(Default)]
pub struct StubClient {
    responses: Mutex<VecDeque<Result<RawGeneration, GenerationError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl StubClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, response: Result<RawGeneration, GenerationError>) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn with_output(self, output: Value) -> Self {
        self.respond(Ok(RawGeneration {
            output: Some(output.clone()),
            text: Some(output.to_string()),
            media: None,
        }))
    }

    pub fn with_image(self, mime_type: &str, data: &'static [u8]) -> Self {
        self.respond(Ok(RawGeneration {
            output: None,
            text: None,
            media: Some(Media {
                mime_type: mime_type.to_string(),
                data: Bytes::from_static(data),
            }),
        }))
    }

    pub fn failing(self, error: GenerationError) -> Self {
        self.respond(Err(error))
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationClient for StubClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<RawGeneration, GenerationError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(GenerationError::EmptyContent))
    }
}
