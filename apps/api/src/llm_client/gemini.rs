//! Gemini `generateContent` implementation of [`GenerationClient`].

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{
    strip_json_fences, GenerationClient, GenerationError, GenerationMode, GenerationRequest,
    Media, RawGeneration,
};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Model used for text and structured generation. Hardcoded to prevent drift.
pub const TEXT_MODEL: &str = "gemini-2.0-flash";
/// Model used when an image is requested alongside text.
pub const IMAGE_MODEL: &str = "gemini-2.0-flash-preview-image-generation";

/// Finish reasons that mean the provider declined to answer.
const REFUSAL_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
    "IMAGE_SAFETY",
];

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: WireGenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<&'static str>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// Gemini REST client. No request timeout is set; callers bound latency themselves.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, base_url: String) -> Result<Self, GenerationError> {
        Ok(Self {
            client: Client::builder().build()?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, mode: GenerationMode) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model_for(mode))
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<RawGeneration, GenerationError> {
        let body = build_body(request);
        debug!(
            "Calling {} for fields {:?}",
            model_for(request.mode),
            request.input_fields.keys().collect::<Vec<_>>()
        );

        let response = self
            .client
            .post(self.endpoint(request.mode))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text).map_err(|e| {
            GenerationError::Malformed(format!("unexpected response envelope: {e}"))
        })?;

        if let Some(usage) = &parsed.usage_metadata {
            debug!(
                "Generation call succeeded: model={}, prompt_tokens={}, output_tokens={}",
                model_for(request.mode),
                usage.prompt_token_count,
                usage.candidates_token_count
            );
        }

        interpret(parsed, request.output_shape.is_some())
    }
}

fn model_for(mode: GenerationMode) -> &'static str {
    match mode {
        GenerationMode::Text => TEXT_MODEL,
        GenerationMode::TextAndImage => IMAGE_MODEL,
    }
}

fn build_body(request: &GenerationRequest) -> GenerateContentRequest<'_> {
    let mut config = WireGenerationConfig::default();

    if let Some(shape) = request.output_shape {
        config.response_mime_type = Some("application/json");
        config.response_schema = Some(shape.to_response_schema());
    }
    if request.mode == GenerationMode::TextAndImage {
        config.response_modalities = Some(vec!["TEXT", "IMAGE"]);
    }

    GenerateContentRequest {
        contents: vec![RequestContent {
            role: "user",
            parts: vec![RequestPart {
                text: &request.instructions,
            }],
        }],
        generation_config: config,
    }
}

/// Turns the provider envelope into a [`RawGeneration`], surfacing refusals and empty answers.
fn interpret(
    response: GenerateContentResponse,
    structured: bool,
) -> Result<RawGeneration, GenerationError> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(GenerationError::Refused(format!("prompt blocked: {reason}")));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(GenerationError::EmptyContent)?;

    if let Some(reason) = candidate.finish_reason.as_deref() {
        if REFUSAL_REASONS.contains(&reason) {
            return Err(GenerationError::Refused(format!("finish reason {reason}")));
        }
    }

    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
    if parts.is_empty() {
        return Err(GenerationError::EmptyContent);
    }

    let mut text = String::new();
    let mut media = None;
    for part in parts {
        if let Some(chunk) = part.text {
            text.push_str(&chunk);
        }
        if let Some(inline) = part.inline_data {
            if media.is_none() {
                media = Some(decode_media(inline)?);
            }
        }
    }

    let text = (!text.trim().is_empty()).then_some(text);

    let output = match (&text, structured) {
        (Some(body), true) => Some(serde_json::from_str(strip_json_fences(body)).map_err(|e| {
            GenerationError::Malformed(format!("structured output is not valid JSON: {e}"))
        })?),
        _ => None,
    };

    Ok(RawGeneration {
        output,
        text,
        media,
    })
}

fn decode_media(inline: InlineData) -> Result<Media, GenerationError> {
    let data = STANDARD
        .decode(inline.data.as_bytes())
        .map_err(|e| GenerationError::Malformed(format!("inline data is not base64: {e}")))?;
    Ok(Media {
        mime_type: inline.mime_type,
        data: Bytes::from(data),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::schema::{Field, Schema};
    use serde_json::{json, Map};

    static CONCEPT: Schema = Schema {
        fields: &[
            Field::string("mood", "The overall mood"),
            Field::string("props", "Props to use"),
        ],
    };

    fn envelope(value: Value) -> GenerateContentResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_model_for_mode() {
        assert_eq!(model_for(GenerationMode::Text), TEXT_MODEL);
        assert_eq!(model_for(GenerationMode::TextAndImage), IMAGE_MODEL);
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = GeminiClient::new("key".to_string(), format!("{DEFAULT_API_BASE}/")).unwrap();
        assert_eq!(
            client.endpoint(GenerationMode::Text),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_structured_body_sets_schema() {
        let request = GenerationRequest::structured("Theme: noir", Map::new(), &CONCEPT);
        let body = serde_json::to_value(build_body(&request)).unwrap();

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(
            body["generationConfig"]["responseSchema"]["required"],
            json!(["mood", "props"])
        );
        assert!(body["generationConfig"].get("responseModalities").is_none());
    }

    #[test]
    fn test_image_body_sets_modalities_only() {
        let request = GenerationRequest::image("A photo".to_string(), Map::new());
        let body = serde_json::to_value(build_body(&request)).unwrap();

        assert_eq!(body["contents"][0]["parts"][0]["text"], "A photo");
        assert_eq!(
            body["generationConfig"]["responseModalities"],
            json!(["TEXT", "IMAGE"])
        );
        assert!(body["generationConfig"].get("responseSchema").is_none());
    }

    #[test]
    fn test_interpret_parses_structured_output() {
        let response = envelope(json!({
            "candidates": [{
                "content": {"parts": [{"text": "```json\n{\"mood\": \"moody\", \"props\": \"umbrella\"}\n```"}]},
                "finishReason": "STOP"
            }]
        }));
        let raw = interpret(response, true).unwrap();
        assert_eq!(raw.output, Some(json!({"mood": "moody", "props": "umbrella"})));
        assert!(raw.media.is_none());
    }

    #[test]
    fn test_interpret_rejects_unparseable_structured_output() {
        let response = envelope(json!({
            "candidates": [{"content": {"parts": [{"text": "Sorry, I can't"}]}}]
        }));
        let err = interpret(response, true).unwrap_err();
        assert!(matches!(err, GenerationError::Malformed(_)));
    }

    #[test]
    fn test_interpret_leaves_text_unparsed_without_shape() {
        let response = envelope(json!({
            "candidates": [{"content": {"parts": [{"text": "Here is your image"}]}}]
        }));
        let raw = interpret(response, false).unwrap();
        assert_eq!(raw.output, None);
        assert_eq!(raw.text.as_deref(), Some("Here is your image"));
    }

    #[test]
    fn test_interpret_decodes_inline_image() {
        let response = envelope(json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "Here you go"},
                    {"inlineData": {"mimeType": "image/png", "data": "YWJj"}}
                ]}
            }]
        }));
        let raw = interpret(response, false).unwrap();
        let media = raw.media.unwrap();
        assert_eq!(media.mime_type, "image/png");
        assert_eq!(media.data, Bytes::from_static(b"abc"));
    }

    #[test]
    fn test_interpret_rejects_bad_base64() {
        let response = envelope(json!({
            "candidates": [{
                "content": {"parts": [{"inlineData": {"mimeType": "image/png", "data": "!!!"}}]}
            }]
        }));
        assert!(matches!(
            interpret(response, false),
            Err(GenerationError::Malformed(_))
        ));
    }

    #[test]
    fn test_interpret_blocked_prompt_is_refusal() {
        let response = envelope(json!({"promptFeedback": {"blockReason": "SAFETY"}}));
        assert!(matches!(
            interpret(response, true),
            Err(GenerationError::Refused(_))
        ));
    }

    #[test]
    fn test_interpret_safety_finish_is_refusal() {
        let response = envelope(json!({
            "candidates": [{"content": {"parts": []}, "finishReason": "SAFETY"}]
        }));
        assert!(matches!(
            interpret(response, true),
            Err(GenerationError::Refused(_))
        ));
    }

    #[test]
    fn test_interpret_no_candidates_is_empty() {
        let response = envelope(json!({"candidates": []}));
        assert!(matches!(
            interpret(response, true),
            Err(GenerationError::EmptyContent)
        ));
    }

    #[test]
    fn test_interpret_blank_text_yields_no_output() {
        let response = envelope(json!({
            "candidates": [{"content": {"parts": [{"text": "  "}]}}]
        }));
        let raw = interpret(response, true).unwrap();
        assert_eq!(raw.output, None);
        assert_eq!(raw.text, None);
    }

    mod transport {
        use super::*;
        use wiremock::matchers::{header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        const TEXT_PATH: &str = "/models/gemini-2.0-flash:generateContent";

        fn client(server: &MockServer) -> GeminiClient {
            GeminiClient::new("test-key".to_string(), server.uri()).unwrap()
        }

        fn structured_request() -> GenerationRequest {
            let mut fields = Map::new();
            fields.insert("theme".to_string(), json!("noir"));
            GenerationRequest::structured("Theme: noir", fields, &CONCEPT)
        }

        #[tokio::test]
        async fn test_generate_posts_to_text_model_with_key() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path(TEXT_PATH))
                .and(header("x-goog-api-key", "test-key"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "candidates": [{
                        "content": {"parts": [{"text": "{\"mood\": \"moody\", \"props\": \"umbrella\"}"}]},
                        "finishReason": "STOP"
                    }],
                    "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 8}
                })))
                .expect(1)
                .mount(&server)
                .await;

            let raw = client(&server).generate(&structured_request()).await.unwrap();

            assert_eq!(raw.output, Some(json!({"mood": "moody", "props": "umbrella"})));
        }

        #[tokio::test]
        async fn test_generate_image_mode_uses_image_model() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path(format!("/models/{IMAGE_MODEL}:generateContent")))
                .and(header("x-goog-api-key", "test-key"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "candidates": [{
                        "content": {"parts": [{"inlineData": {"mimeType": "image/png", "data": "YWJj"}}]}
                    }]
                })))
                .expect(1)
                .mount(&server)
                .await;

            let request = GenerationRequest::image("A photo".to_string(), Map::new());
            let raw = client(&server).generate(&request).await.unwrap();

            assert_eq!(raw.media.unwrap().data, Bytes::from_static(b"abc"));
        }

        #[tokio::test]
        async fn test_generate_error_status_uses_envelope_message() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path(TEXT_PATH))
                .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                    "error": {"code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED"}
                })))
                .mount(&server)
                .await;

            let err = client(&server).generate(&structured_request()).await.unwrap_err();

            match err {
                GenerationError::Api { status, message } => {
                    assert_eq!(status, 429);
                    assert_eq!(message, "Resource has been exhausted");
                }
                other => panic!("expected Api error, got {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_generate_error_status_falls_back_to_raw_body() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path(TEXT_PATH))
                .respond_with(ResponseTemplate::new(502).set_body_string("upstream unavailable"))
                .mount(&server)
                .await;

            let err = client(&server).generate(&structured_request()).await.unwrap_err();

            match err {
                GenerationError::Api { status, message } => {
                    assert_eq!(status, 502);
                    assert_eq!(message, "upstream unavailable");
                }
                other => panic!("expected Api error, got {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_generate_unparseable_envelope_is_malformed() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path(TEXT_PATH))
                .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
                .mount(&server)
                .await;

            let err = client(&server).generate(&structured_request()).await.unwrap_err();

            assert!(matches!(err, GenerationError::Malformed(_)));
        }
    }
}
