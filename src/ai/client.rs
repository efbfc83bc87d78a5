use std::collections::VecDeque;
use std::sync::Mutex;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::model::config::AiConfig;

const MESSAGE_INVALID_KEY: &str =
    "CRITICAL FAILURE: API KEY INVALID. PLEASE UPDATE CREDENTIALS IN IDENTITY.";
const MESSAGE_QUOTA: &str = "SYSTEM OVERLOAD: API QUOTA EXCEEDED. TRY AGAIN LATER.";
const MESSAGE_MISSING_KEY: &str = "SYSTEM ERROR: No API Key found in Identity Module.";

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("no model API key configured (run `nova ai key <KEY>` or set NOVA_GEMINI_API_KEY)")]
    MissingKey,
    #[error("model API rejected the key: {0}")]
    InvalidKey(String),
    #[error("model API quota exceeded: {0}")]
    Quota(String),
    #[error("model API returned {status}: {body}")]
    Http { status: u16, body: String },
    #[error("model API request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("model API returned no text")]
    EmptyResponse,
}

impl AiError {
    /// Sort an HTTP failure into key, quota or generic errors
    pub fn classify(status: u16, body: String) -> AiError {
        let lower = body.to_lowercase();
        if status == 400
            || lower.contains("invalid argument")
            || lower.contains("key not valid")
            || lower.contains("api_key_invalid")
        {
            AiError::InvalidKey(body)
        } else if status == 429 || lower.contains("quota") || lower.contains("exhausted") {
            AiError::Quota(body)
        } else {
            AiError::Http { status, body }
        }
    }

    /// Credential problems need the user; retrying will not help
    pub fn is_blocking(&self) -> bool {
        matches!(self, AiError::MissingKey | AiError::InvalidKey(_))
    }

    /// The fixed line shown in place of a model answer
    pub fn user_message(&self) -> String {
        match self {
            AiError::MissingKey => MESSAGE_MISSING_KEY.to_string(),
            AiError::InvalidKey(_) => MESSAGE_INVALID_KEY.to_string(),
            AiError::Quota(_) => MESSAGE_QUOTA.to_string(),
            other => {
                let text = other.to_string().to_lowercase();
                let head: String = text.chars().take(60).collect();
                format!("PROCESSING ERROR: {}...", head)
            }
        }
    }
}

/// Image sent alongside a prompt
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub mime_type: String,
    /// Base64 without any `data:` prefix
    pub data: String,
}

impl InlineImage {
    pub fn from_bytes(bytes: &[u8], mime_type: &str) -> Self {
        InlineImage {
            mime_type: mime_type.to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    /// Accept either raw base64 or a `data:<mime>;base64,<data>` URL
    pub fn from_base64(input: &str, mime_type: &str) -> Self {
        let data = match input.split_once("base64,") {
            Some((_, rest)) => rest,
            None => input,
        };
        InlineImage {
            mime_type: mime_type.to_string(),
            data: data.trim().to_string(),
        }
    }
}

/// One request/response exchange with the model
#[derive(Debug, Clone, PartialEq)]
pub struct AiRequest {
    pub prompt: String,
    pub image: Option<InlineImage>,
}

impl AiRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        AiRequest {
            prompt: prompt.into(),
            image: None,
        }
    }

    pub fn with_image(prompt: impl Into<String>, image: InlineImage) -> Self {
        AiRequest {
            prompt: prompt.into(),
            image: Some(image),
        }
    }
}

#[async_trait::async_trait]
pub trait AiProvider: Send + Sync {
    async fn generate(&self, request: &AiRequest) -> Result<String, AiError>;
}

#[derive(Serialize)]
struct GenerateBody<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Serialize)]
struct InlineData<'a> {
    #[serde(rename = "mimeType")]
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// `generateContent` client for the Gemini API
pub struct GeminiClient {
    endpoint: String,
    model: String,
    api_key: String,
    http: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: &AiConfig, api_key: &str) -> Result<Self, AiError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(AiError::MissingKey);
        }
        Ok(GeminiClient {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: api_key.to_string(),
            http: reqwest::Client::new(),
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        )
    }
}

fn request_body(request: &AiRequest) -> GenerateBody<'_> {
    let mut parts = Vec::with_capacity(2);
    if let Some(image) = &request.image {
        parts.push(Part::Inline {
            inline_data: InlineData {
                mime_type: &image.mime_type,
                data: &image.data,
            },
        });
    }
    parts.push(Part::Text {
        text: &request.prompt,
    });
    GenerateBody {
        contents: vec![Content { parts }],
    }
}

fn response_text(response: GenerateResponse) -> Option<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect();
    (!text.trim().is_empty()).then_some(text)
}

#[async_trait::async_trait]
impl AiProvider for GeminiClient {
    async fn generate(&self, request: &AiRequest) -> Result<String, AiError> {
        tracing::debug!(model = %self.model, image = request.image.is_some(), "model request");
        let response = self
            .http
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            let err = AiError::classify(status.as_u16(), body);
            tracing::warn!(error = %err, "model request failed");
            return Err(err);
        }
        let parsed: GenerateResponse = response.json().await?;
        response_text(parsed).ok_or(AiError::EmptyResponse)
    }
}

/// Replays canned answers in order; records every prompt it was sent.
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, AiError>>>,
    seen: Mutex<Vec<AiRequest>>,
}

impl ScriptedProvider {
    pub fn new(replies: impl IntoIterator<Item = Result<String, AiError>>) -> Self {
        ScriptedProvider {
            replies: Mutex::new(replies.into_iter().collect()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(text: &str) -> Self {
        Self::new([Ok(text.to_string())])
    }

    pub fn requests(&self) -> Vec<AiRequest> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl AiProvider for ScriptedProvider {
    async fn generate(&self, request: &AiRequest) -> Result<String, AiError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(request.clone());
        }
        self.replies
            .lock()
            .ok()
            .and_then(|mut r| r.pop_front())
            .unwrap_or(Err(AiError::EmptyResponse))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn classify_matches_key_and_quota_failures() {
        assert!(matches!(
            AiError::classify(400, "API key not valid".into()),
            AiError::InvalidKey(_)
        ));
        assert!(matches!(
            AiError::classify(403, "Resource has been exhausted".into()),
            AiError::Quota(_)
        ));
        assert!(matches!(AiError::classify(429, String::new()), AiError::Quota(_)));
        assert!(matches!(
            AiError::classify(500, "boom".into()),
            AiError::Http { status: 500, .. }
        ));
    }

    #[test]
    fn user_messages_are_fixed_or_truncated() {
        assert_eq!(
            AiError::InvalidKey(String::new()).user_message(),
            MESSAGE_INVALID_KEY
        );
        assert_eq!(AiError::Quota(String::new()).user_message(), MESSAGE_QUOTA);
        let long = AiError::Http {
            status: 500,
            body: "x".repeat(200),
        };
        let msg = long.user_message();
        assert!(msg.starts_with("PROCESSING ERROR: model api returned 500: "));
        assert_eq!(msg.len(), "PROCESSING ERROR: ".len() + 60 + 3);
        assert!(AiError::MissingKey.is_blocking());
        assert!(!AiError::EmptyResponse.is_blocking());
    }

    #[test]
    fn blank_key_is_rejected() {
        assert!(matches!(
            GeminiClient::new(&AiConfig::default(), "  "),
            Err(AiError::MissingKey)
        ));
    }

    #[test]
    fn request_body_puts_image_first() {
        let req = AiRequest::with_image("look", InlineImage::from_base64("data:image/jpeg;base64,QUJD", "image/jpeg"));
        let json = serde_json::to_value(request_body(&req)).unwrap();
        insta::assert_snapshot!(
            json.to_string(),
            @r#"{"contents":[{"parts":[{"inlineData":{"data":"QUJD","mimeType":"image/jpeg"}},{"text":"look"}]}]}"#
        );
    }

    #[test]
    fn response_text_joins_parts() {
        let parsed: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"a"},{"text":"b"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(response_text(parsed).as_deref(), Some("ab"));
        let empty: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(response_text(empty).is_none());
    }

    #[test]
    fn inline_image_encodes_bytes() {
        assert_eq!(InlineImage::from_bytes(b"ABC", "image/png").data, "QUJD");
    }
}
