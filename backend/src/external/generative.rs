//! Generative text service client
//!
//! A uniform `generate(template, structured input) -> text` contract over any
//! OpenAI-compatible chat completions endpoint. Replies must be a JSON object
//! carrying a non-empty `text` field.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::truncate;
use crate::config::GenerationConfig;

const SYSTEM_PROMPT: &str = "You are an environmental analyst writing for a general audience. \
Be concrete and brief (at most four sentences). \
Reply only with a JSON object of the form {\"text\": \"...\"}.";

/// One generation call
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    pub template_id: &'static str,
    /// Instruction template with the input already interpolated
    pub prompt: String,
    /// The same input in structured form, sent alongside the prompt
    pub input: serde_json::Value,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenerationError {
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("provider error ({status:?}): {message}")]
    Provider { status: Option<u16>, message: String },

    #[error("response failed schema validation: {0}")]
    SchemaMismatch(String),

    #[error("generation service not configured")]
    Unconfigured,

    #[error("transport error: {0}")]
    Transport(String),
}

impl GenerationError {
    /// Whether another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            GenerationError::Timeout(_) | GenerationError::Transport(_) => true,
            GenerationError::Provider { status, .. } => {
                matches!(status, None | Some(429) | Some(500..=599))
            }
            GenerationError::SchemaMismatch(_) | GenerationError::Unconfigured => false,
        }
    }
}

/// Outcome of one generation task
pub type GenerationOutcome = Result<String, GenerationError>;

/// External generative text service
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Backend identifier, e.g. the model name
    fn id(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> GenerationOutcome;
}

/// Backend used when no endpoint is configured; every call fails
#[derive(Debug, Default, Clone)]
pub struct UnconfiguredGenerator;

#[async_trait]
impl TextGenerator for UnconfiguredGenerator {
    fn id(&self) -> &str {
        "unconfigured"
    }

    async fn generate(&self, _request: &GenerationRequest) -> GenerationOutcome {
        Err(GenerationError::Unconfigured)
    }
}

/// OpenAI-compatible backend (OpenAI, vLLM, Ollama, LocalAI...)
#[derive(Clone)]
pub struct OpenAiCompatibleGenerator {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Output schema every reply must satisfy
#[derive(Debug, Deserialize)]
struct GeneratedText {
    text: String,
}

impl OpenAiCompatibleGenerator {
    pub fn new(config: &GenerationConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            model: config.model.clone(),
            timeout: config.timeout(),
        }
    }

    /// Create a generator against a custom endpoint (for testing)
    pub fn with_base_url(base_url: String, model: &str, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key: None,
            model: model.to_string(),
            timeout,
        }
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

/// Validate a reply body against the output schema
pub fn extract_text(content: &str) -> GenerationOutcome {
    let parsed: GeneratedText = serde_json::from_str(content.trim())
        .map_err(|e| GenerationError::SchemaMismatch(format!("{}: {}", e, truncate(content, 120))))?;

    let text = parsed.text.trim();
    if text.is_empty() {
        return Err(GenerationError::SchemaMismatch("empty text field".to_string()));
    }
    Ok(text.to_string())
}

#[async_trait]
impl TextGenerator for OpenAiCompatibleGenerator {
    fn id(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> GenerationOutcome {
        let structured = format!(
            "Template: {}\nMeasurements (JSON): {}",
            request.template_id, request.input
        );
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &structured,
                },
            ],
            temperature: 0.4,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let mut http = self
            .client
            .post(self.chat_completions_url())
            .timeout(self.timeout)
            .json(&body);
        if let Some(key) = &self.api_key {
            http = http.header(header::AUTHORIZATION, format!("Bearer {}", key));
        }

        let response = http.send().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout(self.timeout)
            } else {
                GenerationError::Transport(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::Provider {
                status: Some(status),
                message: truncate(&message, 200),
            });
        }

        let data: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::SchemaMismatch(e.to_string()))?;

        let content = data
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GenerationError::SchemaMismatch("no completion content".to_string()))?;

        extract_text(&content)
    }
}
