use crate::config::GeminiConfig;
use crate::models::chat::Turn;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Gemini request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Gemini API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("error decoding Gemini response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Gemini blocked the prompt: {0}")]
    Blocked(String),
    #[error("Gemini returned no text (finish reason: {0})")]
    EmptyResponse(String),
}

/// Boundary to the external text-generation service.
///
/// The model keeps no state between calls, so the full history is sent every time.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    async fn generate_reply(&self, history: &[Turn], message: &str) -> Result<String, GatewayError>;

    /// Name reported by the status endpoint
    fn model_name(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
    pub role: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata")]
    pub usage_metadata: Option<UsageMetadata>,
    #[serde(rename = "promptFeedback")]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
    #[serde(rename = "finishReason")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PromptFeedback {
    #[serde(rename = "blockReason")]
    pub block_reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    pub prompt_token_count: u32,
    #[serde(rename = "candidatesTokenCount", default)]
    pub candidates_token_count: u32,
    #[serde(rename = "totalTokenCount", default)]
    pub total_token_count: u32,
}

impl Content {
    fn text(role: &str, text: &str) -> Self {
        Self {
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
            role: Some(role.to_string()),
        }
    }
}

/// Prior turns in chronological order followed by the new user prompt.
pub fn build_request(history: &[Turn], message: &str) -> GenerateContentRequest {
    let mut contents: Vec<Content> = history
        .iter()
        .map(|turn| Content::text(turn.sender.gemini_role(), &turn.text))
        .collect();
    contents.push(Content::text("user", message));

    GenerateContentRequest { contents }
}

/// Concatenate the text parts of the first candidate.
pub fn extract_reply(response: GenerateContentResponse) -> Result<String, GatewayError> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(GatewayError::Blocked(reason));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| GatewayError::EmptyResponse("no candidates".to_string()))?;

    let text: String = candidate
        .content
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(GatewayError::EmptyResponse(
            candidate.finish_reason.unwrap_or_else(|| "unknown".to_string()),
        ));
    }

    Ok(text)
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Result<Self, GatewayError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GatewayError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        tracing::debug!("Gemini API Request contents count: {}", request.contents.len());

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.without_url()))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| GatewayError::Transport(e.without_url()))?;

        if !status.is_success() {
            tracing::error!("Gemini API error ({}): {}", status, response_text);
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body: response_text,
            });
        }

        tracing::debug!(
            "Gemini API response (truncated): {}...",
            response_text.chars().take(500).collect::<String>()
        );

        let parsed: GenerateContentResponse = serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!("Failed to parse Gemini response: {}", e);
            GatewayError::Decode(e)
        })?;

        if let Some(usage) = &parsed.usage_metadata {
            tracing::debug!(
                "Gemini usage: prompt={} completion={} total={}",
                usage.prompt_token_count,
                usage.candidates_token_count,
                usage.total_token_count
            );
        }

        Ok(parsed)
    }
}

#[async_trait]
impl ModelGateway for GeminiClient {
    async fn generate_reply(&self, history: &[Turn], message: &str) -> Result<String, GatewayError> {
        let request = build_request(history, message);
        let response = self.generate_content(&request).await?;
        extract_reply(response)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
