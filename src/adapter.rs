//! Provider adapter implementations

use super::{message::Message, profile::ProviderProfile, Error, MessageRole, Result};
use reqwest::{Client as HttpClient, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Maximum retry attempts for rate-limited requests (HTTP 429)
const MAX_RETRIES: u32 = 3;

/// Output token limit sent on every Anthropic request
pub const ANTHROPIC_MAX_TOKENS: u32 = 1000;

/// Label placed in front of the user prompt when a system prompt is folded
/// into a single Google request
const GOOGLE_USER_LABEL: &str = "用户: ";

/// Build an HTTP client with specified timeout
pub(crate) fn build_http_client(timeout: Duration) -> std::result::Result<HttpClient, reqwest::Error> {
    HttpClient::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .build()
}

/// Calculate delay for retry attempt using exponential backoff
fn retry_delay(attempt: u32) -> Duration {
    // Exponential backoff from attempt 0: 1s, 2s, 4s
    let base_secs = 1u64 << attempt.min(4); // Cap at 16s base
    Duration::from_secs(base_secs)
}

/// Send a request, retrying on HTTP 429, and return the body of a successful
/// response.
async fn send_with_retry(request: RequestBuilder, provider: &str) -> Result<String> {
    let mut attempt = 0;
    loop {
        let response = request
            .try_clone()
            .ok_or_else(|| Error::Api(format!("{} request body cannot be replayed", provider)))?
            .send()
            .await?;

        let status = response.status();

        if status.as_u16() == 429 && attempt < MAX_RETRIES {
            let delay = retry_delay(attempt);
            attempt += 1;
            tracing::warn!(
                "{} rate limited (429), retrying in {:?} (attempt {}/{})",
                provider, delay, attempt, MAX_RETRIES
            );
            tokio::time::sleep(delay).await;
            continue;
        }

        let body = response.text().await?;

        if !status.is_success() {
            return Err(Error::Api(format!("{} API error ({}): {}", provider, status, body)));
        }

        return Ok(body);
    }
}

/// Uniform calling contract over one provider family
#[async_trait::async_trait]
pub trait Adapter: Send + Sync {
    /// Send `prompt` (with an optional system prompt) to the endpoint described
    /// by `profile` and return the answer text.
    async fn invoke(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        profile: &ProviderProfile,
    ) -> Result<String>;
}

/// OpenAI chat-completions adapter, also used for OpenAI-compatible endpoints
pub struct OpenAIAdapter {
    http_client: HttpClient,
    default_base: String,
}

impl OpenAIAdapter {
    /// Create a new OpenAI adapter
    pub fn new(http_client: HttpClient, default_base: impl Into<String>) -> Self {
        OpenAIAdapter {
            http_client,
            default_base: default_base.into(),
        }
    }
}

#[async_trait::async_trait]
impl Adapter for OpenAIAdapter {
    async fn invoke(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        profile: &ProviderProfile,
    ) -> Result<String> {
        let base = profile.api_base().unwrap_or(self.default_base.as_str());
        let url = format!("{}/chat/completions", base.trim_end_matches('/'));

        let request = ChatRequest {
            model: profile.model.clone(),
            messages: Message::sequence(prompt, system_prompt),
            temperature: profile.temperature(),
            max_tokens: profile.max_tokens(),
        };

        tracing::debug!("POST {} (model: {})", url, profile.model);

        let body = send_with_retry(
            self.http_client
                .post(&url)
                .header("Authorization", format!("Bearer {}", profile.api_key))
                .json(&request),
            "OpenAI",
        )
        .await?;

        let response: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Api(format!("Failed to parse OpenAI response: {}. Body: {}", e, body)))?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Api("No choices in OpenAI response".to_string()))?;

        choice
            .message
            .content
            .ok_or_else(|| Error::Api("OpenAI response choice has no message content".to_string()))
    }
}

/// Anthropic messages adapter
pub struct AnthropicAdapter {
    http_client: HttpClient,
    base: String,
}

impl AnthropicAdapter {
    /// Create a new Anthropic adapter
    pub fn new(http_client: HttpClient, base: impl Into<String>) -> Self {
        AnthropicAdapter {
            http_client,
            base: base.into(),
        }
    }
}

#[async_trait::async_trait]
impl Adapter for AnthropicAdapter {
    async fn invoke(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        profile: &ProviderProfile,
    ) -> Result<String> {
        let url = format!("{}/v1/messages", self.base.trim_end_matches('/'));

        // The messages endpoint takes the system prompt as a top-level field
        let (system, others): (Vec<_>, Vec<_>) = Message::sequence(prompt, system_prompt)
            .into_iter()
            .partition(|m| m.role == MessageRole::System);

        let request = AnthropicMessageRequest {
            model: profile.model.clone(),
            messages: others,
            system: system.into_iter().next().map(|m| m.content),
            max_tokens: ANTHROPIC_MAX_TOKENS,
        };

        tracing::debug!("POST {} (model: {})", url, profile.model);

        let body = send_with_retry(
            self.http_client
                .post(&url)
                .header("x-api-key", profile.api_key.clone())
                .header("anthropic-version", "2023-06-01")
                .header("content-type", "application/json")
                .json(&request),
            "Anthropic",
        )
        .await?;

        let response: AnthropicMessageResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Api(format!("Failed to parse Anthropic response: {}. Body: {}", e, body)))?;

        response
            .content
            .into_iter()
            .next()
            .ok_or_else(|| Error::Api("Anthropic response contained no content blocks".to_string()))?
            .text
            .ok_or_else(|| Error::Api("Anthropic content block has no text".to_string()))
    }
}

/// Google generative language adapter
pub struct GoogleAdapter {
    http_client: HttpClient,
    base: String,
}

impl GoogleAdapter {
    /// Create a new Google adapter
    pub fn new(http_client: HttpClient, base: impl Into<String>) -> Self {
        GoogleAdapter {
            http_client,
            base: base.into(),
        }
    }
}

/// Fold the system prompt into the single text a Google request carries
pub(crate) fn google_prompt(prompt: &str, system_prompt: Option<&str>) -> String {
    match system_prompt.filter(|s| !s.is_empty()) {
        Some(system) => format!("{}\n\n{}{}", system, GOOGLE_USER_LABEL, prompt),
        None => prompt.to_string(),
    }
}

#[async_trait::async_trait]
impl Adapter for GoogleAdapter {
    async fn invoke(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        profile: &ProviderProfile,
    ) -> Result<String> {
        let model = profile.model.trim_start_matches("models/");
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base.trim_end_matches('/'),
            model
        );

        let request = GenerateContentRequest {
            contents: vec![GoogleContent {
                parts: vec![GooglePart {
                    text: Some(google_prompt(prompt, system_prompt)),
                }],
            }],
        };

        tracing::debug!("POST {} (model: {})", url, model);

        let body = send_with_retry(
            self.http_client
                .post(&url)
                .header("x-goog-api-key", profile.api_key.clone())
                .json(&request),
            "Google",
        )
        .await?;

        let response: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Api(format!("Failed to parse Google response: {}. Body: {}", e, body)))?;

        let content = response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .ok_or_else(|| Error::Api(format!("No candidates in Google response. Body: {}", body)))?;

        let texts: Vec<String> = content.parts.into_iter().filter_map(|part| part.text).collect();
        if texts.is_empty() {
            return Err(Error::Api("Google response candidate has no text parts".to_string()));
        }
        Ok(texts.concat())
    }
}

// OpenAI types

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

// Anthropic types

#[derive(Debug, Serialize)]
struct AnthropicMessageRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct AnthropicMessageResponse {
    #[serde(default)]
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    #[serde(default)]
    text: Option<String>,
}

// Google types

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<GoogleContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GoogleContent {
    #[serde(default)]
    parts: Vec<GooglePart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GooglePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<GoogleCandidate>,
}

#[derive(Debug, Deserialize)]
struct GoogleCandidate {
    #[serde(default)]
    content: Option<GoogleContent>,
}
