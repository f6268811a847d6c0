//! Mock HTTP servers for testing provider adapters offline
//!
//! wiremock-based stand-ins for the OpenAI, Anthropic and Google APIs, so
//! tests run without real API keys.

use serde_json::Value;
use std::time::Duration;
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn chat_completion(content: &str) -> Value {
    serde_json::json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "created": 1234567890,
        "model": "gpt-4o",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": content
            },
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": 10,
            "completion_tokens": 5,
            "total_tokens": 15
        }
    })
}

fn anthropic_message(content: &str) -> Value {
    serde_json::json!({
        "id": "msg-mock",
        "type": "message",
        "role": "assistant",
        "content": [{
            "type": "text",
            "text": content
        }],
        "stop_reason": "end_turn",
        "model": "claude-3-5-sonnet",
        "usage": {
            "input_tokens": 10,
            "output_tokens": 5
        }
    })
}

fn generate_content(content: &str) -> Value {
    serde_json::json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [{"text": content}]
            },
            "finishReason": "STOP"
        }]
    })
}

/// OpenAI mock server for testing
pub struct OpenAIMockServer {
    server: MockServer,
}

impl OpenAIMockServer {
    /// Create a new OpenAI mock server
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        Self { server }
    }

    /// Get the base URL of this mock server
    pub fn base_url(&self) -> String {
        self.server.uri()
    }

    /// Setup a mock response for chat completion
    pub async fn mock_chat_completion(&self, content: &str) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion(content)))
            .mount(&self.server)
            .await;
    }

    /// Answer only requests bearing `api_key` whose body contains `expected`
    pub async fn expect_chat_body(&self, api_key: &str, expected: Value, content: &str) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", format!("Bearer {}", api_key).as_str()))
            .and(body_partial_json(expected))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion(content)))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Answer after a fixed delay
    pub async fn mock_delayed(&self, content: &str, delay: Duration) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(chat_completion(content))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    /// Reject the first request with 429, then answer normally
    pub async fn mock_rate_limited_once(&self, content: &str) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"message": "rate limited", "type": "rate_limit_error"}
            })))
            .up_to_n_times(1)
            .expect(1)
            .mount(&self.server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion(content)))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Fail every request with `status`
    pub async fn mock_error(&self, status: u16, message: &str) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(status).set_body_json(serde_json::json!({
                "error": {"message": message, "type": "invalid_request_error"}
            })))
            .mount(&self.server)
            .await;
    }
}

/// Anthropic mock server for testing
pub struct AnthropicMockServer {
    server: MockServer,
}

impl AnthropicMockServer {
    /// Create a new Anthropic mock server
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        Self { server }
    }

    /// Get the base URL of this mock server
    pub fn base_url(&self) -> String {
        self.server.uri()
    }

    /// Setup a mock response for a message
    pub async fn mock_message(&self, content: &str) {
        self.mock_raw(anthropic_message(content)).await;
    }

    /// Answer only requests bearing `api_key` whose body contains `expected`
    pub async fn expect_message_body(&self, api_key: &str, expected: Value, content: &str) {
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", api_key))
            .and(header("anthropic-version", "2023-06-01"))
            .and(body_partial_json(expected))
            .respond_with(ResponseTemplate::new(200).set_body_json(anthropic_message(content)))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Respond with an arbitrary JSON body
    pub async fn mock_raw(&self, body: Value) {
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }
}

/// Google generative language mock server for testing
pub struct GoogleMockServer {
    server: MockServer,
}

impl GoogleMockServer {
    /// Create a new Google mock server
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        Self { server }
    }

    /// Get the base URL of this mock server
    pub fn base_url(&self) -> String {
        self.server.uri()
    }

    /// Setup a mock response for `model`
    pub async fn mock_generate(&self, model: &str, content: &str) {
        self.mock_raw(model, generate_content(content)).await;
    }

    /// Answer only requests for `model` bearing `api_key` whose body contains `expected`
    pub async fn expect_generate(&self, model: &str, api_key: &str, expected: Value, content: &str) {
        Mock::given(method("POST"))
            .and(path(format!("/v1beta/models/{}:generateContent", model)))
            .and(header("x-goog-api-key", api_key))
            .and(body_partial_json(expected))
            .respond_with(ResponseTemplate::new(200).set_body_json(generate_content(content)))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Respond to `model` with an arbitrary JSON body
    pub async fn mock_raw(&self, model: &str, body: Value) {
        Mock::given(method("POST"))
            .and(path(format!("/v1beta/models/{}:generateContent", model)))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }
}
