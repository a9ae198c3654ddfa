// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Language-model client shared by the text capabilities.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_LLM_API_URL: &str = "https://api.openai.com";
pub const DEFAULT_LLM_MODEL: &str = "gpt-3.5-turbo";

/// One chat completion: a system instruction plus a user prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("language model not configured: {0}")]
    MissingConfig(String),

    #[error("language model request failed: {0}")]
    Request(String),

    #[error("language model response was invalid: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Return the completion text.
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;
}

// =============================================================================
// OpenAI-compatible chat completions
// =============================================================================

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Client for `POST {base}/v1/chat/completions`.
#[derive(Debug, Clone)]
pub struct OpenAiChatClient {
    base_url: String,
    api_key: Option<String>,
    model: String,
    http: Client,
}

impl OpenAiChatClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
            http,
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAiChatClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| LlmError::MissingConfig("LLM_API_KEY".to_string()))?;

        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Request(format!("POST chat/completions failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Request(format!(
                "chat/completions returned {status}: {body}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("invalid JSON: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("no completion choices".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, routing::post, Json, Router};
    use serde_json::{json, Value};

    async fn fake_llm(reply: Value) -> String {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move |headers: HeaderMap, Json(req): Json<Value>| {
                let reply = reply.clone();
                async move {
                    assert_eq!(headers["authorization"], "Bearer test-key");
                    assert_eq!(req["model"], "test-model");
                    assert_eq!(req["messages"][0]["role"], "system");
                    assert_eq!(req["messages"][1]["content"], "Say hi");
                    Json(reply)
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/")
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            system: "Be brief.".into(),
            prompt: "Say hi".into(),
            temperature: 0.3,
            max_tokens: 16,
        }
    }

    #[tokio::test]
    async fn returns_first_choice() {
        let url = fake_llm(json!({"choices": [{"message": {"role": "assistant", "content": "hi"}}]})).await;
        let client = OpenAiChatClient::new(&url, Some("test-key".into()), "test-model", Duration::from_secs(5))
            .unwrap();
        assert_eq!(client.complete(request()).await.unwrap(), "hi");
    }

    #[tokio::test]
    async fn empty_choices_is_invalid() {
        let url = fake_llm(json!({"choices": []})).await;
        let client = OpenAiChatClient::new(&url, Some("test-key".into()), "test-model", Duration::from_secs(5))
            .unwrap();
        assert!(matches!(
            client.complete(request()).await,
            Err(LlmError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn missing_api_key_fails_without_request() {
        let client = OpenAiChatClient::new("http://127.0.0.1:9", None, "m", Duration::from_secs(1)).unwrap();
        assert!(matches!(
            client.complete(request()).await,
            Err(LlmError::MissingConfig(_))
        ));
    }
}
