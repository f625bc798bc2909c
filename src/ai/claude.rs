//! Claude API integration.
//!
//! Implements the PromptBackend trait for Claude.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{system_prompt, PromptBackend, PromptError};
use crate::exec::CancelToken;
use crate::notebook::CellOptions;

/// Claude API backend.
pub struct ClaudeBackend {
    client: Client,
    api_key: String,
    model: String,
}

impl ClaudeBackend {
    /// Create a new Claude backend.
    ///
    /// Reads the API key from the ANTHROPIC_API_KEY environment variable.
    pub fn new() -> anyhow::Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| anyhow::anyhow!("ANTHROPIC_API_KEY not set"))?;

        Ok(Self { client: Client::new(), api_key, model: "claude-sonnet-4-20250514".to_string() })
    }

    /// Use a specific model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Make a request to the Claude API.
    async fn request(&self, system: &str, prompt: &str) -> anyhow::Result<String> {
        let request = ClaudeRequest {
            model: self.model.clone(),
            max_tokens: 4096,
            system: system.to_string(),
            messages: vec![Message { role: "user".to_string(), content: prompt.to_string() }],
        };

        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PromptError::ApiError(format!("{status}: {body}")).into());
        }

        let response: ClaudeResponse = response.json().await?;

        response
            .content
            .first()
            .map(|block| block.text.clone())
            .ok_or_else(|| PromptError::NoResponse.into())
    }
}

#[async_trait]
impl PromptBackend for ClaudeBackend {
    async fn complete(
        &self,
        prompt: &str,
        options: &CellOptions,
        cancel: &CancelToken,
    ) -> anyhow::Result<String> {
        let system = system_prompt(options);

        tokio::select! {
            response = self.request(&system, prompt) => response,
            () = cancel.cancelled() => Err(PromptError::Cancelled.into()),
        }
    }

    fn name(&self) -> &str {
        "claude"
    }

    async fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// Claude API request structure.
#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<Message>,
}

/// Message in a Claude request.
#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

/// Claude API response structure.
#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ContentBlock>,
}

/// Content block in a Claude response.
#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creation_fails_without_key() {
        std::env::remove_var("ANTHROPIC_API_KEY");
        assert!(ClaudeBackend::new().is_err());
    }

    #[test]
    fn test_request_serialization_shape() {
        let request = ClaudeRequest {
            model: "m".to_string(),
            max_tokens: 16,
            system: "s".to_string(),
            messages: vec![Message { role: "user".to_string(), content: "hi".to_string() }],
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["max_tokens"], 16);
    }
}
