//! Ollama local LLM integration.
//!
//! Implements the PromptBackend trait for a local Ollama instance.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{system_prompt, PromptBackend, PromptError};
use crate::exec::CancelToken;
use crate::notebook::CellOptions;

/// Ollama backend for local models.
pub struct OllamaBackend {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaBackend {
    /// Create a new Ollama backend with default settings.
    ///
    /// Uses localhost:11434 by default.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: std::env::var("OLLAMA_HOST")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            model: std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string()),
        }
    }

    /// Use a specific base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Use a specific model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Make a request to the Ollama API.
    async fn request(&self, system: &str, prompt: &str) -> anyhow::Result<String> {
        let request = OllamaRequest {
            model: self.model.clone(),
            system: system.to_string(),
            prompt: prompt.to_string(),
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PromptError::ApiError(format!("{status}: {body}")).into());
        }

        let response: OllamaResponse = response.json().await?;
        Ok(response.response)
    }
}

impl Default for OllamaBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PromptBackend for OllamaBackend {
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
        "ollama"
    }

    async fn is_available(&self) -> bool {
        self.client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(std::time::Duration::from_secs(2))
            .send()
            .await
            .is_ok()
    }
}

/// Ollama API request structure.
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    system: String,
    prompt: String,
    stream: bool,
}

/// Ollama API response structure.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_creation() {
        let backend = OllamaBackend::new();
        assert_eq!(backend.name(), "ollama");
    }

    #[test]
    fn test_custom_url_and_model() {
        let backend =
            OllamaBackend::new().with_base_url("http://custom:8080").with_model("codellama");

        assert_eq!(backend.base_url, "http://custom:8080");
        assert_eq!(backend.model, "codellama");
    }
}
