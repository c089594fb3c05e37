use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

const PROMPT_TEMPLATE: &str = r#"You turn requests for places into search parameters.
Reply with only a JSON object of the form
{"type": "<kind of place, e.g. restaurant, park, hotel>", "location": "<city or area>", "keywords": "<comma separated extra terms>"}
Do not add any other text.

Request: "#;

/// Wraps the user's query in the fixed instruction template.
pub fn build_prompt(query: &str) -> String {
    format!("{PROMPT_TEMPLATE}{query}")
}

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider error: {0}")]
    Provider(String),
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    error: Option<String>,
}

/// Client for a locally hosted Ollama model.
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: Client,
}

impl OllamaClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let model = model.into();
        info!("Ollama client initialized (model={}, url={})", model, base_url);
        Ok(Self {
            base_url,
            model,
            client: Client::builder().timeout(timeout).build()?,
        })
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            format: "json",
        };
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<GenerateResponse>()
            .await?;
        if let Some(error) = response.error {
            return Err(LlmError::Provider(error));
        }
        debug!(len = response.response.len(), "model responded");
        Ok(response.response)
    }
}
