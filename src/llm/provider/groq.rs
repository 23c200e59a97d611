//! Groq Provider
//!
//! OpenAI-compatible chat completions against the Groq API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::core::{Config, Message, Result, ScoutError};
use crate::llm::traits::{GenerateOptions, LLMProvider, LLMResponse, TokenUsage};

pub struct GroqProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    model: String,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
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

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

impl GroqProvider {
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.groq.api_key.clone().ok_or_else(|| {
            ScoutError::config("GROQ_API_KEY is missing via .env or environment variable")
        })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.groq.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.groq.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn build_request<'a>(
        model: &'a str,
        messages: &'a [Message],
        options: Option<GenerateOptions>,
    ) -> CompletionRequest<'a> {
        let options = options.unwrap_or_default();
        CompletionRequest {
            model,
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            response_format: options.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        }
    }

    fn to_llm_response(model: &str, response: CompletionResponse) -> Result<LLMResponse> {
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ScoutError::llm("Groq response had no choices"))?;

        Ok(LLMResponse {
            content,
            usage: response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            model: if response.model.is_empty() {
                model.to_string()
            } else {
                response.model
            },
        })
    }
}

#[async_trait]
impl LLMProvider for GroqProvider {
    async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        let request = Self::build_request(model, messages, options);
        debug!(model, messages = messages.len(), "Groq request");

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            if status.as_u16() == 404 && error_text.contains("model") {
                return Err(ScoutError::ModelNotFound(model.to_string()));
            }
            return Err(ScoutError::llm(format!(
                "Groq API error ({}): {}",
                status, error_text
            )));
        }

        let response: CompletionResponse = resp.json().await?;
        Self::to_llm_response(model, response)
    }

    async fn is_model_available(&self, model: &str) -> Result<bool> {
        Ok(self.list_models().await?.iter().any(|m| m == model))
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let resp = self
            .client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ScoutError::llm("Failed to list Groq models"));
        }

        let models: ModelsResponse = resp.json().await?;
        Ok(models.data.into_iter().map(|m| m.id).collect())
    }

    fn name(&self) -> &str {
        "groq"
    }
}
