//! LLM Provider implementations and factory
//!
//! Ollama lives in `llm::ollama`; hosted providers are submodules here.

pub mod groq;

use std::sync::Arc;

use crate::core::config::{Config, ProviderType};
use crate::core::Result;
use crate::llm::traits::LLMProvider;
use crate::llm::OllamaClient;

use self::groq::GroqProvider;

/// Create a new LLM provider based on configuration
pub fn create_provider(config: &Config) -> Result<Arc<dyn LLMProvider>> {
    let provider: Arc<dyn LLMProvider> = match config.provider {
        ProviderType::Ollama => Arc::new(OllamaClient::from_config(config)?),
        ProviderType::Groq => Arc::new(GroqProvider::from_config(config)?),
    };
    Ok(provider)
}
