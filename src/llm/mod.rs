//! LLM module - Language Model integrations
//!
//! Provider abstraction (Ollama, Groq) and the LLM-backed decision policy.

pub mod ollama;
pub mod policy;
pub mod prompts;
pub mod provider;
pub mod traits;

pub use ollama::OllamaClient;
pub use policy::{parse_decision, LlmPolicy};
pub use provider::create_provider;
pub use traits::{GenerateOptions, LLMProvider, LLMResponse, TokenUsage};
