//! LLM-backed decision policy
//!
//! Sends the snapshot and recent steps to a provider and reads back a JSON
//! decision. Replies are parsed leniently (code fences, surrounding prose,
//! numeric strings) but anything without a JSON object is `Malformed`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use crate::agent::decision::{Decision, DecisionPolicy};
use crate::agent::history::StepRecord;
use crate::agent::observer::{truncate_chars, Snapshot};
use crate::core::{Config, DecisionError};
use crate::llm::prompts;
use crate::llm::traits::{GenerateOptions, LLMProvider};

/// Raw reply chars kept in a `Malformed` error
const RAW_EXCERPT_CHARS: usize = 500;

#[derive(Debug, Deserialize)]
struct RawDecision {
    #[serde(default)]
    page_summary: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    next_action: Option<RawAction>,
    #[serde(default, alias = "confidence")]
    confidence_score: Option<Value>,
    #[serde(default)]
    potential_issues: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAction {
    #[serde(default, rename = "type", alias = "action_type")]
    kind: Option<String>,
    #[serde(default, alias = "target_selector", alias = "target")]
    target_description: Option<String>,
    #[serde(default, alias = "input_text")]
    input_value: Option<String>,
    #[serde(default, alias = "description")]
    reason: Option<String>,
}

impl RawDecision {
    fn into_decision(self) -> Decision {
        let action = self.next_action.unwrap_or_default();
        Decision {
            action_type: action.kind,
            target_description: action.target_description,
            input_value: action.input_value,
            reason: action.reason,
            reasoning: self.reasoning.unwrap_or_default(),
            confidence: self.confidence_score.as_ref().and_then(number),
            potential_issues: self.potential_issues.map(string_list).unwrap_or_default(),
            page_summary: self.page_summary,
            failure: None,
        }
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn string_list(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        Value::String(s) if !s.trim().is_empty() => vec![s],
        _ => Vec::new(),
    }
}

/// The JSON object inside a reply: fences stripped, first `{` to last `}`
pub fn extract_json_object(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

/// Parse a model reply into a `Decision`
pub fn parse_decision(reply: &str) -> Result<Decision, DecisionError> {
    let malformed = |reason: String| DecisionError::Malformed {
        reason,
        raw: truncate_chars(reply, RAW_EXCERPT_CHARS),
    };

    let json = extract_json_object(reply)
        .ok_or_else(|| malformed("no JSON object in reply".to_string()))?;
    let raw: RawDecision =
        serde_json::from_str(json).map_err(|e| malformed(e.to_string()))?;
    Ok(raw.into_decision())
}

/// Asks an LLM provider for each decision
pub struct LlmPolicy {
    provider: Arc<dyn LLMProvider>,
    model: String,
    temperature: f32,
}

impl LlmPolicy {
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
        }
    }

    pub fn from_config(provider: Arc<dyn LLMProvider>, config: &Config) -> Self {
        Self::new(provider, config.model.name.clone(), config.model.temperature)
    }
}

#[async_trait]
impl DecisionPolicy for LlmPolicy {
    async fn decide(
        &self,
        snapshot: &Snapshot,
        history: &[StepRecord],
    ) -> Result<Decision, DecisionError> {
        let messages = prompts::exploration_messages(snapshot, history);

        info!(provider = self.provider.name(), model = %self.model, "Thinking...");
        let response = self
            .provider
            .chat(
                &self.model,
                &messages,
                Some(GenerateOptions::json(self.temperature)),
            )
            .await
            .map_err(|e| DecisionError::Transport(e.to_string()))?;

        if let Some(usage) = &response.usage {
            debug!(tokens = usage.total_tokens, "LLM usage");
        }
        parse_decision(&response.content)
    }
}
