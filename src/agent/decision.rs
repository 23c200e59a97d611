//! Decisions proposed by a policy
//!
//! A `Decision` is untrusted: `action_type` is whatever the policy emitted
//! and is only interpreted after `ActionValidator` has seen it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::agent::history::StepRecord;
use crate::agent::observer::Snapshot;
use crate::core::DecisionError;

/// Proposed next action plus commentary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    #[serde(default)]
    pub action_type: Option<String>,
    #[serde(default)]
    pub target_description: Option<String>,
    #[serde(default)]
    pub input_value: Option<String>,
    /// Why this particular action
    #[serde(default)]
    pub reason: Option<String>,
    /// Overall reasoning about the page
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub potential_issues: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_summary: Option<String>,
    /// Set when this decision was substituted for a policy failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<DecisionFailure>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionFailureKind {
    Transport,
    Malformed,
}

/// Why the policy could not be used for a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionFailure {
    pub kind: DecisionFailureKind,
    pub message: String,
}

impl Decision {
    /// Safe `stop` decision standing in for a failed policy call
    pub fn fallback(err: &DecisionError) -> Self {
        let kind = match err {
            DecisionError::Transport(_) => DecisionFailureKind::Transport,
            DecisionError::Malformed { .. } => DecisionFailureKind::Malformed,
        };
        Self {
            action_type: Some("stop".to_string()),
            reason: Some(format!("Error in reasoning: {}", err)),
            reasoning: "Decision policy failed; stopping safely.".to_string(),
            failure: Some(DecisionFailure {
                kind,
                message: err.to_string(),
            }),
            ..Default::default()
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.failure.is_some()
    }
}

/// Anything that can pick the next action: an LLM, a scripted planner, a human
#[async_trait]
pub trait DecisionPolicy: Send + Sync {
    /// `history` holds only completed prior steps, oldest first
    async fn decide(
        &self,
        snapshot: &Snapshot,
        history: &[StepRecord],
    ) -> Result<Decision, DecisionError>;
}

/// Replays a fixed list of decisions, then stops
#[derive(Debug, Default)]
pub struct ScriptedPolicy {
    script: Mutex<VecDeque<Decision>>,
}

impl ScriptedPolicy {
    pub fn new(script: impl IntoIterator<Item = Decision>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
        }
    }

    /// Shorthand for a decision with just a type, target and input
    pub fn step(action_type: &str, target: &str, input: &str) -> Decision {
        Decision {
            action_type: Some(action_type.to_string()),
            target_description: Some(target.to_string()),
            input_value: Some(input.to_string()),
            reasoning: format!("scripted {}", action_type),
            confidence: Some(1.0),
            ..Default::default()
        }
    }
}

#[async_trait]
impl DecisionPolicy for ScriptedPolicy {
    async fn decide(
        &self,
        _snapshot: &Snapshot,
        _history: &[StepRecord],
    ) -> Result<Decision, DecisionError> {
        let next = self
            .script
            .lock()
            .map_err(|_| DecisionError::Transport("script state poisoned".to_string()))?
            .pop_front();
        Ok(next.unwrap_or_else(|| Decision {
            action_type: Some("stop".to_string()),
            reason: Some("Script finished".to_string()),
            reasoning: "No scripted steps left".to_string(),
            ..Default::default()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_is_stop_with_failure() {
        let err = DecisionError::Malformed {
            reason: "expected value at line 1".to_string(),
            raw: "Sure! I will click".to_string(),
        };
        let decision = Decision::fallback(&err);
        assert_eq!(decision.action_type.as_deref(), Some("stop"));
        assert!(decision.is_fallback());
        assert_eq!(
            decision.failure.as_ref().unwrap().kind,
            DecisionFailureKind::Malformed
        );
        assert!(decision.reason.unwrap().contains("malformed"));
    }

    #[tokio::test]
    async fn test_scripted_policy_stops_when_exhausted() {
        let policy = ScriptedPolicy::new([ScriptedPolicy::step("click", "Login", "")]);
        let snapshot = Snapshot::default();
        let first = policy.decide(&snapshot, &[]).await.unwrap();
        assert_eq!(first.action_type.as_deref(), Some("click"));
        let second = policy.decide(&snapshot, &[]).await.unwrap();
        assert_eq!(second.action_type.as_deref(), Some("stop"));
    }

    #[test]
    fn test_lenient_deserialization() {
        let decision: Decision = serde_json::from_str(r#"{"actionType":"CLICK "}"#).unwrap();
        assert_eq!(decision.action_type.as_deref(), Some("CLICK "));
        assert!(decision.potential_issues.is_empty());
        assert!(!decision.is_fallback());
    }
}
