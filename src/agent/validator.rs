//! Action validation
//!
//! The only place a raw action type is interpreted. Never fails: anything
//! unrecognized becomes `stop` with a diagnostic reason.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::agent::decision::Decision;

/// The closed action vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Click,
    Type,
    Navigate,
    Stop,
}

impl ActionKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "click" => Some(Self::Click),
            "type" => Some(Self::Type),
            "navigate" => Some(Self::Navigate),
            "stop" => Some(Self::Stop),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Type => "type",
            Self::Navigate => "navigate",
            Self::Stop => "stop",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decision coerced into the safe vocabulary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedAction {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub target_description: String,
    pub input_value: String,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Confidence was below the configured floor
    #[serde(default)]
    pub low_confidence: bool,
}

impl ValidatedAction {
    pub fn stop(reason: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::Stop,
            target_description: String::new(),
            input_value: String::new(),
            reason: reason.into(),
            confidence: None,
            low_confidence: false,
        }
    }

    pub fn is_stop(&self) -> bool {
        self.kind == ActionKind::Stop
    }
}

/// Whitelists and normalizes policy decisions
#[derive(Debug, Clone)]
pub struct ActionValidator {
    confidence_floor: f64,
}

impl ActionValidator {
    pub fn new(confidence_floor: f64) -> Self {
        Self { confidence_floor }
    }

    /// Below the floor, or not a usable number
    pub fn is_low_confidence(&self, confidence: Option<f64>) -> bool {
        matches!(confidence, Some(c) if !c.is_finite() || c < self.confidence_floor)
    }

    pub fn validate(&self, decision: &Decision) -> ValidatedAction {
        let raw_type = decision.action_type.as_deref().unwrap_or("").trim();

        let kind = match ActionKind::parse(raw_type) {
            Some(kind) => kind,
            None if raw_type.is_empty() => {
                warn!("Decision has no action type; stopping");
                return ValidatedAction::stop("No action type provided");
            }
            None => {
                warn!(action = raw_type, "Rejected action type; stopping");
                return ValidatedAction::stop(format!(
                    "Unknown or unsafe action type: {}",
                    raw_type
                ));
            }
        };

        let low_confidence = self.is_low_confidence(decision.confidence);
        if low_confidence {
            warn!(
                confidence = ?decision.confidence,
                floor = self.confidence_floor,
                "Low-confidence decision"
            );
        }

        let reason = decision
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .or_else(|| Some(decision.reasoning.trim()).filter(|r| !r.is_empty()))
            .unwrap_or("No reason provided")
            .to_string();

        let action = ValidatedAction {
            kind,
            target_description: decision
                .target_description
                .as_deref()
                .unwrap_or("")
                .trim()
                .to_string(),
            input_value: decision.input_value.clone().unwrap_or_default(),
            reason,
            confidence: decision.confidence,
            low_confidence,
        };
        debug!(action = %action.kind, target = %action.target_description, "Validated");
        action
    }
}

impl Default for ActionValidator {
    fn default() -> Self {
        Self::new(0.3)
    }
}
