//! Error types for SiteScout
//!
//! Component errors are converted to data (outcomes, issues) as close to
//! their origin as possible. Only `ScoutError` escapes a step boundary.

use thiserror::Error;

use crate::agent::validator::ActionKind;

/// Failures reported by a browser driver
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DriverError {
    /// The driver command ran but reported failure
    #[error("browser command failed: {0}")]
    Command(String),

    /// A driver operation exceeded its timeout
    #[error("{operation} timed out after {after_ms}ms")]
    Timeout { operation: String, after_ms: u64 },

    /// In-page evaluation returned something unusable
    #[error("page evaluation failed: {0}")]
    Eval(String),

    /// All navigation attempts failed
    #[error("navigation to {url} failed after {attempts} attempt(s): {last}")]
    NavigationFailed {
        url: String,
        attempts: u32,
        last: String,
    },

    /// No page has been opened yet
    #[error("no live page")]
    NotReady,

    /// agent-browser not installed
    #[error("agent-browser not found. Install with: npm install -g agent-browser && agent-browser install")]
    AgentBrowserNotFound,
}

/// The page could not be read
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ObservationError {
    #[error("Browser not initialized")]
    NotInitialized,

    #[error("observation failed: {0}")]
    ReadFailed(String),
}

/// The decision policy did not produce a usable decision
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecisionError {
    /// Network / provider failure
    #[error("decision policy unavailable: {0}")]
    Transport(String),

    /// The policy answered but not with a decision we can read
    #[error("decision policy returned malformed output: {reason}")]
    Malformed { reason: String, raw: String },
}

/// Resolving or performing an action failed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GroundingError {
    #[error("no target given for {0} action")]
    MissingTarget(ActionKind),

    #[error("NoElementFound: nothing on the page matches '{0}'")]
    NoElementFound(String),

    #[error("invalid navigation target: {0}")]
    InvalidUrl(String),

    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Main error type for SiteScout operations
#[derive(Error, Debug)]
pub enum ScoutError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// LLM provider connection or API errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Browser driver errors that escape a step
    #[error("Browser error: {0}")]
    Browser(#[from] DriverError),

    /// Session history errors
    #[error("History error: {0}")]
    History(String),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Model not available
    #[error("Model '{0}' not available. For Ollama run: ollama pull {0}")]
    ModelNotFound(String),
}

/// Convenience Result type for SiteScout operations
pub type Result<T> = std::result::Result<T, ScoutError>;

impl ScoutError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an LLM error
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Create a history error
    pub fn history(msg: impl Into<String>) -> Self {
        Self::History(msg.into())
    }
}

impl DriverError {
    /// Create a command error
    pub fn command(msg: impl Into<String>) -> Self {
        Self::Command(msg.into())
    }

    /// Create an evaluation error
    pub fn eval(msg: impl Into<String>) -> Self {
        Self::Eval(msg.into())
    }
}

/// Readable text from a caught panic payload
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

impl From<DriverError> for ObservationError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::NotReady => Self::NotInitialized,
            other => Self::ReadFailed(other.to_string()),
        }
    }
}
