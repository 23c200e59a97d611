//! Configuration management for SiteScout
//!
//! Supports environment variables, config files, and runtime overrides.
//!
//! Config file location: ~/.config/sitescout/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::error::{Result, ScoutError};

/// Main configuration for SiteScout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Which LLM backend drives decisions
    #[serde(default)]
    pub provider: ProviderType,
    /// Ollama configuration
    #[serde(default)]
    pub ollama: OllamaConfig,
    /// Groq configuration
    #[serde(default)]
    pub groq: GroqConfig,
    /// Model configuration
    #[serde(default)]
    pub model: ModelConfig,
    /// Browser configuration
    #[serde(default)]
    pub browser: BrowserConfig,
    /// Exploration loop configuration
    #[serde(default)]
    pub agent: AgentConfig,
    /// Snapshot bounds
    #[serde(default)]
    pub observer: ObserverConfig,
}

/// Supported LLM backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Ollama,
    Groq,
}

impl Default for ProviderType {
    fn default() -> Self {
        match env::var("SCOUT_PROVIDER").ok().as_deref() {
            Some("ollama") => Self::Ollama,
            Some("groq") => Self::Groq,
            _ if env::var("GROQ_API_KEY").is_ok() => Self::Groq,
            _ => Self::Ollama,
        }
    }
}

impl std::str::FromStr for ProviderType {
    type Err = ScoutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "groq" => Ok(Self::Groq),
            other => Err(ScoutError::config(format!("Unknown provider: {}", other))),
        }
    }
}

/// Ollama server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Host address (default: localhost)
    pub host: String,
    /// Port number (default: 11434)
    pub port: u16,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Groq API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroqConfig {
    /// API key, usually from GROQ_API_KEY
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// OpenAI-compatible endpoint root
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model used for decisions
    /// Default: llama-3.1-70b-versatile
    pub name: String,
    /// Sampling temperature
    pub temperature: f32,
}

/// Browser automation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Session name for agent-browser
    pub session_name: String,
    /// Run without a visible window
    pub headless: bool,
    /// Timeout for click / fill / eval in ms
    pub timeout_ms: u64,
    /// Timeout for a single navigation attempt in ms
    pub navigation_timeout_ms: u64,
    /// Navigation attempts including the first
    pub navigation_attempts: u32,
    /// Delay before the first navigation retry, doubled per attempt
    pub navigation_base_delay_ms: u64,
    /// Extra wait after a navigation for client-side hydration
    pub settle_ms: u64,
    /// Where screenshots are written
    pub screenshot_dir: PathBuf,
}

/// Exploration loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Step budget
    /// Default: 10
    pub max_steps: usize,
    /// Number of recent steps shown to the policy
    /// Default: 5
    pub history_window: usize,
    /// Pause between steps for page stabilization
    pub step_delay_ms: u64,
    /// Decisions below this confidence are flagged (never rejected)
    pub confidence_floor: f64,
    /// Number of recent console entries inspected per step
    pub console_window: usize,
    /// Directory for session logs
    pub log_dir: PathBuf,
}

/// Caps applied to every snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObserverConfig {
    pub max_text_chars: usize,
    pub max_buttons: usize,
    pub max_links: usize,
    pub max_inputs: usize,
}

fn env_flag(key: &str) -> Option<bool> {
    env::var(key)
        .ok()
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: env::var("OLLAMA_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: env::var("OLLAMA_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(11434),
            timeout_secs: 120,
        }
    }
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            api_key: env::var("GROQ_API_KEY").ok().filter(|k| !k.is_empty()),
            base_url: "https://api.groq.com/openai/v1".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: env::var("SCOUT_MODEL").unwrap_or_else(|_| "llama-3.1-70b-versatile".to_string()),
            temperature: 0.2,
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            session_name: env::var("SCOUT_BROWSER_SESSION")
                .unwrap_or_else(|_| "sitescout".to_string()),
            headless: env_flag("HEADLESS").unwrap_or(false),
            timeout_ms: 5000,
            navigation_timeout_ms: 60000,
            navigation_attempts: 3,
            navigation_base_delay_ms: 1000,
            settle_ms: 2000,
            screenshot_dir: PathBuf::from("logs").join("screenshots"),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: env::var("MAX_STEPS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            history_window: 5,
            step_delay_ms: 2000,
            confidence_floor: 0.3,
            console_window: 5,
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            max_text_chars: 1500,
            max_buttons: 15,
            max_links: 15,
            max_inputs: 10,
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sitescout")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();

        if let Ok(config) = Self::load_from_file() {
            return config;
        }

        Self::default()
    }

    /// Load configuration from file only
    pub fn load_from_file() -> Result<Self> {
        let config_path = Self::config_file();

        if !config_path.exists() {
            return Err(ScoutError::config("Config file not found"));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| ScoutError::config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse a TOML document; missing sections fall back to defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ScoutError::config(format!("Failed to parse config: {}", e)))
    }

    /// Reject settings the loop cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.agent.max_steps == 0 {
            return Err(ScoutError::config("agent.max_steps must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.agent.confidence_floor) {
            return Err(ScoutError::config(
                "agent.confidence_floor must be between 0 and 1",
            ));
        }
        if self.browser.navigation_attempts == 0 {
            return Err(ScoutError::config(
                "browser.navigation_attempts must be at least 1",
            ));
        }
        if self.provider == ProviderType::Groq && self.groq.api_key.is_none() {
            return Err(ScoutError::config(
                "GROQ_API_KEY is missing via .env or environment variable",
            ));
        }
        Ok(())
    }

    /// Get the full Ollama API URL
    pub fn ollama_url(&self) -> String {
        format!("http://{}:{}", self.ollama.host, self.ollama.port)
    }

    /// Generate a default config file content for display
    pub fn default_config_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config)
            .unwrap_or_else(|_| String::from("# Error generating config"))
    }
}

impl AgentConfig {
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }
}
