//! SiteScout - LLM-driven web exploration agent
//!
//! Drives a live page through a perceive → decide → ground → act → analyze
//! loop and records a step-by-step session log of what happened and what
//! looked wrong.
//!
//! # Architecture
//!
//! - **Core**: Configuration, error taxonomy, logging setup
//! - **Browser**: The `BrowserDriver` trait with agent-browser and in-memory backends
//! - **Agent**: Observer, validator, grounder, analyzer, history and the `Explorer` loop
//! - **LLM**: Provider abstraction (Ollama, Groq) and the LLM decision policy
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sitescout::agent::{Explorer, JsonFileSink};
//! use sitescout::browser::AgentBrowserDriver;
//! use sitescout::llm::{create_provider, LlmPolicy};
//! use sitescout::Config;
//!
//! #[tokio::main]
//! async fn main() -> sitescout::Result<()> {
//!     let config = Config::load();
//!     let provider = create_provider(&config)?;
//!     let driver = Arc::new(AgentBrowserDriver::from_config(&config.browser));
//!     let policy = Arc::new(LlmPolicy::from_config(provider, &config));
//!     let sink = Box::new(JsonFileSink::new(&config.agent.log_dir));
//!
//!     let report = Explorer::new(driver, policy, sink, &config)
//!         .run("https://www.saucedemo.com/")
//!         .await?;
//!     println!("{}", report.termination);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod browser;
pub mod core;
pub mod llm;

// Re-export commonly used items
pub use agent::{Explorer, SessionReport};
pub use core::{Config, Result, ScoutError};
