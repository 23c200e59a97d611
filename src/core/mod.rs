//! Core module - shared infrastructure for SiteScout
//!
//! Configuration, error taxonomy, logging setup and the chat message type.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::Config;
pub use error::{DecisionError, DriverError, GroundingError, ObservationError, Result, ScoutError};
pub use types::*;
