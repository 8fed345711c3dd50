//! Utility module
//!
//! This module provides:
//! - Configuration files
//! - Logging setup

mod config;
mod logging;

pub use config::{Config, LoggingConfig};
pub use logging::setup_logging;
