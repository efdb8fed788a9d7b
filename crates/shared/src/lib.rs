//! Shared library for Yamal.
//!
//! This crate provides common functionality used by the data core and its
//! command-line driver:
//! - Configuration management
//! - Logging infrastructure

pub mod config;
pub mod logging;

// Re-export commonly used types
pub use config::Config;
pub use logging::LogConfig;
