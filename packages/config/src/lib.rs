// ABOUTME: Configuration for Setkeep packages
// ABOUTME: Environment variable names, data directory resolution and runtime config

pub mod config;
pub mod constants;

pub use config::{setkeep_dir, Config, ConfigError};
