//! Configuration for pr-monitor
//!
//! This crate provides:
//! - Config file discovery (explicit path, env var, CWD, user config dir)
//! - The typed application configuration (`AppConfig`) and its validation
//! - Environment overrides for secrets

pub mod app_config;
pub mod config_file;

pub use app_config::{
    AppConfig, AuthConfig, GitHubConfig, PollingConfig, ServerConfig, TargetConfig,
    MIN_POLLING_INTERVAL_SECONDS,
};
pub use config_file::{resolve_config_path, CONFIG_ENV_VAR};
