//! Application configuration
//!
//! Loaded once at startup from a TOML file and treated as read-only afterwards.
//!
//! ```toml
//! [github]
//! token = "ghp_..."
//!
//! [[targets]]
//! label = "alice"
//! user = "alice"
//! repos = ["apache/doris"]
//!
//! [polling]
//! interval_seconds = 300
//! ```

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Lower bound for the polling interval, to stay clear of API rate limits
pub const MIN_POLLING_INTERVAL_SECONDS: u64 = 15;

const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";
const API_KEY_ENV_VAR: &str = "PR_MONITOR_API_KEY";

/// GitHub connection settings
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct GitHubConfig {
    /// Personal access token (overridable via `GITHUB_TOKEN`)
    pub token: String,

    /// REST API base, e.g. `https://ghe.example.com/api/v3`
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Web base used for links shown to users
    #[serde(default = "default_web_base")]
    pub web_base: String,
}

/// A named author (and optional repository scope) to poll for
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// Display label, also the cache key
    pub label: String,

    /// GitHub login whose pull requests are listed
    pub user: String,

    /// Restrict the search to these `owner/name` repositories
    #[serde(default)]
    pub repos: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct PollingConfig {
    /// How long a fetched listing stays fresh
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
}

/// Bind address for the web front-end
///
/// Nothing in this workspace binds a socket; the section is parsed and
/// validated here so the web front-end embedding `PullRequestService` shares
/// one config file with the CLI.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Request authentication for the web front-end
///
/// Like [`ServerConfig`], only carried through for that caller; the CLI does
/// not authenticate.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Key required on mutating requests (overridable via `PR_MONITOR_API_KEY`)
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Application configuration loaded from pr-monitor.toml
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub github: GitHubConfig,

    pub targets: Vec<TargetConfig>,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_web_base() -> String {
    "https://github.com".to_string()
}

fn default_interval_seconds() -> u64 {
    300
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval_seconds(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl AppConfig {
    /// Resolve, read, override from the environment and validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = crate::resolve_config_path(path)?;
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config = Self::from_toml_with_env(&content, |key| std::env::var(key).ok())
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        log::info!(
            "Loaded config from {} ({} targets)",
            path.display(),
            config.targets.len()
        );
        Ok(config)
    }

    /// Parse TOML, apply overrides looked up through `env`, then validate
    pub fn from_toml_with_env<F>(content: &str, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: Self = toml::from_str(content).context("Failed to parse config")?;
        config.apply_env_overrides(env);
        config.validate()?;
        Ok(config)
    }

    /// Replace secrets with values from the environment when set
    pub fn apply_env_overrides<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = env(TOKEN_ENV_VAR).filter(|v| !v.is_empty()) {
            log::debug!("Using GitHub token from {}", TOKEN_ENV_VAR);
            self.github.token = token;
        }
        if let Some(api_key) = env(API_KEY_ENV_VAR).filter(|v| !v.is_empty()) {
            log::debug!("Using API key from {}", API_KEY_ENV_VAR);
            self.auth.api_key = Some(api_key);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.github.token.trim().is_empty() {
            bail!("github.token must not be empty");
        }
        if self.targets.is_empty() {
            bail!("At least one target must be configured");
        }
        let mut labels = HashSet::new();
        for target in &self.targets {
            if target.label.is_empty() || target.user.is_empty() {
                bail!("Targets need a non-empty label and user");
            }
            if !labels.insert(target.label.as_str()) {
                bail!("Duplicate target label '{}'", target.label);
            }
        }
        if self.polling.interval_seconds < MIN_POLLING_INTERVAL_SECONDS {
            bail!(
                "polling.interval_seconds must be at least {} (got {})",
                MIN_POLLING_INTERVAL_SECONDS,
                self.polling.interval_seconds
            );
        }
        if self.server.port == 0 {
            bail!("server.port must be at least 1");
        }
        Ok(())
    }

    /// Look up a target by its label
    pub fn target(&self, label: &str) -> Option<&TargetConfig> {
        self.targets.iter().find(|t| t.label == label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [github]
        token = "dummy"

        [[targets]]
        label = "demo"
        user = "alice"
        repos = ["org/repo"]
    "#;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = AppConfig::from_toml_with_env(MINIMAL, no_env).unwrap();
        assert_eq!(config.github.api_base, "https://api.github.com");
        assert_eq!(config.github.web_base, "https://github.com");
        assert_eq!(config.polling.interval_seconds, 300);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert!(config.auth.api_key.is_none());
        assert_eq!(config.targets[0].user, "alice");
        assert_eq!(config.targets[0].repos, vec!["org/repo".to_string()]);
    }

    #[test]
    fn test_env_override() {
        let env = |key: &str| match key {
            "GITHUB_TOKEN" => Some("override".to_string()),
            "PR_MONITOR_API_KEY" => Some("secret".to_string()),
            _ => None,
        };
        let config = AppConfig::from_toml_with_env(MINIMAL, env).unwrap();
        assert_eq!(config.github.token, "override");
        assert_eq!(config.auth.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_env_override_fills_missing_token() {
        let toml = r#"
            [github]
            token = ""

            [[targets]]
            label = "demo"
            user = "alice"
        "#;
        let env = |key: &str| (key == "GITHUB_TOKEN").then(|| "from-env".to_string());
        let config = AppConfig::from_toml_with_env(toml, env).unwrap();
        assert_eq!(config.github.token, "from-env");
    }

    #[test]
    fn test_empty_targets_rejected() {
        let toml = r#"
            targets = []
            [github]
            token = "dummy"
        "#;
        let err = AppConfig::from_toml_with_env(toml, no_env).unwrap_err();
        assert!(err.to_string().contains("At least one target"));
    }

    #[test]
    fn test_short_polling_interval_rejected() {
        let toml = format!("{MINIMAL}\n[polling]\ninterval_seconds = 5\n");
        assert!(AppConfig::from_toml_with_env(&toml, no_env).is_err());
    }

    #[test]
    fn test_duplicate_labels_rejected() {
        let toml = format!("{MINIMAL}\n[[targets]]\nlabel = \"demo\"\nuser = \"bob\"\n");
        let err = AppConfig::from_toml_with_env(&toml, no_env).unwrap_err();
        assert!(err.to_string().contains("Duplicate target label"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml = format!("{MINIMAL}\n[polling]\nintervall = 60\n");
        assert!(AppConfig::from_toml_with_env(&toml, no_env).is_err());
    }

    #[test]
    fn test_load_config_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.toml");
        std::fs::write(&file, MINIMAL).unwrap();

        let config = AppConfig::load(Some(&file)).unwrap();
        assert_eq!(config.targets[0].label, "demo");
    }

    #[test]
    fn test_shipped_example_config_is_valid() {
        let example = include_str!("../../../pr-monitor.example.toml");
        let config = AppConfig::from_toml_with_env(example, no_env).unwrap();
        assert_eq!(config.targets.len(), 2);
        assert!(config.targets[1].repos.is_empty());
    }

    #[test]
    fn test_server_and_auth_sections() {
        let toml = format!(
            "{MINIMAL}\n[server]\nhost = \"0.0.0.0\"\nport = 9000\n[auth]\napi_key = \"k\"\n"
        );
        let config = AppConfig::from_toml_with_env(&toml, no_env).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.auth.api_key.as_deref(), Some("k"));

        let toml = format!("{MINIMAL}\n[server]\nport = 0\n");
        let err = AppConfig::from_toml_with_env(&toml, no_env).unwrap_err();
        assert!(err.to_string().contains("server.port"));
    }

    #[test]
    fn test_target_lookup() {
        let config = AppConfig::from_toml_with_env(MINIMAL, no_env).unwrap();
        assert!(config.target("demo").is_some());
        assert!(config.target("nope").is_none());
    }
}
