//! Config file discovery
//!
//! Search order:
//! 1. An explicit path (must exist)
//! 2. `PR_MONITOR_CONFIG` environment variable
//! 3. `pr-monitor.toml` in the current working directory
//! 4. `pr-monitor.example.toml` in the current working directory
//! 5. `config.toml` in the user config directory
//!    (`~/.config/pr-monitor/` on Linux, `~/Library/Application Support/pr-monitor/` on macOS)

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "pr-monitor";
const CONFIG_FILE: &str = "pr-monitor.toml";
const EXAMPLE_CONFIG_FILE: &str = "pr-monitor.example.toml";

/// Environment variable pointing at a config file
pub const CONFIG_ENV_VAR: &str = "PR_MONITOR_CONFIG";

/// Get the path to the config file in the user config directory
fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME).join("config.toml"))
}

/// Candidate paths in priority order, excluding the explicit one
fn candidates(env_path: Option<PathBuf>) -> Vec<PathBuf> {
    let mut paths = Vec::with_capacity(4);
    paths.extend(env_path);
    paths.push(PathBuf::from(CONFIG_FILE));
    paths.push(PathBuf::from(EXAMPLE_CONFIG_FILE));
    paths.extend(user_config_path());
    paths
}

/// Resolve which config file to load
///
/// An explicit path that does not exist is an error rather than a reason to
/// fall back to the defaults.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if !path.exists() {
            bail!("Config file not found: {}", path.display());
        }
        return Ok(path.to_path_buf());
    }

    let env_path = std::env::var_os(CONFIG_ENV_VAR)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from);

    find_existing(candidates(env_path))
}

fn find_existing(paths: Vec<PathBuf>) -> Result<PathBuf> {
    for path in paths {
        if path.exists() {
            log::debug!("Using config file {}", path.display());
            return Ok(path);
        }
        log::trace!("No config at {}", path.display());
    }
    bail!("No {} or {} found", CONFIG_FILE, EXAMPLE_CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_missing_path_is_error() {
        let err = resolve_config_path(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_explicit_path_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("custom.toml");
        std::fs::write(&file, "").unwrap();

        assert_eq!(resolve_config_path(Some(&file)).unwrap(), file);
    }

    #[test]
    fn test_first_existing_candidate_wins() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.toml");
        let second = dir.path().join("second.toml");
        std::fs::write(&second, "").unwrap();
        std::fs::write(&first, "").unwrap();

        let found = find_existing(vec![dir.path().join("missing.toml"), first.clone(), second])
            .unwrap();
        assert_eq!(found, first);
    }

    #[test]
    fn test_env_path_is_checked_first() {
        let env_path = PathBuf::from("/tmp/from-env.toml");
        let paths = candidates(Some(env_path.clone()));
        assert_eq!(paths[0], env_path);
        assert_eq!(paths[1], PathBuf::from(CONFIG_FILE));
    }

    #[test]
    fn test_nothing_found_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_existing(vec![dir.path().join("nope.toml")]).is_err());
    }
}
