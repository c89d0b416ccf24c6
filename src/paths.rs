//! Path resolution for hvconverge
//!
//! # Environment Variables
//!
//! - `HVCONVERGE_CONFIG_DIR` - Override config directory (e.g., `~/infra/hyperv`)
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `HVCONVERGE_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/hvconverge` (if set)
//! 3. Platform default:
//!    - Windows: `%APPDATA%\hvconverge`
//!    - macOS/Linux: `~/.config/hvconverge`

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "HVCONVERGE_CONFIG_DIR";

/// Document file name inside the config directory
pub const DOCUMENT_FILE: &str = "hosts.toml";

const APP_DIR: &str = "hvconverge";

/// Get the hvconverge config directory path
pub fn config_dir() -> Result<PathBuf> {
    resolve_config_dir(|key| std::env::var(key).ok())
}

fn resolve_config_dir(var: impl Fn(&str) -> Option<String>) -> Result<PathBuf> {
    if let Some(dir) = var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Some(xdg_config) = var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join(APP_DIR);
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            let path = app_data.join(APP_DIR);
            log::debug!("Using Windows config dir: {}", path.display());
            return Ok(path);
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join(APP_DIR);
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// The document to load: an explicit `--file`, or `hosts.toml` in the config dir
pub fn document_path(file: Option<&Path>) -> Result<PathBuf> {
    match file {
        Some(path) => Ok(expand(&path.to_string_lossy())),
        None => Ok(config_dir()?.join(DOCUMENT_FILE)),
    }
}

/// Expand `~` and environment variables in a path
///
/// Unknown variables are left unchanged.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_dir_env_override() {
        let result = resolve_config_dir(env_of(&[
            (ENV_CONFIG_DIR, "/custom/config/path"),
            ("XDG_CONFIG_HOME", "/tmp/xdg"),
        ]))
        .unwrap();
        assert_eq!(result, PathBuf::from("/custom/config/path"));
    }

    #[test]
    fn test_config_dir_env_override_with_tilde() {
        let home = dirs::home_dir().unwrap();
        let result = resolve_config_dir(env_of(&[(ENV_CONFIG_DIR, "~/infra/hyperv")])).unwrap();
        assert_eq!(result, home.join("infra").join("hyperv"));
    }

    #[test]
    fn test_xdg_config_home() {
        let result = resolve_config_dir(env_of(&[("XDG_CONFIG_HOME", "/tmp/xdg")])).unwrap();
        assert_eq!(result, PathBuf::from("/tmp/xdg/hvconverge"));
    }

    #[cfg(not(windows))]
    #[test]
    fn test_default_config_dir_unix() {
        let home = dirs::home_dir().unwrap();
        let result = resolve_config_dir(env_of(&[])).unwrap();
        assert_eq!(result, home.join(".config").join("hvconverge"));
    }

    #[test]
    fn test_document_path_explicit() {
        let result = document_path(Some(Path::new("/srv/lab.toml"))).unwrap();
        assert_eq!(result, PathBuf::from("/srv/lab.toml"));
    }

    #[test]
    fn test_document_path_expands_tilde() {
        let home = dirs::home_dir().unwrap();
        let result = document_path(Some(Path::new("~/lab.toml"))).unwrap();
        assert_eq!(result, home.join("lab.toml"));
    }

    #[test]
    fn test_expand_unknown_env_var_unchanged() {
        let result = expand("$HVCONVERGE_NONEXISTENT_VAR_12345/path");
        assert_eq!(
            result,
            PathBuf::from("$HVCONVERGE_NONEXISTENT_VAR_12345/path")
        );
    }
}
