//! Configuration loading for pylinter.
//!
//! Settings live in `~/.pylinter/config.toml` (or the file named by
//! `PYLINTER_CONFIG`). A missing file means defaults; an unreadable or
//! malformed one is logged and also yields defaults, so a bad config never
//! stops linting.
//!
//! ```toml
//! [lint]
//! disable = ["C0111"]
//! ignore = ["invalid-name"]
//! pylint_bin = "${HOME}/.venvs/tools/bin/pylint"
//!
//! [log]
//! filter = "pylinter_lint=debug"
//! ```

use std::env;
use std::path::{Path, PathBuf};

use pylinter_lint::LintSettings;
use serde::Deserialize;

/// Environment variable naming an alternate config file.
pub const CONFIG_ENV_VAR: &str = "PYLINTER_CONFIG";

#[derive(Debug, Default, Deserialize)]
pub struct PylinterConfig {
    #[serde(default)]
    pub lint: LintSettings,
    pub log: Option<LogConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive, used when `RUST_LOG` is unset.
    pub filter: Option<String>,
}

/// Replace `${VAR}` with the variable's value (empty when unset).
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else { break };
        out.push_str(&rest[..start]);
        let var = &after[..end];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

impl PylinterConfig {
    /// Load from the default location, falling back to defaults.
    #[must_use]
    pub fn load() -> Self {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    #[must_use]
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Self::default();
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Self::default();
            }
        };

        match toml::from_str::<Self>(&content) {
            Ok(mut config) => {
                config.expand_paths();
                config
            }
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Self::default()
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    fn expand_paths(&mut self) {
        if let Some(bin) = &self.lint.pylint_bin {
            let expanded = expand_env_vars(&bin.to_string_lossy());
            self.lint.pylint_bin = Some(PathBuf::from(expanded));
        }
        self.lint.python_bin = expand_env_vars(&self.lint.python_bin);
    }
}

fn config_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".pylinter").join("config.toml"))
}
