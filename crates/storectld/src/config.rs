use std::env;
use std::path::PathBuf;

use serde::Deserialize;

const CONTROL_SOCKET_ENV: &str = "STORECTLD_CONTROL_SOCKET";
const EXECUTOR_SOCKET_ENV: &str = "STORECTLD_EXECUTOR_SOCKET";
const EXECUTOR_BINARY_ENV: &str = "STORECTLD_EXECUTOR_BINARY";
const RUST_LOG_ENV: &str = "RUST_LOG";
const DEFAULT_RUST_LOG: &str = "info";

pub(crate) fn default_rust_log_value() -> Option<&'static str> {
    env::var_os(RUST_LOG_ENV).is_none().then_some(DEFAULT_RUST_LOG)
}

/// On-disk shape of `config.toml`. Every field is optional here so a
/// partial file only overrides what it names; `StorectldConfig::load`
/// fills the rest from built-in defaults, then layers CLI flags and
/// `STORECTLD_*` environment variables on top, in that order.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    control_socket: Option<PathBuf>,
    executor_socket: Option<PathBuf>,
    executor_binary: Option<PathBuf>,
}

/// Fully resolved daemon configuration (SPEC_FULL.md §10). Precedence,
/// lowest to highest: built-in defaults, `config.toml`, CLI flags,
/// `STORECTLD_*` environment variables — the same layering
/// `codex::defaults`/`codex::home` use for `CODEX_HOME`/`CODEX_BINARY`,
/// generalized to a file-backed base layer since this daemon's config
/// surface is wider than a couple of env vars.
#[derive(Debug, Clone)]
pub struct StorectldConfig {
    pub control_socket: PathBuf,
    pub executor_socket: PathBuf,
    pub executor_binary: PathBuf,
}

impl Default for StorectldConfig {
    fn default() -> Self {
        Self {
            control_socket: PathBuf::from("/run/storectld/control.sock"),
            executor_socket: PathBuf::from("/run/storectld/executor.sock"),
            executor_binary: PathBuf::from("storectld-executor"),
        }
    }
}

impl StorectldConfig {
    /// Loads `config.toml` at `config_path` if it exists (a missing file
    /// is not an error — the daemon falls back to defaults), then applies
    /// CLI overrides, then environment overrides.
    pub fn load(
        config_path: Option<&std::path::Path>,
        cli: &super::Cli,
    ) -> Result<Self, ConfigError> {
        let mut resolved = StorectldConfig::default();

        if let Some(path) = config_path {
            if path.exists() {
                let raw = std::fs::read_to_string(path)
                    .map_err(|e| ConfigError::Read(path.to_path_buf(), e.to_string()))?;
                let file: ConfigFile = toml::from_str(&raw)
                    .map_err(|e| ConfigError::Parse(path.to_path_buf(), e.to_string()))?;
                if let Some(v) = file.control_socket {
                    resolved.control_socket = v;
                }
                if let Some(v) = file.executor_socket {
                    resolved.executor_socket = v;
                }
                if let Some(v) = file.executor_binary {
                    resolved.executor_binary = v;
                }
            }
        }

        if let Some(v) = &cli.control_socket {
            resolved.control_socket = v.clone();
        }
        if let Some(v) = &cli.executor_socket {
            resolved.executor_socket = v.clone();
        }
        if let Some(v) = &cli.executor_binary {
            resolved.executor_binary = v.clone();
        }

        if let Some(v) = env::var_os(CONTROL_SOCKET_ENV) {
            resolved.control_socket = PathBuf::from(v);
        }
        if let Some(v) = env::var_os(EXECUTOR_SOCKET_ENV) {
            resolved.executor_socket = PathBuf::from(v);
        }
        if let Some(v) = env::var_os(EXECUTOR_BINARY_ENV) {
            resolved.executor_binary = PathBuf::from(v);
        }

        Ok(resolved)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Read(PathBuf, String),
    #[error("failed to parse config file {0}: {1}")]
    Parse(PathBuf, String),
}
