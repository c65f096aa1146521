use std::path::PathBuf;

use thiserror::Error;

/// Daemon-level errors: bootstrap and transport failures that never reach
/// a request's own `StoError` because there is no request yet (binding
/// the control socket, spawning the executor sidecar, a malformed
/// inbound line). Distinct from `sto_engine::StoError`, which covers
/// failures while a specific request is being routed or executed.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("failed to spawn executor sidecar {binary}: {source}")]
    ExecutorSpawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to bind control socket {path}: {source}")]
    BindControlSocket {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("malformed control request: {0}")]
    MalformedRequest(String),
}
