use thiserror::Error;

/// Errors that occur while decoding or rendering wire-level JSON-RPC messages.
///
/// This is distinct from `sto_engine::error::StoError`: `WireError` is about
/// malformed bytes on the wire, not about control-plane or executor failures.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("envelope is missing the leading `{field}` field")]
    MissingField { field: &'static str },
    #[error("envelope field `{field}` has the wrong type (expected {expected})")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
    #[error("failed to decode JSON: {0}")]
    Json(#[from] serde_json::Error),
}
