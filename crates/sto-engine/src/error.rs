use thiserror::Error;

/// Errors raised by the control plane while routing, executing, or rolling
/// back a request. Every variant carries an errno-shaped `code` so it can be
/// latched onto a pipeline/request context and rendered back to the control
/// socket as `{"status":"FAILED","error":<code>,"msg":<display>}`
/// (spec.md §4.D.6, §7).
///
/// This is the native-Rust `Result<T, E>` replacement for the original's
/// fallible-pointer-plus-sentinel-errno discipline: a function either
/// returns a value or one of these variants, never both.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoError {
    #[error("unknown component `{0}`")]
    UnknownComponent(String),

    #[error("unknown object `{object}` for component `{component}`")]
    UnknownObject { component: String, object: String },

    #[error("unknown operation `{op}` on object `{object}`")]
    UnknownOp { object: String, op: String },

    #[error("alias cycle detected while resolving `{0}`")]
    AliasCycle(String),

    #[error("missing required field `{0}`")]
    MissingField(String),

    #[error("field `{field}` has the wrong type (expected {expected})")]
    WrongType {
        field: String,
        expected: &'static str,
    },

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("executor call failed: {0}")]
    ExecutorFailed(String),

    #[error("executor transport error: {0}")]
    Transport(String),

    #[error("step failed: {0}")]
    StepFailed(String),

    #[error("rollback failed: {0}")]
    RollbackFailed(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl StoError {
    /// The errno-shaped code rendered to the control socket (spec.md §7).
    /// Negative, mirroring the C original's `-errno` convention so a caller
    /// already speaking that dialect doesn't need a translation table.
    pub fn code(&self) -> i32 {
        match self {
            StoError::UnknownComponent(_) => -2,
            StoError::UnknownObject { .. } => -2,
            StoError::UnknownOp { .. } => -2,
            StoError::AliasCycle(_) => -62,
            StoError::MissingField(_) => -22,
            StoError::WrongType { .. } => -22,
            StoError::AlreadyExists(_) => -17,
            StoError::NotFound(_) => -2,
            StoError::ExecutorFailed(_) => -5,
            StoError::Transport(_) => -5,
            StoError::StepFailed(_) => -5,
            StoError::RollbackFailed(_) => -5,
            StoError::Internal(_) => -71,
        }
    }

    /// The `msg` rendered alongside `code()` on a FAILED control response
    /// (spec.md §4.D.6, §7): the POSIX `strerror(-rc)` text for the code,
    /// not this type's own `Display` — a caller matching against `errno.h`
    /// strings shouldn't see Rust's error prose instead.
    ///
    /// `std::io::Error`'s `Display` appends a `" (os error N)"` suffix we
    /// don't want here, so it's trimmed back off.
    pub fn strerror(&self) -> String {
        let rendered = std::io::Error::from_raw_os_error(-self.code()).to_string();
        match rendered.find(" (os error") {
            Some(idx) => rendered[..idx].to_string(),
            None => rendered,
        }
    }
}

impl From<sto_wire::WireError> for StoError {
    fn from(err: sto_wire::WireError) -> Self {
        match err {
            sto_wire::WireError::MissingField { field } => {
                StoError::MissingField(field.to_string())
            }
            sto_wire::WireError::WrongType { field, expected } => StoError::WrongType {
                field: field.to_string(),
                expected,
            },
            sto_wire::WireError::Json(e) => StoError::Internal(e.to_string()),
        }
    }
}
