#![forbid(unsafe_code)]
//! Wire types shared by the control-plane daemon and the JSON-RPC client pool.
//!
//! This crate owns nothing that runs: it is the contract layer. `envelope`
//! models the inbound control RPC and its response; `executor` models the
//! five methods the executor sidecar exposes; `jsonrpc` is the minimal
//! JSON-RPC 2.0 request/response framing both transports share.

mod envelope;
mod error;
mod executor;
mod jsonrpc;

pub use envelope::{ControlEnvelope, ControlResponse};
pub use error::WireError;
pub use executor::{
    Dirent, ReaddirParams, ReaddirResult, ReadfileParams, ReadfileResult, ReadlinkParams,
    ReadlinkResult, SubprocessParams, SubprocessResult, WritefileParams, WritefileResult,
};
pub use jsonrpc::{JsonRpcError, JsonRpcId, JsonRpcRequest, JsonRpcResponse};
