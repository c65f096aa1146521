#![forbid(unsafe_code)]
//! The outbound JSON-RPC client pool pipeline steps use to reach the
//! executor sidecar (spec.md §4.C): `connection` frames one Unix-socket
//! transport, `pool` bounds and reuses a handful of them.

mod connection;
mod pool;

pub use connection::Connection;
pub use pool::{Pool, MAX_CONNS};
