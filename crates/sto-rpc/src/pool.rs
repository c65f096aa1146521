use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use sto_engine::StoError;
use tokio::sync::{Mutex, Semaphore};
use tracing::debug;

use crate::connection::Connection;

/// Mirrors `STO_CLIENT_MAX_CONNS` in the newer multi-connection
/// `sto_client.c`: the pool never holds open more than this many
/// simultaneous connections to the executor sidecar.
pub const MAX_CONNS: usize = 64;

/// An outbound JSON-RPC client pool to the executor sidecar (spec.md §4.C).
///
/// `sto_client_group` partitioned its 64 pre-connected sockets into
/// `free_clients`/`clients` TAILQs and, once all 64 were busy, queued
/// further requests on `g_rpc_req_busy_list` until one freed up. This
/// keeps the same free/busy split — a free list plus a bounding
/// `Semaphore` — but the busy queue is implicit in the tasks parked on
/// `Semaphore::acquire`, rather than a hand-maintained linked list
/// drained one entry at a time as connections free up.
pub struct Pool {
    path: PathBuf,
    capacity: Arc<Semaphore>,
    free: Mutex<Vec<Arc<Connection>>>,
    max_conns: usize,
}

impl Pool {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_max_conns(path, MAX_CONNS)
    }

    pub fn with_max_conns(path: impl Into<PathBuf>, max_conns: usize) -> Self {
        Self {
            path: path.into(),
            capacity: Arc::new(Semaphore::new(max_conns)),
            free: Mutex::new(Vec::new()),
            max_conns,
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.path
    }

    /// Sends `method`/`params` to the executor sidecar over a pooled
    /// connection, creating one lazily if the free list is empty and the
    /// pool hasn't reached `max_conns`. Callers beyond the capacity block
    /// on the semaphore, mirroring `sto_client_check_busy_list`'s FIFO
    /// overflow queue — the oldest blocked caller is the first woken when
    /// a permit is released.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, StoError> {
        let permit = self
            .capacity
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| StoError::Internal("executor pool closed".to_string()))?;

        let conn = self.checkout().await?;
        let result = conn.call(method, params).await;
        self.checkin(conn).await;
        drop(permit);
        result
    }

    async fn checkout(&self) -> Result<Arc<Connection>, StoError> {
        if let Some(conn) = self.free.lock().await.pop() {
            debug!("reusing pooled executor connection");
            return Ok(conn);
        }
        debug!(path = %self.path.display(), "opening new executor connection");
        let conn = Connection::connect(&self.path).await?;
        Ok(Arc::new(conn))
    }

    async fn checkin(&self, conn: Arc<Connection>) {
        let mut free = self.free.lock().await;
        if free.len() < self.max_conns {
            free.push(conn);
        }
    }
}
