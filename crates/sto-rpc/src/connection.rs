use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use serde_json::Value;
use sto_engine::StoError;
use sto_wire::{JsonRpcId, JsonRpcRequest, JsonRpcResponse};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

type PendingReplies = Arc<Mutex<HashMap<JsonRpcId, oneshot::Sender<JsonRpcResponse>>>>;

/// One connection to the executor sidecar over a Unix domain socket,
/// framed as newline-delimited JSON-RPC 2.0 messages. This is the direct
/// async counterpart of `sto_client.c`'s per-connection `rpc_client`:
/// where the original polled a socket for readiness and decoded whatever
/// arrived on its turn, this keeps a dedicated reader task parked in
/// `read_line` and resolves replies by `id` the moment they land.
pub struct Connection {
    writer: mpsc::UnboundedSender<String>,
    pending: PendingReplies,
    next_id: AtomicU32,
    _tasks: Vec<JoinHandle<()>>,
}

impl Connection {
    pub async fn connect(path: &std::path::Path) -> Result<Self, StoError> {
        let stream = UnixStream::connect(path)
            .await
            .map_err(|e| StoError::Transport(format!("connect {}: {e}", path.display())))?;
        Ok(Self::from_stream(stream))
    }

    pub fn from_stream(stream: UnixStream) -> Self {
        let (read_half, mut write_half) = stream.into_split();
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let pending: PendingReplies = Arc::new(Mutex::new(HashMap::new()));

        let writer_task = tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                if let Err(err) = write_half.write_all(line.as_bytes()).await {
                    warn!(%err, "executor connection write failed");
                    break;
                }
                if let Err(err) = write_half.write_all(b"\n").await {
                    warn!(%err, "executor connection write failed");
                    break;
                }
            }
        });

        let reader_pending = pending.clone();
        let reader_task = tokio::spawn(async move {
            let mut reader = BufReader::new(read_half);
            let mut line = String::new();
            loop {
                line.clear();
                let bytes = match reader.read_line(&mut line).await {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(err) => {
                        warn!(%err, "executor connection read failed");
                        break;
                    }
                };
                let _ = bytes;
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let response: JsonRpcResponse = match serde_json::from_str(trimmed) {
                    Ok(resp) => resp,
                    Err(err) => {
                        warn!(%err, "malformed executor response");
                        continue;
                    }
                };
                let sender = reader_pending.lock().await.remove(&response.id);
                match sender {
                    Some(sender) => {
                        let _ = sender.send(response);
                    }
                    None => {
                        debug!(id = response.id, "reply for unknown or already-resolved request");
                    }
                }
            }
        });

        Self {
            writer: tx,
            pending,
            next_id: AtomicU32::new(1),
            _tasks: vec![writer_task, reader_task],
        }
    }

    /// Sends `method`/`params` and awaits the correlated reply. Mirrors
    /// `sto_client_send`'s allocate-id / register-correlation / write
    /// sequence, but as a single async call rather than a poll-driven
    /// callback registration.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, StoError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(id, method, params);
        let body = serde_json::to_string(&request)
            .map_err(|e| StoError::Internal(format!("encode request: {e}")))?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        self.writer
            .send(body)
            .map_err(|_| StoError::Transport("executor connection closed".to_string()))?;

        let response = rx
            .await
            .map_err(|_| StoError::Transport("executor connection closed".to_string()))?;

        match response.error {
            Some(err) => Err(StoError::ExecutorFailed(err.message)),
            None => {
                let result = response.result.unwrap_or(Value::Null);
                check_returncode(&result)?;
                Ok(result)
            }
        }
    }
}

/// The executor's result objects all carry a `returncode` field (spec.md
/// §6) independent of the JSON-RPC-level `error`: a POSIX call can fail
/// cleanly (e.g. `ENOENT`) without the sidecar raising a protocol error.
/// Surfacing that as `StoError::ExecutorFailed` lets a pipeline step's `?`
/// trigger rollback the same way a transport-level failure would (spec.md
/// §7, "ExecutorError").
fn check_returncode(result: &Value) -> Result<(), StoError> {
    match result.get("returncode").and_then(Value::as_i64) {
        Some(0) | None => Ok(()),
        Some(rc) => Err(StoError::ExecutorFailed(format!(
            "executor returned returncode {rc}"
        ))),
    }
}
