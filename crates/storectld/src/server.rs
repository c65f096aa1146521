use std::sync::Arc;

use sto_engine::{Registry, StoError};
use sto_wire::{ControlEnvelope, ControlResponse, JsonRpcRequest, JsonRpcResponse};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{info, warn};

use crate::context::RequestCtx;
use crate::error::DaemonError;

const KNOWN_COMPONENTS: &[&str] = &["subsystem", "module"];

/// Runs the control socket's accept loop. Every connection is served on
/// the same single-threaded runtime the daemon starts under (spec.md
/// §2/§8: "exactly one thread runs the reactor"); accepting connections
/// concurrently doesn't violate that invariant because nothing here
/// spawns a worker thread — `tokio::spawn` on a current-thread runtime
/// still multiplexes every task onto that one thread.
pub(crate) async fn serve(
    listener: UnixListener,
    registry: Arc<Registry<RequestCtx>>,
    executor: Arc<sto_rpc::Pool>,
) -> Result<(), DaemonError> {
    loop {
        let (stream, _addr) = listener.accept().await.map_err(|e| {
            DaemonError::BindControlSocket {
                path: "<accept>".into(),
                source: e,
            }
        })?;

        let registry = registry.clone();
        let executor = executor.clone();
        tokio::spawn(async move {
            if let Err(err) = serve_connection(stream, registry, executor).await {
                warn!(%err, "control connection ended with an error");
            }
        });
    }
}

async fn serve_connection(
    stream: UnixStream,
    registry: Arc<Registry<RequestCtx>>,
    executor: Arc<sto_rpc::Pool>,
) -> Result<(), DaemonError> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes = reader
            .read_line(&mut line)
            .await
            .map_err(|e| DaemonError::MalformedRequest(e.to_string()))?;
        if bytes == 0 {
            return Ok(());
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let request: JsonRpcRequest = match serde_json::from_str(trimmed) {
            Ok(req) => req,
            Err(err) => {
                warn!(%err, "malformed control request");
                continue;
            }
        };

        let response = handle_request(&request, &registry, &executor).await;
        let body = serde_json::to_string(&response)
            .map_err(|e| DaemonError::MalformedRequest(e.to_string()))?;
        write_half
            .write_all(body.as_bytes())
            .await
            .map_err(|e| DaemonError::MalformedRequest(e.to_string()))?;
        write_half
            .write_all(b"\n")
            .await
            .map_err(|e| DaemonError::MalformedRequest(e.to_string()))?;
    }
}

async fn handle_request(
    request: &JsonRpcRequest,
    registry: &Registry<RequestCtx>,
    executor: &Arc<sto_rpc::Pool>,
) -> JsonRpcResponse {
    let params = request.params.clone().unwrap_or(serde_json::Value::Null);

    let result = run_control_request(params, registry, executor).await;

    match result {
        Ok(body) => JsonRpcResponse::ok(request.id, ControlResponse::Ok(body).into_json()),
        Err(err) => {
            warn!(code = err.code(), detail = %err, "control request failed");
            JsonRpcResponse::ok(
                request.id,
                ControlResponse::Failed {
                    error: err.code(),
                    msg: err.strerror(),
                }
                .into_json(),
            )
        }
    }
}

async fn run_control_request(
    params: serde_json::Value,
    registry: &Registry<RequestCtx>,
    executor: &Arc<sto_rpc::Pool>,
) -> Result<serde_json::Value, StoError> {
    let envelope = ControlEnvelope::decode(&params, KNOWN_COMPONENTS)?;

    let operation = registry.resolve(
        &envelope.component_name,
        &envelope.object_name,
        &envelope.op_name,
    )?;

    let mut pipeline = operation.build(envelope.rest).await?;
    let mut ctx = RequestCtx::new(executor.clone());
    pipeline.run(&mut ctx).await?;

    info!(
        component = %envelope.component_name,
        object = %envelope.object_name,
        op = %envelope.op_name,
        "control request completed"
    );

    Ok(ctx.take_result())
}

pub(crate) fn bind_control_socket(path: &std::path::Path) -> Result<UnixListener, DaemonError> {
    if path.exists() {
        let _ = std::fs::remove_file(path);
    }
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    UnixListener::bind(path).map_err(|e| DaemonError::BindControlSocket {
        path: path.to_path_buf(),
        source: e,
    })
}
