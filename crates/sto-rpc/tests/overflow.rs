//! Overflow-queue scenario from spec.md §8 #6: issue more concurrent
//! outbound calls than the pool's connection cap; the first `max_conns`
//! begin immediately, the rest queue, and every handler eventually fires
//! exactly once as connections free up.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use sto_rpc::Pool;
use sto_wire::{JsonRpcId, JsonRpcRequest, JsonRpcResponse};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;

/// A stand-in executor that holds each request open briefly before
/// replying, so that a small `max_conns` pool is forced to queue.
async fn spawn_slow_executor(socket_path: std::path::PathBuf, delay: Duration) {
    let listener = UnixListener::bind(&socket_path).unwrap();
    tokio::spawn(async move {
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(pair) => pair,
                Err(_) => break,
            };
            let delay = delay;
            tokio::spawn(async move {
                let (read_half, mut write_half) = stream.into_split();
                let mut reader = BufReader::new(read_half);
                let mut line = String::new();
                loop {
                    line.clear();
                    match reader.read_line(&mut line).await {
                        Ok(0) | Err(_) => break,
                        Ok(_) => {}
                    }
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    let request: JsonRpcRequest = serde_json::from_str(trimmed).unwrap();
                    tokio::time::sleep(delay).await;
                    let id: JsonRpcId = request.id;
                    let response =
                        JsonRpcResponse::ok(id, request.params.unwrap_or(json!(null)));
                    let body = serde_json::to_string(&response).unwrap();
                    if write_half.write_all(body.as_bytes()).await.is_err() {
                        break;
                    }
                    if write_half.write_all(b"\n").await.is_err() {
                        break;
                    }
                }
            });
        }
    });
}

#[tokio::test]
async fn excess_calls_queue_and_every_handler_fires_once() {
    const MAX_CONNS: usize = 4;
    const TOTAL: usize = MAX_CONNS + 3;

    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("executor.sock");
    spawn_slow_executor(socket_path.clone(), Duration::from_millis(30)).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    let pool = Arc::new(Pool::with_max_conns(socket_path, MAX_CONNS));
    let completed = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for i in 0..TOTAL {
        let pool = pool.clone();
        let completed = completed.clone();
        handles.push(tokio::spawn(async move {
            let result = pool.call("readfile", json!({ "n": i })).await.unwrap();
            assert_eq!(result["n"], i);
            completed.fetch_add(1, Ordering::SeqCst);
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(completed.load(Ordering::SeqCst), TOTAL);
}
