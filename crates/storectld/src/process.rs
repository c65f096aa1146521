use std::path::Path;
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::warn;

use crate::error::DaemonError;

/// Spawns the executor sidecar binary, retrying on the same transient
/// "text file busy" condition `claude_code::process::spawn_with_retry`
/// guards against — a binary that was mid-write by a package manager or
/// build step at the moment this daemon started.
pub(crate) fn spawn_executor_with_retry(
    command: &mut Command,
    binary: &Path,
) -> Result<Child, DaemonError> {
    let mut backoff = Duration::from_millis(2);
    for attempt in 0..5 {
        match command.spawn() {
            Ok(child) => return Ok(child),
            Err(source) => {
                let is_busy = matches!(source.kind(), std::io::ErrorKind::ExecutableFileBusy)
                    || source.raw_os_error() == Some(26);
                if is_busy && attempt < 4 {
                    warn!(attempt, "executor binary busy, retrying spawn");
                    std::thread::sleep(backoff);
                    backoff = std::cmp::min(backoff * 2, Duration::from_millis(50));
                    continue;
                }
                return Err(DaemonError::ExecutorSpawn {
                    binary: binary.to_path_buf(),
                    source,
                });
            }
        }
    }

    unreachable!("spawn_executor_with_retry should return before exhausting retries")
}
