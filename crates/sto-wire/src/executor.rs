use serde::{Deserialize, Serialize};

/// Params for the executor's `writefile` method. Mirrors
/// `sto_rpc_writefile_params` / `sto_rpc_writefile_info_json` in
/// `examples/original_source/control/src/server_rpc/sto_rpc_aio.c`: `oflag`
/// is the raw `open(2)` flag bitmask the executor passes straight through
/// (e.g. `O_CREAT|O_TRUNC|O_SYNC` for config writes, spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WritefileParams {
    pub filepath: String,
    pub oflag: i32,
    pub buf: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WritefileResult {
    pub returncode: i32,
}

/// Params for the executor's `readfile` method. `size == 0` tells the
/// executor to `stat` the file first and read its full length (spec.md §6,
/// exercised by §8 scenario 2); mirrors `sto_rpc_readfile_params`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadfileParams {
    pub filepath: String,
    pub size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadfileResult {
    pub returncode: i32,
    #[serde(default)]
    pub buf: String,
}

/// Params for the executor's `readlink` method. Mirrors the third
/// `sto_rpc_*_info_json` writer in `sto_rpc_aio.c`, which emits only
/// `filepath`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadlinkParams {
    pub filepath: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadlinkResult {
    pub returncode: i32,
    #[serde(default)]
    pub buf: String,
}

/// Params for the executor's `readdir` method. `skip_hidden` mirrors
/// `sto_rpc_readdir_params`' flag of the same name in
/// `examples/original_source/control/src/client/sto_rpc_readdir.c`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaddirParams {
    pub dirpath: String,
    #[serde(default)]
    pub skip_hidden: bool,
}

/// One directory entry. `mode` is the raw `st_mode` bitmask the executor
/// read via `stat(2)`, mirroring `struct sto_dirent`'s `{name, mode}` pair
/// decoded in `sto_rpc_readdir.c`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dirent {
    pub name: String,
    pub mode: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaddirResult {
    pub returncode: i32,
    #[serde(default)]
    pub dirents: Vec<Dirent>,
}

/// Params for the executor's `subprocess` method. Mirrors
/// `sto_rpc_subprocess_params`' `{cmd, capture_output}` pair in
/// `examples/original_source/control/src/server_rpc/sto_rpc_subprocess.c`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubprocessParams {
    pub cmd: Vec<String>,
    #[serde(default)]
    pub capture_output: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubprocessResult {
    pub returncode: i32,
    #[serde(default)]
    pub output: Option<String>,
}
