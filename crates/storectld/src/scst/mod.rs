//! The illustrative `scst` consumer domain (SPEC_FULL.md §11): a small,
//! in-memory "storage target" registry exercised through the same
//! component/object/op dispatch and pipeline machinery a real subsystem
//! would use. It exists to give every engine mechanism — rollback,
//! constructors, aliasing — a realized call site, not to model SCST's
//! actual sysfs configuration surface.

mod ops;
mod state;
mod steps;

use std::collections::HashMap;
use std::sync::Arc;

use sto_engine::{Operation, Registry};

use crate::context::RequestCtx;
use state::ScstState;

/// Registers the `subsystem.scst` object and its operations, plus the
/// `module.scst` alias pointing back at it, on `registry`.
pub fn register(registry: &mut Registry<RequestCtx>) {
    let state = Arc::new(std::sync::Mutex::new(ScstState::default()));

    let mut scst_ops: HashMap<String, Arc<dyn Operation<RequestCtx> + Send + Sync>> =
        HashMap::new();
    scst_ops.insert("config".to_string(), Arc::new(ops::ConfigOp::new(state.clone())));
    scst_ops.insert("init".to_string(), Arc::new(ops::InitOp::new(state.clone())));
    scst_ops.insert("write".to_string(), Arc::new(ops::WriteOp));
    scst_ops.insert("read".to_string(), Arc::new(ops::ReadOp));
    scst_ops.insert("readlink".to_string(), Arc::new(ops::ReadlinkOp));
    scst_ops.insert("readdir".to_string(), Arc::new(ops::ReaddirOp));
    scst_ops.insert(
        "create_target".to_string(),
        Arc::new(ops::CreateTargetOp::new(state.clone())),
    );
    scst_ops.insert("snapshot".to_string(), Arc::new(ops::SnapshotOp::new(state)));

    registry.register_object("subsystem", "scst", scst_ops);
    registry.register_alias("module", "scst", "subsystem", "scst");
}
