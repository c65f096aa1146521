use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use sto_engine::{Operation, PendingSteps, Pipeline, PipelineStep, StepKind, StoError};
use sto_wire::{ReaddirParams, ReadfileParams, ReadlinkParams, WritefileParams};

use crate::context::RequestCtx;

use super::state::{ScstState, Target};
use super::steps::{CreateDirStep, DescribeStep, WriteConfigStep};

/// Dumps the module's in-memory state as JSON. Mirrors `config_mod.c`'s
/// "config" operation, minus the on-disk persistence step.
pub(super) struct ConfigOp {
    state: Arc<Mutex<ScstState>>,
}

impl ConfigOp {
    pub(super) fn new(state: Arc<Mutex<ScstState>>) -> Self {
        Self { state }
    }
}

struct DumpConfigStep {
    state: Arc<Mutex<ScstState>>,
}

#[async_trait]
impl PipelineStep<RequestCtx> for DumpConfigStep {
    fn name(&self) -> &str {
        "scst.config.dump"
    }

    async fn execute(
        &self,
        ctx: &mut RequestCtx,
        _pending: &mut PendingSteps<'_, RequestCtx>,
    ) -> Result<(), StoError> {
        let snapshot = self.state.lock().unwrap().clone();
        ctx.merge_result(
            serde_json::to_value(&snapshot).map_err(|e| StoError::Internal(e.to_string()))?,
        );
        Ok(())
    }
}

#[async_trait]
impl Operation<RequestCtx> for ConfigOp {
    async fn build(&self, _params: Value) -> Result<Pipeline<RequestCtx>, StoError> {
        let mut pipeline = Pipeline::new();
        pipeline.add_step(Box::new(DumpConfigStep {
            state: self.state.clone(),
        }));
        Ok(pipeline)
    }
}

/// Restores state from a previously dumped config file, read through the
/// executor sidecar. A target directory that already exists on disk is
/// expected on a restart, not an error — mirroring spec.md §7's
/// AlreadyExists-to-success downgrade for idempotent setup operations.
pub(super) struct InitOp {
    state: Arc<Mutex<ScstState>>,
}

impl InitOp {
    pub(super) fn new(state: Arc<Mutex<ScstState>>) -> Self {
        Self { state }
    }
}

#[derive(Deserialize)]
struct InitParams {
    path: String,
}

struct InitStep {
    state: Arc<Mutex<ScstState>>,
    path: String,
}

#[async_trait]
impl PipelineStep<RequestCtx> for InitStep {
    fn name(&self) -> &str {
        "scst.init.restore"
    }

    async fn execute(
        &self,
        ctx: &mut RequestCtx,
        _pending: &mut PendingSteps<'_, RequestCtx>,
    ) -> Result<(), StoError> {
        let params = ReadfileParams {
            filepath: self.path.clone(),
            size: 0,
        };
        let raw = ctx
            .executor()
            .call("readfile", serde_json::to_value(&params).unwrap())
            .await?;

        let data = raw
            .get("buf")
            .and_then(Value::as_str)
            .ok_or_else(|| StoError::WrongType {
                field: "buf".to_string(),
                expected: "string",
            })?;

        let restored: ScstState =
            serde_json::from_str(data).map_err(|e| StoError::Internal(e.to_string()))?;

        for target in restored.targets.values() {
            let params = sto_wire::SubprocessParams {
                cmd: vec!["mkdir".to_string(), "-p".to_string(), target.path.clone()],
                capture_output: false,
            };
            match ctx
                .executor()
                .call("subprocess", serde_json::to_value(&params).unwrap())
                .await
            {
                Ok(_) => {}
                Err(StoError::AlreadyExists(_)) => {}
                Err(StoError::ExecutorFailed(msg)) if msg.to_lowercase().contains("exist") => {}
                Err(other) => return Err(other),
            }
        }

        *self.state.lock().unwrap() = restored;
        ctx.merge_result(json!({ "restored": true }));
        Ok(())
    }
}

#[async_trait]
impl Operation<RequestCtx> for InitOp {
    async fn build(&self, params: Value) -> Result<Pipeline<RequestCtx>, StoError> {
        let parsed: InitParams =
            serde_json::from_value(params).map_err(|e| StoError::Internal(e.to_string()))?;
        let mut pipeline = Pipeline::new();
        pipeline.add_step(Box::new(InitStep {
            state: self.state.clone(),
            path: parsed.path,
        }));
        Ok(pipeline)
    }
}

/// A thin pass-through step that forwards `params` to `method` on the
/// executor sidecar and merges its JSON reply into the response.
struct PassThroughStep {
    method: &'static str,
    params: Value,
}

#[async_trait]
impl PipelineStep<RequestCtx> for PassThroughStep {
    fn name(&self) -> &str {
        self.method
    }

    fn kind(&self) -> StepKind {
        StepKind::Terminator
    }

    async fn execute(
        &self,
        ctx: &mut RequestCtx,
        _pending: &mut PendingSteps<'_, RequestCtx>,
    ) -> Result<(), StoError> {
        let result = ctx.executor().call(self.method, self.params.clone()).await?;
        ctx.merge_result(result);
        Ok(())
    }
}

macro_rules! pass_through_op {
    ($op_name:ident, $method:literal, $params_ty:ty) => {
        pub(super) struct $op_name;

        #[async_trait]
        impl Operation<RequestCtx> for $op_name {
            async fn build(&self, params: Value) -> Result<Pipeline<RequestCtx>, StoError> {
                let typed: $params_ty = serde_json::from_value(params)
                    .map_err(|e| StoError::Internal(e.to_string()))?;
                let mut pipeline = Pipeline::new();
                pipeline.add_step(Box::new(PassThroughStep {
                    method: $method,
                    params: serde_json::to_value(&typed).unwrap(),
                }));
                Ok(pipeline)
            }
        }
    };
}

pass_through_op!(WriteOp, "writefile", WritefileParams);
pass_through_op!(ReadOp, "readfile", ReadfileParams);
pass_through_op!(ReadlinkOp, "readlink", ReadlinkParams);
pass_through_op!(ReaddirOp, "readdir", ReaddirParams);

/// Demonstrates rollback: a create-dir step paired with a remove-dir
/// rollback, followed by a write-config step that can fail and unwind it
/// (SPEC_FULL.md §11).
pub(super) struct CreateTargetOp {
    state: Arc<Mutex<ScstState>>,
}

impl CreateTargetOp {
    pub(super) fn new(state: Arc<Mutex<ScstState>>) -> Self {
        Self { state }
    }
}

#[derive(Deserialize)]
struct CreateTargetParams {
    name: String,
    path: String,
}

#[async_trait]
impl Operation<RequestCtx> for CreateTargetOp {
    async fn build(&self, params: Value) -> Result<Pipeline<RequestCtx>, StoError> {
        let parsed: CreateTargetParams =
            serde_json::from_value(params).map_err(|e| StoError::Internal(e.to_string()))?;
        let target = Target {
            name: parsed.name,
            path: parsed.path,
        };

        let mut pipeline = Pipeline::new();
        pipeline.add_step(Box::new(CreateDirStep {
            target: target.clone(),
        }));
        pipeline.add_step(Box::new(WriteConfigStep {
            state: self.state.clone(),
            target,
        }));
        Ok(pipeline)
    }
}

/// A constructor-based operation: its single step enumerates the current
/// target list and pushes one `DescribeStep` per entry onto the same
/// pipeline before returning (SPEC_FULL.md §11's `snapshot` scenario).
struct EnumerateTargetsStep {
    state: Arc<Mutex<ScstState>>,
}

#[async_trait]
impl PipelineStep<RequestCtx> for EnumerateTargetsStep {
    fn kind(&self) -> StepKind {
        StepKind::Constructor
    }

    fn name(&self) -> &str {
        "scst.snapshot.enumerate"
    }

    async fn execute(
        &self,
        ctx: &mut RequestCtx,
        pending: &mut PendingSteps<'_, RequestCtx>,
    ) -> Result<(), StoError> {
        ctx.merge_result(json!({ "targets": Vec::<Value>::new() }));
        let targets: Vec<Target> = self.state.lock().unwrap().targets.values().cloned().collect();
        pending.push_all(
            targets
                .into_iter()
                .map(|target| Box::new(DescribeStep { target }) as Box<dyn PipelineStep<RequestCtx>>),
        );
        Ok(())
    }
}

pub(super) struct SnapshotOp {
    state: Arc<Mutex<ScstState>>,
}

impl SnapshotOp {
    pub(super) fn new(state: Arc<Mutex<ScstState>>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Operation<RequestCtx> for SnapshotOp {
    async fn build(&self, _params: Value) -> Result<Pipeline<RequestCtx>, StoError> {
        let mut pipeline = Pipeline::new();
        pipeline.add_step(Box::new(EnumerateTargetsStep {
            state: self.state.clone(),
        }));
        Ok(pipeline)
    }
}
