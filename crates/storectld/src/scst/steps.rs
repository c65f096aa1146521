use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use sto_engine::{PendingSteps, PipelineStep, StoError};
use sto_wire::SubprocessParams;

use crate::context::RequestCtx;

use super::state::{ScstState, Target};

/// Forward: asks the executor sidecar to create the target's backing
/// directory. Rollback: asks it to remove the same directory. This is
/// the "create-dir step with a remove-dir rollback" SPEC_FULL.md §11
/// calls for — the first half of `create_target`'s two-step chain.
pub(super) struct CreateDirStep {
    pub target: Target,
}

#[async_trait]
impl PipelineStep<RequestCtx> for CreateDirStep {
    fn name(&self) -> &str {
        "scst.create_target.mkdir"
    }

    async fn execute(
        &self,
        ctx: &mut RequestCtx,
        _pending: &mut PendingSteps<'_, RequestCtx>,
    ) -> Result<(), StoError> {
        let params = SubprocessParams {
            cmd: vec!["mkdir".to_string(), "-p".to_string(), self.target.path.clone()],
            capture_output: false,
        };
        ctx.executor()
            .call("subprocess", serde_json::to_value(&params).unwrap())
            .await?;
        Ok(())
    }

    async fn rollback(&self, ctx: &mut RequestCtx) -> Result<(), StoError> {
        let params = SubprocessParams {
            cmd: vec!["rmdir".to_string(), self.target.path.clone()],
            capture_output: false,
        };
        ctx.executor()
            .call("subprocess", serde_json::to_value(&params).unwrap())
            .await?;
        Ok(())
    }
}

/// Forward: registers the target in the in-memory config, failing with
/// `AlreadyExists` if the name is already taken. This is the step whose
/// failure rolls `CreateDirStep` back — SPEC_FULL.md §11's "write-config
/// step that can fail".
pub(super) struct WriteConfigStep {
    pub state: Arc<Mutex<ScstState>>,
    pub target: Target,
}

#[async_trait]
impl PipelineStep<RequestCtx> for WriteConfigStep {
    fn name(&self) -> &str {
        "scst.create_target.write_config"
    }

    async fn execute(
        &self,
        ctx: &mut RequestCtx,
        _pending: &mut PendingSteps<'_, RequestCtx>,
    ) -> Result<(), StoError> {
        let mut state = self.state.lock().unwrap();
        if state.targets.contains_key(&self.target.name) {
            return Err(StoError::AlreadyExists(self.target.name.clone()));
        }
        state
            .targets
            .insert(self.target.name.clone(), self.target.clone());
        drop(state);

        ctx.merge_result(json!({ "target": self.target.name }));
        Ok(())
    }
}

/// One child step per enumerated target, pushed by `SnapshotOp`'s
/// constructor step. Grounds SPEC_FULL.md §11's "inserting one `describe`
/// step per element".
pub(super) struct DescribeStep {
    pub target: Target,
}

#[async_trait]
impl PipelineStep<RequestCtx> for DescribeStep {
    fn name(&self) -> &str {
        "scst.snapshot.describe"
    }

    async fn execute(
        &self,
        ctx: &mut RequestCtx,
        _pending: &mut PendingSteps<'_, RequestCtx>,
    ) -> Result<(), StoError> {
        let mut entries = ctx
            .result_field("targets")
            .and_then(|v| v.as_array().cloned())
            .unwrap_or_default();
        entries.push(json!({ "name": self.target.name, "path": self.target.path }));
        ctx.merge_result(json!({ "targets": entries }));
        Ok(())
    }
}
