use std::collections::VecDeque;
use std::fmt;

use async_trait::async_trait;
use tracing::{error, warn};

use crate::error::StoError;

/// Classifies a step the way `sto_pipeline_action_alloc` classifies
/// `STO_PL_ACTION_NORMAL` vs `STO_PL_ACTION_CONSTRUCTOR`: a `Basic` step
/// runs once and, on success, becomes rollback-eligible; a `Constructor`
/// step is expected to push zero or more child steps onto the queue
/// before it returns (the fan-out `create_target`/`snapshot` operations in
/// the `scst` module use this); a `Terminator` step closes out a chain and
/// never gets an associated rollback pushed, even on success.
///
/// This is bookkeeping for logging and for `Pipeline::run`'s invariants —
/// it isn't required for dispatch, since `execute`/`rollback` are plain
/// async methods either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Basic,
    Constructor,
    Terminator,
}

/// A handle a running step uses to enqueue further steps before it
/// returns. `sto_pipeline.c`'s constructor actions call
/// `sto_pipeline_add_step`/`sto_pipeline_add_steps` mid-execution to fan a
/// single logical operation out into several queued actions (for example
/// one child action per directory entry enumerated by a `snapshot`).
///
/// Steps pushed here land in a side buffer, not directly on the run
/// queue: `Pipeline::run` splices that buffer onto the *front* of
/// `action_queue_todo` once the constructor returns, so the fan-out
/// children run before any trailing step that was already queued behind
/// the constructor — mirroring `sto_pipeline_add_step`'s insert-at-head
/// semantics for the currently-executing action's children.
pub struct PendingSteps<'a, Ctx: Send> {
    inserted: &'a mut VecDeque<Box<dyn PipelineStep<Ctx>>>,
}

impl<'a, Ctx: Send> PendingSteps<'a, Ctx> {
    pub fn push(&mut self, step: Box<dyn PipelineStep<Ctx>>) {
        self.inserted.push_back(step);
    }

    pub fn push_all<I>(&mut self, steps: I)
    where
        I: IntoIterator<Item = Box<dyn PipelineStep<Ctx>>>,
    {
        for step in steps {
            self.push(step);
        }
    }
}

/// One step of a pipeline's forward chain. `Ctx` is the request-scoped
/// state the step reads and mutates (outbound RPC handles, accumulated
/// results, the response under construction).
///
/// `execute` runs forward; on `Ok(())` the step becomes eligible for
/// rollback (pushed onto the rollback stack) unless its `kind()` is
/// `Terminator`. `rollback` undoes a step that has already run
/// successfully, invoked in LIFO order when a later step in the same
/// pipeline fails (spec.md §4.D.4/§8: "exactly one rollback per
/// successfully executed action, run in reverse order").
#[async_trait]
pub trait PipelineStep<Ctx: Send>: Send + Sync {
    fn kind(&self) -> StepKind {
        StepKind::Basic
    }

    fn name(&self) -> &str;

    async fn execute(
        &self,
        ctx: &mut Ctx,
        pending: &mut PendingSteps<'_, Ctx>,
    ) -> Result<(), StoError>;

    async fn rollback(&self, _ctx: &mut Ctx) -> Result<(), StoError> {
        Ok(())
    }
}

impl<Ctx: Send> fmt::Debug for dyn PipelineStep<Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineStep")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .finish()
    }
}

/// A single request's forward/rollback action queues (the per-request
/// analog of `struct sto_pipeline`'s `action_queue` +
/// `action_queue_todo` + `rollback_stack` + `cur_rollback` in
/// `sto_pipeline.c`). `run` drives it to completion: the whole pipeline
/// executes on the thread that calls `run`, matching the single-reactor
/// invariant the original's poller enforced by construction.
pub struct Pipeline<Ctx: Send> {
    todo: VecDeque<Box<dyn PipelineStep<Ctx>>>,
    rollback_stack: Vec<Box<dyn PipelineStep<Ctx>>>,
}

impl<Ctx: Send> Pipeline<Ctx> {
    pub fn new() -> Self {
        Self {
            todo: VecDeque::new(),
            rollback_stack: Vec::new(),
        }
    }

    /// Mirrors `sto_pipeline_add_step`.
    pub fn add_step(&mut self, step: Box<dyn PipelineStep<Ctx>>) {
        self.todo.push_back(step);
    }

    /// Mirrors `sto_pipeline_add_steps`.
    pub fn add_steps<I>(&mut self, steps: I)
    where
        I: IntoIterator<Item = Box<dyn PipelineStep<Ctx>>>,
    {
        for step in steps {
            self.add_step(step);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.todo.is_empty()
    }

    /// Runs every queued step in FIFO order. On the first failure, rolls
    /// back every step that has already succeeded, in LIFO order
    /// (`pipeline_action_finish`'s branch into `pipeline_rollback_execute`
    /// when `pipe->error != 0`), then returns the original error — a
    /// rollback failure is reported distinctly so it isn't mistaken for
    /// the forward error that triggered it.
    pub async fn run(&mut self, ctx: &mut Ctx) -> Result<(), StoError> {
        loop {
            let step = match self.todo.pop_front() {
                Some(step) => step,
                None => return Ok(()),
            };
            let name = step.name().to_string();

            let mut inserted = VecDeque::new();
            let mut pending = PendingSteps {
                inserted: &mut inserted,
            };
            let outcome = step.execute(ctx, &mut pending).await;

            match outcome {
                Ok(()) => {
                    while let Some(child) = inserted.pop_back() {
                        self.todo.push_front(child);
                    }
                    if step.kind() != StepKind::Terminator {
                        self.rollback_stack.push(step);
                    }
                }
                Err(err) => {
                    warn!(
                        step = %name,
                        error = %err,
                        "pipeline step failed, rolling back completed steps"
                    );
                    self.unwind(ctx).await?;
                    return Err(err);
                }
            }
        }
    }

    async fn unwind(&mut self, ctx: &mut Ctx) -> Result<(), StoError> {
        while let Some(step) = self.rollback_stack.pop() {
            let name = step.name().to_string();
            if let Err(err) = step.rollback(ctx).await {
                error!(step = %name, error = %err, "rollback action failed");
                return Err(StoError::RollbackFailed(err.to_string()));
            }
        }
        Ok(())
    }
}

impl<Ctx: Send> Default for Pipeline<Ctx> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Trace(Arc<Mutex<Vec<String>>>);

    struct RecordingStep {
        name: &'static str,
        fail: bool,
        trace: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl PipelineStep<Trace> for RecordingStep {
        fn name(&self) -> &str {
            self.name
        }

        async fn execute(
            &self,
            ctx: &mut Trace,
            _pending: &mut PendingSteps<'_, Trace>,
        ) -> Result<(), StoError> {
            ctx.0.lock().unwrap().push(format!("forward:{}", self.name));
            if self.fail {
                return Err(StoError::StepFailed(self.name.to_string()));
            }
            Ok(())
        }

        async fn rollback(&self, ctx: &mut Trace) -> Result<(), StoError> {
            ctx.0.lock().unwrap().push(format!("rollback:{}", self.name));
            Ok(())
        }
    }

    struct FanOutStep {
        children: Vec<&'static str>,
        trace: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl PipelineStep<Trace> for FanOutStep {
        fn kind(&self) -> StepKind {
            StepKind::Constructor
        }

        fn name(&self) -> &str {
            "fan_out"
        }

        async fn execute(
            &self,
            ctx: &mut Trace,
            pending: &mut PendingSteps<'_, Trace>,
        ) -> Result<(), StoError> {
            ctx.0.lock().unwrap().push("forward:fan_out".to_string());
            for &child in &self.children {
                pending.push(Box::new(RecordingStep {
                    name: child,
                    fail: false,
                    trace: self.trace.clone(),
                }));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn runs_steps_in_fifo_order() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline: Pipeline<Trace> = Pipeline::new();
        pipeline.add_steps(vec![
            Box::new(RecordingStep {
                name: "a",
                fail: false,
                trace: trace.clone(),
            }) as Box<dyn PipelineStep<Trace>>,
            Box::new(RecordingStep {
                name: "b",
                fail: false,
                trace: trace.clone(),
            }),
        ]);

        let mut ctx = Trace(trace.clone());
        pipeline.run(&mut ctx).await.unwrap();

        assert_eq!(*trace.lock().unwrap(), vec!["forward:a", "forward:b"]);
    }

    #[tokio::test]
    async fn rolls_back_in_lifo_order_on_failure() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline: Pipeline<Trace> = Pipeline::new();
        pipeline.add_steps(vec![
            Box::new(RecordingStep {
                name: "a",
                fail: false,
                trace: trace.clone(),
            }) as Box<dyn PipelineStep<Trace>>,
            Box::new(RecordingStep {
                name: "b",
                fail: false,
                trace: trace.clone(),
            }),
            Box::new(RecordingStep {
                name: "c",
                fail: true,
                trace: trace.clone(),
            }),
        ]);

        let mut ctx = Trace(trace.clone());
        let err = pipeline.run(&mut ctx).await.unwrap_err();
        assert_eq!(err, StoError::StepFailed("c".to_string()));

        assert_eq!(
            *trace.lock().unwrap(),
            vec![
                "forward:a",
                "forward:b",
                "forward:c",
                "rollback:b",
                "rollback:a",
            ]
        );
    }

    #[tokio::test]
    async fn constructor_step_inserts_children_mid_run() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline: Pipeline<Trace> = Pipeline::new();
        pipeline.add_step(Box::new(FanOutStep {
            children: vec!["child1", "child2"],
            trace: trace.clone(),
        }));

        let mut ctx = Trace(trace.clone());
        pipeline.run(&mut ctx).await.unwrap();

        assert_eq!(
            *trace.lock().unwrap(),
            vec!["forward:fan_out", "forward:child1", "forward:child2"]
        );
    }
}
