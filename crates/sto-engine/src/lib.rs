#![forbid(unsafe_code)]
//! The control-plane engine: request dispatch, the pipeline scheduler, and
//! the ownership-aware hash map components build on.
//!
//! `hashmap` is component A, a from-scratch keyed container. `error` is
//! component B's fallible-pointer discipline reinterpreted as `Result`.
//! `pipeline` is component D, the single-threaded cooperative scheduler
//! that drives a request's forward/rollback action queues. `dispatch`
//! layers component/object/operation resolution (with alias support) on
//! top of `pipeline`'s `Operation` trait.

pub mod dispatch;
pub mod error;
pub mod hashmap;
pub mod pipeline;

pub use dispatch::{Operation, Registry};
pub use error::StoError;
pub use hashmap::{JenkinsHasher, StoHash};
pub use pipeline::{PendingSteps, Pipeline, PipelineStep, StepKind};
