use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::error::StoError;
use crate::pipeline::Pipeline;

/// Bounds alias-resolution chains. Mirrors the cycle guard implied by
/// `sto_module_find`/`sto_module_find_ops`'s linear TAILQ scans in
/// `sto_module.c`: the original trusted static registration to never
/// cycle, but a registry built at runtime from (possibly generated)
/// module tables can't assume that, so resolution here is bounded
/// explicitly instead.
const MAX_ALIAS_HOPS: usize = 16;

/// Builds the pipeline for one (component, object, op) triple. Each
/// concrete operation owns the decision of which steps to queue for a
/// given `params` body — this is the Rust analog of `sto_module_decode_ops`
/// handing off to a request type's own `parse_params`/`exec` pair.
#[async_trait]
pub trait Operation<Ctx: Send>: Send + Sync {
    async fn build(&self, params: Value) -> Result<Pipeline<Ctx>, StoError>;
}

/// An object either owns a table of operations or is an alias to another
/// (component, object) pair. Mirrors the `module`/`subsystem` duality in
/// `sto_module.c`, where `module` objects are frequently thin aliases onto
/// the concrete `subsystem` implementation (SPEC_FULL.md §11's
/// `(module, scst)` → `(subsystem, scst)` alias is the motivating case).
enum ObjectEntry<Ctx: Send> {
    Ops(HashMap<String, Arc<dyn Operation<Ctx> + Send + Sync>>),
    Alias {
        component: String,
        object: String,
    },
}

/// The component → object → operation registry. Populated once at
/// startup (replacing the original's `STO_CORE_COMPONENT_REGISTER`
/// link-time registration with explicit calls during `storectld`
/// bootstrap — Design Note §9, "Static registration → explicit startup
/// wiring") and read-only thereafter, so lookups need no locking.
pub struct Registry<Ctx: Send> {
    components: HashMap<String, HashMap<String, ObjectEntry<Ctx>>>,
}

impl<Ctx: Send + 'static> Registry<Ctx> {
    pub fn new() -> Self {
        Self {
            components: HashMap::new(),
        }
    }

    pub fn component_names(&self) -> Vec<&str> {
        self.components.keys().map(String::as_str).collect()
    }

    /// Registers a concrete object exposing `ops` under `component`.
    pub fn register_object(
        &mut self,
        component: impl Into<String>,
        object: impl Into<String>,
        ops: HashMap<String, Arc<dyn Operation<Ctx> + Send + Sync>>,
    ) {
        self.components
            .entry(component.into())
            .or_default()
            .insert(object.into(), ObjectEntry::Ops(ops));
    }

    /// Registers `(component, object)` as an alias resolving to
    /// `(target_component, target_object)`. Mirrors the `module` component
    /// pointing at a `subsystem` object of the same name.
    pub fn register_alias(
        &mut self,
        component: impl Into<String>,
        object: impl Into<String>,
        target_component: impl Into<String>,
        target_object: impl Into<String>,
    ) {
        self.components
            .entry(component.into())
            .or_default()
            .insert(
                object.into(),
                ObjectEntry::Alias {
                    component: target_component.into(),
                    object: target_object.into(),
                },
            );
    }

    /// Resolves `(component, object, op)` to a concrete operation,
    /// following aliases until a `Ops` entry is found or
    /// `MAX_ALIAS_HOPS` is exceeded.
    pub fn resolve(
        &self,
        component: &str,
        object: &str,
        op: &str,
    ) -> Result<Arc<dyn Operation<Ctx> + Send + Sync>, StoError> {
        let mut cur_component = component.to_string();
        let mut cur_object = object.to_string();

        for _ in 0..MAX_ALIAS_HOPS {
            let objects = match self.components.get(&cur_component) {
                Some(objects) => objects,
                None => {
                    warn!(component = %cur_component, "dispatch: unknown component");
                    return Err(StoError::UnknownComponent(cur_component));
                }
            };

            let entry = match objects.get(&cur_object) {
                Some(entry) => entry,
                None => {
                    warn!(
                        component = %cur_component,
                        object = %cur_object,
                        "dispatch: unknown object"
                    );
                    return Err(StoError::UnknownObject {
                        component: cur_component,
                        object: cur_object,
                    });
                }
            };

            match entry {
                ObjectEntry::Ops(ops) => {
                    return ops.get(op).cloned().ok_or_else(|| {
                        warn!(object = %cur_object, op, "dispatch: unknown operation");
                        StoError::UnknownOp {
                            object: cur_object.clone(),
                            op: op.to_string(),
                        }
                    });
                }
                ObjectEntry::Alias {
                    component: next_component,
                    object: next_object,
                } => {
                    cur_component = next_component.clone();
                    cur_object = next_object.clone();
                }
            }
        }

        warn!(component, object, "dispatch: alias resolution exceeded hop limit");
        Err(StoError::AliasCycle(format!("{component}.{object}")))
    }
}

impl<Ctx: Send + 'static> Default for Registry<Ctx> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{PendingSteps, PipelineStep, StepKind};

    struct NoopStep;

    #[async_trait]
    impl PipelineStep<()> for NoopStep {
        fn name(&self) -> &str {
            "noop"
        }

        async fn execute(
            &self,
            _ctx: &mut (),
            _pending: &mut PendingSteps<'_, ()>,
        ) -> Result<(), StoError> {
            Ok(())
        }
    }

    struct NoopOp;

    #[async_trait]
    impl Operation<()> for NoopOp {
        async fn build(&self, _params: Value) -> Result<Pipeline<()>, StoError> {
            let mut pipeline = Pipeline::new();
            pipeline.add_step(Box::new(NoopStep));
            Ok(pipeline)
        }
    }

    fn registry_with_scst() -> Registry<()> {
        let mut registry: Registry<()> = Registry::new();
        let mut ops: HashMap<String, Arc<dyn Operation<()> + Send + Sync>> = HashMap::new();
        ops.insert("config".to_string(), Arc::new(NoopOp));
        registry.register_object("subsystem", "scst", ops);
        registry.register_alias("module", "scst", "subsystem", "scst");
        registry
    }

    #[test]
    fn resolves_concrete_operation() {
        let registry = registry_with_scst();
        assert!(registry.resolve("subsystem", "scst", "config").is_ok());
    }

    #[test]
    fn resolves_through_one_alias_hop() {
        let registry = registry_with_scst();
        assert!(registry.resolve("module", "scst", "config").is_ok());
    }

    #[test]
    fn unknown_component_is_reported() {
        let registry = registry_with_scst();
        let err = registry.resolve("bogus", "scst", "config").unwrap_err();
        assert!(matches!(err, StoError::UnknownComponent(ref c) if c == "bogus"));
    }

    #[test]
    fn alias_cycle_is_bounded() {
        let mut registry: Registry<()> = Registry::new();
        registry.register_alias("a", "x", "b", "x");
        registry.register_alias("b", "x", "a", "x");
        let err = registry.resolve("a", "x", "op").unwrap_err();
        assert!(matches!(err, StoError::AliasCycle(_)));
    }
}
