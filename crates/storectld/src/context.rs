use std::sync::Arc;

use serde_json::Value;
use sto_rpc::Pool;

/// Per-request state threaded through a pipeline's steps: a handle to the
/// executor connection pool every step may call through, and the
/// response body being assembled as steps complete. Steps read and
/// mutate this directly rather than returning values up through the
/// scheduler, mirroring how `sto_req_context`'s `priv` buffer accumulated
/// a request's working state across its action queue in the original.
pub struct RequestCtx {
    executor: Arc<Pool>,
    result: Value,
}

impl RequestCtx {
    pub fn new(executor: Arc<Pool>) -> Self {
        Self {
            executor,
            result: Value::Object(serde_json::Map::new()),
        }
    }

    pub fn executor(&self) -> &Arc<Pool> {
        &self.executor
    }

    /// Merges `fields` into the response body under construction. Later
    /// steps calling this with overlapping keys simply overwrite earlier
    /// ones, same as repeated assignment into a single JSON object.
    pub fn merge_result(&mut self, fields: Value) {
        if let (Value::Object(base), Value::Object(extra)) = (&mut self.result, fields) {
            for (key, value) in extra {
                base.insert(key, value);
            }
        }
    }

    pub fn take_result(self) -> Value {
        self.result
    }

    /// Reads a single field already accumulated in the response body, for
    /// steps that append to a collection another step started (the
    /// `snapshot` constructor's per-target `describe` steps build up a
    /// `targets` array this way).
    pub fn result_field(&self, key: &str) -> Option<&Value> {
        self.result.as_object().and_then(|m| m.get(key))
    }
}
