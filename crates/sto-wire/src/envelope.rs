use serde_json::Value;

use crate::error::WireError;

/// The decoded form of an inbound control RPC's `params` object
/// (spec.md §6): the first field names the component and carries the
/// object name as its value, the second field must be `"op"`, and any
/// remaining fields are operation-specific. Field order is load-bearing —
/// component lookup has to happen before operation lookup — so this type
/// is built with `serde_json`'s `preserve_order` feature, which backs
/// `Value::Object` with an order-preserving map instead of a `BTreeMap`.
#[derive(Debug, Clone)]
pub struct ControlEnvelope {
    pub component_name: String,
    pub object_name: String,
    pub op_name: String,
    /// Everything in `params` after `{component}` and `op`, handed to the
    /// operation's params schema / constructor unchanged.
    pub rest: Value,
}

impl ControlEnvelope {
    /// Decode the `params` object of an inbound `control` JSON-RPC call.
    ///
    /// `known_components` lists the component field names the receiver
    /// recognizes (e.g. `["module", "subsystem"]`); the first key in
    /// `params` that matches one of them is taken as the component field.
    /// This mirrors `sto_module_parse`/`sto_json_decode_object_str` in
    /// `examples/original_source/control/src/sto_module.c`, which reads the
    /// first JSON object field by position rather than by name.
    pub fn decode(params: &Value, known_components: &[&str]) -> Result<Self, WireError> {
        let obj = params.as_object().ok_or(WireError::WrongType {
            field: "params",
            expected: "object",
        })?;

        let (component_name, object_value) = obj
            .iter()
            .find(|(key, _)| known_components.contains(&key.as_str()))
            .ok_or(WireError::MissingField {
                field: "<component>",
            })?;

        let object_name = object_value
            .as_str()
            .ok_or(WireError::WrongType {
                field: "<component>",
                expected: "string",
            })?
            .to_string();

        let op_name = obj
            .get("op")
            .ok_or(WireError::MissingField { field: "op" })?
            .as_str()
            .ok_or(WireError::WrongType {
                field: "op",
                expected: "string",
            })?
            .to_string();

        let mut rest = serde_json::Map::new();
        for (key, value) in obj.iter() {
            if key == component_name || key == "op" {
                continue;
            }
            rest.insert(key.clone(), value.clone());
        }

        Ok(Self {
            component_name: component_name.clone(),
            object_name,
            op_name,
            rest: Value::Object(rest),
        })
    }
}

/// The response to an inbound control RPC (spec.md §4.D.6).
#[derive(Debug, Clone)]
pub enum ControlResponse {
    Ok(Value),
    Failed { error: i32, msg: String },
}

impl ControlResponse {
    pub fn into_json(self) -> Value {
        match self {
            ControlResponse::Ok(mut body) => {
                if let Value::Object(ref mut map) = body {
                    map.insert("status".to_string(), Value::String("OK".to_string()));
                    Value::Object(map.clone())
                } else {
                    serde_json::json!({ "status": "OK", "result": body })
                }
            }
            ControlResponse::Failed { error, msg } => serde_json::json!({
                "status": "FAILED",
                "error": error,
                "msg": msg,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_component_object_op_in_order() {
        let params = serde_json::json!({
            "subsystem": "scst",
            "op": "snapshot",
            "extra": 1,
        });

        let envelope = ControlEnvelope::decode(&params, &["module", "subsystem"]).unwrap();
        assert_eq!(envelope.component_name, "subsystem");
        assert_eq!(envelope.object_name, "scst");
        assert_eq!(envelope.op_name, "snapshot");
        assert_eq!(envelope.rest, serde_json::json!({ "extra": 1 }));
    }

    #[test]
    fn missing_component_field_is_an_error() {
        let params = serde_json::json!({ "op": "snapshot" });
        let err = ControlEnvelope::decode(&params, &["module", "subsystem"]).unwrap_err();
        assert!(matches!(err, WireError::MissingField { field: "<component>" }));
    }

    #[test]
    fn ok_response_merges_status_into_object_body() {
        let resp = ControlResponse::Ok(serde_json::json!({ "buf": "hello" }));
        assert_eq!(
            resp.into_json(),
            serde_json::json!({ "status": "OK", "buf": "hello" })
        );
    }

    #[test]
    fn failed_response_shape() {
        let resp = ControlResponse::Failed {
            error: -5,
            msg: "Input/output error".to_string(),
        };
        assert_eq!(
            resp.into_json(),
            serde_json::json!({ "status": "FAILED", "error": -5, "msg": "Input/output error" })
        );
    }
}
