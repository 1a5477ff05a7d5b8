//! JSON <-> JavaScript value conversions.
//!
//! Parameters arrive as JSON on the wire and cross into Boa as `JsValue`s;
//! results make the reverse trip. Mapping is structural: null/boolean/
//! number/string/array/object on both sides. `undefined` and symbols
//! collapse to JSON null on the way out; symbol-keyed properties are
//! skipped.

use boa_engine::object::builtins::JsArray;
use boa_engine::object::JsObject;
use boa_engine::property::PropertyKey;
use boa_engine::value::JsValue;
use boa_engine::{js_string, Context};
use serde_json::Value as JsonValue;

use runlet_common::protocol::error::{Result, RunletError};

/// Convert a `serde_json::Value` to a Boa `JsValue`, recursively.
pub fn json_to_js_value(json: JsonValue, ctx: &mut Context) -> Result<JsValue> {
    match json {
        JsonValue::Null => Ok(JsValue::null()),
        JsonValue::Bool(b) => Ok(JsValue::new(b)),
        JsonValue::Number(n) => n
            .as_f64()
            .map(JsValue::new)
            .or_else(|| n.as_i64().map(JsValue::new))
            .ok_or_else(|| RunletError::Parameter("Number out of range".into())),
        JsonValue::String(s) => Ok(JsValue::new(js_string!(s))),
        JsonValue::Array(arr) => {
            let js_array = JsArray::new(ctx);
            for (i, v) in arr.into_iter().enumerate() {
                let js_value = json_to_js_value(v, ctx)?;
                js_array.push(js_value, ctx).map_err(|e| {
                    RunletError::Execution(format!("Failed to push array element {i}: {e}"))
                })?;
            }
            Ok(js_array.into())
        }
        JsonValue::Object(obj) => {
            let js_obj = JsObject::with_object_proto(ctx.intrinsics());
            for (key, value) in obj {
                let js_value = json_to_js_value(value, ctx)?;
                js_obj
                    .create_data_property_or_throw(js_string!(key.clone()), js_value, ctx)
                    .map_err(|e| {
                        RunletError::Execution(format!("Failed to set property '{key}': {e}"))
                    })?;
            }
            Ok(js_obj.into())
        }
    }
}

/// Convert a Boa `JsValue` to a `serde_json::Value`, recursively.
pub fn js_value_to_json(value: JsValue, ctx: &mut Context) -> Result<JsonValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(JsonValue::Null);
    }

    if let Some(b) = value.as_boolean() {
        return Ok(JsonValue::Bool(b));
    }

    if value.is_integer() {
        let i = value.as_number().expect("integer value is a number") as i32;
        return Ok(JsonValue::Number(i.into()));
    }

    if let Some(n) = value.as_number() {
        return serde_json::Number::from_f64(n)
            .map(JsonValue::Number)
            .ok_or_else(|| RunletError::Execution("Result is not a valid JSON number".into()));
    }

    if let Some(s) = value.as_string() {
        return Ok(JsonValue::String(s.to_std_string().map_err(|e| {
            RunletError::Execution(format!("String conversion error: {e:?}"))
        })?));
    }

    if value.is_object() {
        let obj = value
            .as_object()
            .ok_or_else(|| RunletError::Execution("Object value without object handle".into()))?;

        if obj.is_array() {
            let array = JsArray::from_object(obj.clone())
                .map_err(|e| RunletError::Execution(format!("Invalid array result: {e}")))?;
            let length: usize = array
                .length(ctx)
                .map_err(|e| RunletError::Execution(format!("Failed to get array length: {e}")))?
                .try_into()
                .map_err(|_| RunletError::Execution("Array length overflow".into()))?;

            let mut result = Vec::with_capacity(length);
            for i in 0..length {
                let elem = array.get(i, ctx).map_err(|e| {
                    RunletError::Execution(format!("Failed to get array element {i}: {e}"))
                })?;
                result.push(js_value_to_json(elem, ctx)?);
            }
            return Ok(JsonValue::Array(result));
        }

        let keys = obj
            .own_property_keys(ctx)
            .map_err(|e| RunletError::Execution(format!("Failed to get object keys: {e}")))?;

        let mut result = serde_json::Map::new();
        for key in keys {
            let key_str = match &key {
                PropertyKey::String(s) => s.to_std_string().map_err(|e| {
                    RunletError::Execution(format!("String conversion error: {e:?}"))
                })?,
                PropertyKey::Index(i) => i.get().to_string(),
                PropertyKey::Symbol(_) => continue,
            };

            let prop_value = obj.get(key, ctx).map_err(|e| {
                RunletError::Execution(format!("Failed to get property '{key_str}': {e}"))
            })?;
            result.insert(key_str, js_value_to_json(prop_value, ctx)?);
        }
        return Ok(JsonValue::Object(result));
    }

    // symbols and anything else without a JSON shape
    Ok(JsonValue::Null)
}
