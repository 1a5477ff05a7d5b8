//! JSON-RPC 2.0 Protocol Types
//!
//! The Runlet wire surface is a single JSON-RPC 2.0 endpoint; engine
//! operations are routed by method name (`session.*`, `script.*`, `_status`).
//!
//! # Error Codes
//!
//! Standard JSON-RPC 2.0 error codes:
//! - `-32700`: Parse error
//! - `-32600`: Invalid request
//! - `-32601`: Method not found (also: session/script/function not found)
//! - `-32602`: Invalid params
//! - `-32603`: Internal error
//! - `-32000`: Server error (load and execution failures)

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::RunletError;

/// JSON-RPC 2.0 request envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (must be "2.0")
    pub jsonrpc: String,
    /// Name of the engine operation to invoke
    pub method: String,
    /// Operation parameters (an object, or omitted)
    #[serde(default)]
    pub params: Value,
    /// Request identifier (number, string, or null)
    pub id: Value,
}

/// JSON-RPC 2.0 response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version (must be "2.0")
    pub jsonrpc: String,
    /// Result value on success (None if error is present)
    pub result: Option<Value>,
    /// Error object on failure (None if result is present)
    pub error: Option<JsonRpcError>,
    /// Request identifier (must match the request id)
    pub id: Value,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    /// Error code (standard codes are negative integers)
    pub code: i32,
    /// Short description of the error
    pub message: String,
    /// Additional data (optional)
    pub data: Option<Value>,
}

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
pub const SERVER_ERROR: i32 = -32000;

impl JsonRpcError {
    /// Invalid JSON was received by the server (-32700).
    pub fn parse_error() -> Self {
        Self {
            code: PARSE_ERROR,
            message: "Parse error".into(),
            data: None,
        }
    }

    /// The JSON sent is not a valid Request object (-32600).
    pub fn invalid_request() -> Self {
        Self {
            code: INVALID_REQUEST,
            message: "Invalid Request".into(),
            data: None,
        }
    }

    /// The method does not exist (-32601), with the generic message.
    pub fn method_not_found() -> Self {
        Self {
            code: METHOD_NOT_FOUND,
            message: "Method not found".into(),
            data: None,
        }
    }

    /// A named thing (session, script, function) is absent (-32601).
    pub fn not_found(msg: &str) -> Self {
        Self {
            code: METHOD_NOT_FOUND,
            message: msg.into(),
            data: None,
        }
    }

    /// Invalid operation parameter(s) (-32602).
    pub fn invalid_params(msg: &str) -> Self {
        Self {
            code: INVALID_PARAMS,
            message: msg.into(),
            data: None,
        }
    }

    /// Internal error (-32603).
    pub fn internal_error(msg: &str) -> Self {
        Self {
            code: INTERNAL_ERROR,
            message: msg.into(),
            data: None,
        }
    }

    /// Application-level failure (-32000): load or execution errors.
    pub fn server_error(msg: &str) -> Self {
        Self {
            code: SERVER_ERROR,
            message: msg.into(),
            data: None,
        }
    }
}

impl From<&RunletError> for JsonRpcError {
    /// Maps the engine error taxonomy onto JSON-RPC error codes.
    ///
    /// NotFound keeps its specific message so clients can tell an absent
    /// session from an absent function; load and execution failures share
    /// the server-error code but carry the underlying message.
    fn from(err: &RunletError) -> Self {
        match err {
            RunletError::NotFound(msg) => JsonRpcError::not_found(msg),
            RunletError::Parameter(msg) => JsonRpcError::invalid_params(msg),
            RunletError::Load(msg) => JsonRpcError::server_error(msg),
            RunletError::Execution(msg) => JsonRpcError::server_error(msg),
            other => JsonRpcError::internal_error(&other.to_string()),
        }
    }
}

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Create an error response.
    pub fn error(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(error),
            id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_roundtrip() {
        let json = r#"{"jsonrpc":"2.0","method":"script.call","params":{"id":"h"},"id":1}"#;
        let req: JsonRpcRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.method, "script.call");
        assert_eq!(req.params, json!({"id": "h"}));

        let serialized = serde_json::to_string(&req).unwrap();
        assert!(serialized.contains("\"jsonrpc\":\"2.0\""));
        assert!(serialized.contains("\"method\":\"script.call\""));
    }

    #[test]
    fn request_params_default_to_null() {
        let json = r#"{"jsonrpc":"2.0","method":"script.list","id":1}"#;
        let req: JsonRpcRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.params, Value::Null);
    }

    #[test]
    fn response_success_shape() {
        let res = JsonRpcResponse::success(json!(1), json!({"result": 42}));
        assert_eq!(res.result, Some(json!({"result": 42})));
        assert!(res.error.is_none());
        assert_eq!(res.jsonrpc, "2.0");
    }

    #[test]
    fn response_error_shape() {
        let res = JsonRpcResponse::error(json!(1), JsonRpcError::method_not_found());
        assert!(res.result.is_none());
        assert_eq!(res.error.unwrap().code, -32601);
    }

    #[test]
    fn error_codes() {
        assert_eq!(JsonRpcError::parse_error().code, -32700);
        assert_eq!(JsonRpcError::invalid_request().code, -32600);
        assert_eq!(JsonRpcError::method_not_found().code, -32601);
        assert_eq!(JsonRpcError::invalid_params("x").code, -32602);
        assert_eq!(JsonRpcError::internal_error("x").code, -32603);
        assert_eq!(JsonRpcError::server_error("x").code, -32000);
    }

    #[test]
    fn engine_error_mapping() {
        let not_found = RunletError::NotFound("Session 'abc' not found".into());
        let mapped = JsonRpcError::from(&not_found);
        assert_eq!(mapped.code, METHOD_NOT_FOUND);
        assert_eq!(mapped.message, "Session 'abc' not found");

        let load = RunletError::Load("eval failed".into());
        assert_eq!(JsonRpcError::from(&load).code, SERVER_ERROR);

        let exec = RunletError::Execution("boom".into());
        assert_eq!(JsonRpcError::from(&exec).code, SERVER_ERROR);

        let param = RunletError::Parameter("params must be an object".into());
        assert_eq!(JsonRpcError::from(&param).code, INVALID_PARAMS);
    }
}
