//! HTTP transport helpers.
//!
//! Conversion between HTTP bodies and the JSON-RPC envelope. The server
//! always answers 200 with a JSON-RPC body; failures travel inside the
//! envelope, not in the HTTP status line.

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::{Request, Response, StatusCode};

use crate::protocol::error::RunletError;
use crate::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};

/// Type alias for Hyper incoming requests
pub type HyperRequest = Request<Incoming>;

/// Type alias for Hyper responses with full body
pub type HyperResponse = Response<Full<Bytes>>;

/// HTTP/JSON-RPC conversion helpers.
pub struct HttpTransport;

impl HttpTransport {
    /// Parse a JSON-RPC request from an HTTP body.
    pub fn parse_jsonrpc(body: Bytes) -> Result<JsonRpcRequest, RunletError> {
        serde_json::from_slice(&body).map_err(RunletError::JsonSerialization)
    }

    /// Create an HTTP response from a JSON-RPC response.
    pub fn to_http_response(jsonrpc: JsonRpcResponse) -> HyperResponse {
        let body = serde_json::to_vec(&jsonrpc).unwrap_or_default();

        Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from(body)))
            .unwrap()
    }

    /// Create an HTTP error response from a JSON-RPC error.
    pub fn to_http_error(id: serde_json::Value, error: JsonRpcError) -> HyperResponse {
        Self::to_http_response(JsonRpcResponse::error(id, error))
    }

    /// Build a JSON-RPC request for an engine operation.
    pub fn build_request(
        method: &str,
        params: serde_json::Value,
        id: serde_json::Value,
    ) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".into(),
            method: method.into(),
            params,
            id,
        }
    }
}
