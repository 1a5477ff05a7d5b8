use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{json, Value};

use runlet_common::protocol::error::{Result, RunletError};
use runlet_common::protocol::jsonrpc::{INVALID_PARAMS, METHOD_NOT_FOUND};
use runlet_common::protocol::{JsonRpcRequest, JsonRpcResponse};

static REQUEST_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Client for a Runlet server.
///
/// Wraps the JSON-RPC envelope: [`RunletClient::call`] sends any engine
/// method; the typed helpers cover the common session and script flows.
pub struct RunletClient {
    server_url: String,
    http: reqwest::Client,
}

impl RunletClient {
    /// Creates a client for a server URL (including the http:// prefix).
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Invokes an engine method and unwraps the envelope.
    ///
    /// JSON-RPC errors come back as the matching [`RunletError`] variant so
    /// callers can distinguish an absent session from a failed call.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0".into(),
            method: method.into(),
            params,
            id: json!(REQUEST_ID_COUNTER.fetch_add(1, Ordering::SeqCst)),
        };

        let response: JsonRpcResponse = self
            .http
            .post(&self.server_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RunletError::Transport(format!("Request failed: {e}")))?
            .json()
            .await
            .map_err(|e| RunletError::Transport(format!("Invalid response body: {e}")))?;

        if let Some(error) = response.error {
            return Err(match error.code {
                METHOD_NOT_FOUND => RunletError::NotFound(error.message),
                INVALID_PARAMS => RunletError::Parameter(error.message),
                _ => RunletError::Execution(error.message),
            });
        }
        response
            .result
            .ok_or_else(|| RunletError::Transport("Missing result in success response".into()))
    }

    /// Starts a session, returning its id.
    pub async fn start_session(&self, ttl_secs: Option<u64>) -> Result<String> {
        let result = self
            .call("session.start", json!({ "ttl_secs": ttl_secs }))
            .await?;
        result["session_id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| RunletError::Transport("Missing session_id in response".into()))
    }

    /// Dispatches a function call into a session and returns its result.
    pub async fn dispatch(&self, session_id: &str, function: &str, params: Value) -> Result<Value> {
        let result = self
            .call(
                "session.dispatch",
                json!({"session_id": session_id, "function": function, "params": params}),
            )
            .await?;
        Ok(result["result"].clone())
    }

    pub async fn close_session(&self, session_id: &str) -> Result<()> {
        self.call("session.close", json!({ "session_id": session_id }))
            .await?;
        Ok(())
    }

    /// Uploads a standalone script, returning its content id.
    pub async fn upload_script(&self, script: &str) -> Result<String> {
        let result = self.call("script.upload", json!({ "script": script })).await?;
        result["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| RunletError::Transport("Missing id in response".into()))
    }

    /// Calls a function on an uploaded script.
    pub async fn call_script(&self, id: &str, function: &str, params: Value) -> Result<Value> {
        let result = self
            .call(
                "script.call",
                json!({"id": id, "function": function, "params": params}),
            )
            .await?;
        Ok(result["result"].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_stores_url() {
        let client = RunletClient::new("http://localhost:8080");
        assert_eq!(client.server_url, "http://localhost:8080");
    }

    #[tokio::test]
    async fn unreachable_server_is_transport_error() {
        let client = RunletClient::new("http://127.0.0.1:1/");
        let err = client.call("_status", json!({})).await.unwrap_err();
        assert!(matches!(err, RunletError::Transport(_)));
    }
}
