//! Method router for the Runlet host.
//!
//! One JSON-RPC endpoint carries every engine operation; this router maps
//! method names onto the session registry and the script cache. The
//! `_status` builtin is answered directly.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use runlet_common::protocol::api::{
    CallScriptParams, CloseSessionParams, DeleteScriptParams, DispatchParams, RefreshTtlParams,
    StartSessionParams, StartSessionResponse, UpdateScriptParams, UpdateScriptResponse,
    UploadModulesParams, UploadModulesResponse, UploadScriptParams, UploadScriptResponse,
};
use runlet_common::protocol::error::{Result, RunletError};
use runlet_common::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};

use crate::host::Host;

/// Routes JSON-RPC requests to engine operations.
pub struct HostRouter {
    host: Arc<Host>,
}

impl HostRouter {
    pub fn new(host: Arc<Host>) -> Self {
        Self { host }
    }

    /// Handles one request, turning every engine failure into a JSON-RPC
    /// error envelope.
    pub async fn handle_request(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        let id = req.id.clone();
        let method = req.method.clone();
        match self.route(req).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => {
                tracing::debug!(method = %method, error = %e, "Request failed");
                JsonRpcResponse::error(id, JsonRpcError::from(&e))
            }
        }
    }

    async fn route(&self, req: JsonRpcRequest) -> Result<Value> {
        match req.method.as_str() {
            "_status" => {
                let report = self.host.status().await;
                Ok(serde_json::to_value(report)?)
            }
            "session.start" => {
                let params: StartSessionParams = parse_params(req.params)?;
                let ttl = params.ttl_secs.map(Duration::from_secs);
                let (session_id, expires_at) = self.host.sessions().create(ttl).await;
                Ok(serde_json::to_value(StartSessionResponse {
                    session_id,
                    expires_at: expires_at.map(|t| t.to_rfc3339()),
                })?)
            }
            "session.upload" => {
                let params: UploadModulesParams = parse_params(req.params)?;
                let interface = self
                    .host
                    .sessions()
                    .upload(&params.session_id, &params.modules)
                    .await?;
                Ok(serde_json::to_value(UploadModulesResponse {
                    status: format!("Modules uploaded to session {}", params.session_id),
                    interface,
                })?)
            }
            "session.dispatch" => {
                let params: DispatchParams = parse_params(req.params)?;
                let result = self
                    .host
                    .sessions()
                    .dispatch(&params.session_id, &params.function, params.params)
                    .await?;
                Ok(json!({ "result": result }))
            }
            "session.refresh" => {
                let params: RefreshTtlParams = parse_params(req.params)?;
                let expires_at = self
                    .host
                    .sessions()
                    .refresh_ttl(&params.session_id, Duration::from_secs(params.ttl_secs))
                    .await?;
                Ok(json!({
                    "session_id": params.session_id,
                    "expires_at": expires_at.to_rfc3339(),
                }))
            }
            "session.close" => {
                let params: CloseSessionParams = parse_params(req.params)?;
                self.host.sessions().close(&params.session_id).await?;
                Ok(json!({
                    "status": format!("Session {} closed successfully", params.session_id)
                }))
            }
            "script.upload" => {
                let params: UploadScriptParams = parse_params(req.params)?;
                let id = self.host.scripts().upload(&params.script);
                Ok(serde_json::to_value(UploadScriptResponse { id })?)
            }
            "script.list" => Ok(json!(self.host.scripts().list())),
            "script.call" => {
                let params: CallScriptParams = parse_params(req.params)?;
                let result = self
                    .host
                    .scripts()
                    .call(&params.id, &params.function, params.params)
                    .await?;
                Ok(json!({ "result": result }))
            }
            "script.update" => {
                let params: UpdateScriptParams = parse_params(req.params)?;
                self.host.scripts().update(&params.id, &params.new_script)?;
                Ok(serde_json::to_value(UpdateScriptResponse {
                    id: params.id,
                    new_content: params.new_script,
                })?)
            }
            "script.delete" => {
                let params: DeleteScriptParams = parse_params(req.params)?;
                self.host.scripts().delete(&params.id)?;
                Ok(json!({ "status": format!("Script {} deleted", params.id) }))
            }
            other => Err(RunletError::NotFound(format!("Method '{other}' not found"))),
        }
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Value) -> Result<T> {
    // an omitted params field arrives as null; treat it as an empty object
    let params = if params.is_null() { json!({}) } else { params };
    serde_json::from_value(params).map_err(|e| RunletError::Parameter(format!("Invalid params: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn router() -> (HostRouter, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let host = Arc::new(Host::new(dir.path()).unwrap());
        (HostRouter::new(host), dir)
    }

    fn request(method: &str, params: Value) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".into(),
            method: method.into(),
            params,
            id: json!(1),
        }
    }

    #[tokio::test]
    async fn status_builtin() {
        let (router, _dir) = router();
        let res = router.handle_request(request("_status", json!({}))).await;
        let result = res.result.unwrap();
        assert_eq!(result["status"], "running");
        assert_eq!(result["active_sessions"], 0);
    }

    #[tokio::test]
    async fn unknown_method_is_not_found() {
        let (router, _dir) = router();
        let res = router.handle_request(request("bogus", json!({}))).await;
        assert_eq!(res.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn malformed_params_are_invalid_params() {
        let (router, _dir) = router();
        let res = router
            .handle_request(request("session.dispatch", json!({"function": 3})))
            .await;
        assert_eq!(res.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn session_lifecycle_over_rpc() {
        let (router, _dir) = router();

        let res = router.handle_request(request("session.start", json!({}))).await;
        let session_id = res.result.unwrap()["session_id"].as_str().unwrap().to_string();

        let res = router
            .handle_request(request(
                "session.upload",
                json!({
                    "session_id": session_id,
                    "modules": [{
                        "name": "m1",
                        "files": {"main.js": "function main() { return { double: function(args) { return args.x * 2; } }; }"}
                    }]
                }),
            ))
            .await;
        let result = res.result.expect("upload should succeed");
        assert!(result["interface"].as_str().unwrap().contains("double"));

        let res = router
            .handle_request(request(
                "session.dispatch",
                json!({"session_id": session_id, "function": "double", "params": {"x": 21}}),
            ))
            .await;
        assert_eq!(res.result.unwrap()["result"], json!(42));

        let res = router
            .handle_request(request("session.close", json!({"session_id": session_id})))
            .await;
        assert!(res.result.is_some());

        let res = router
            .handle_request(request(
                "session.dispatch",
                json!({"session_id": session_id, "function": "double", "params": {"x": 1}}),
            ))
            .await;
        assert_eq!(res.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn script_surface_over_rpc() {
        let (router, _dir) = router();

        let res = router
            .handle_request(request(
                "script.upload",
                json!({"script": "function main(args) { return args.a + args.b; }"}),
            ))
            .await;
        let id = res.result.unwrap()["id"].as_str().unwrap().to_string();

        let res = router
            .handle_request(request(
                "script.call",
                json!({"id": id, "function": "main", "params": {"a": 2, "b": 3}}),
            ))
            .await;
        assert_eq!(res.result.unwrap()["result"], json!(5));

        let res = router
            .handle_request(request(
                "script.update",
                json!({"id": id, "new_script": "function main(args) { return args.a - args.b; }"}),
            ))
            .await;
        assert_eq!(res.result.unwrap()["id"], json!(id));

        let res = router
            .handle_request(request(
                "script.call",
                json!({"id": id, "function": "main", "params": {"a": 5, "b": 2}}),
            ))
            .await;
        assert_eq!(res.result.unwrap()["result"], json!(3));

        let res = router
            .handle_request(request("script.delete", json!({"id": id})))
            .await;
        assert!(res.result.is_some());

        let res = router
            .handle_request(request("script.delete", json!({"id": id})))
            .await;
        assert_eq!(res.error.unwrap().code, -32601);
    }
}
