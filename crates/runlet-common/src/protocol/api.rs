//! Typed payloads for the engine operations.
//!
//! Each `session.*` / `script.*` method on the wire carries one of these
//! shapes in the JSON-RPC `params` field and returns the matching response
//! shape in `result`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One uploaded module: a name plus its files, keyed by filename.
///
/// The entry file `main.js` is what the loader evaluates; other files are
/// persisted verbatim alongside it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModuleUpload {
    pub name: String,
    pub files: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StartSessionParams {
    /// Session lifetime in seconds; absent means the session never expires
    /// on its own.
    pub ttl_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionResponse {
    pub session_id: String,
    /// RFC 3339 expiry instant, present only when a TTL was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadModulesParams {
    pub session_id: String,
    pub modules: Vec<ModuleUpload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadModulesResponse {
    pub status: String,
    /// Combined interface description of the modules loaded by this call.
    pub interface: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchParams {
    pub session_id: String,
    pub function: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTtlParams {
    pub session_id: String,
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseSessionParams {
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadScriptParams {
    pub script: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadScriptResponse {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallScriptParams {
    pub id: String,
    pub function: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateScriptParams {
    pub id: String,
    pub new_script: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateScriptResponse {
    pub id: String,
    pub new_content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteScriptParams {
    pub id: String,
}

/// Per-session entry in the `_status` report.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionSummary {
    /// Bound module names, in bind order.
    pub modules: Vec<String>,
    /// Persisted file paths, relative to the session directory.
    pub files: Vec<String>,
    /// RFC 3339 creation instant.
    pub created_at: String,
    /// RFC 3339 expiry instant, absent when the session has no TTL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

/// Diagnostic snapshot returned by the `_status` builtin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: String,
    /// RFC 3339 timestamp of the snapshot.
    pub timestamp: String,
    pub active_sessions: usize,
    pub sessions: BTreeMap<String, SessionSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn module_upload_deserializes() {
        let m: ModuleUpload = serde_json::from_value(json!({
            "name": "m1",
            "files": {"main.js": "function main() { return {}; }"}
        }))
        .unwrap();
        assert_eq!(m.name, "m1");
        assert!(m.files.contains_key("main.js"));
    }

    #[test]
    fn dispatch_params_default_to_null() {
        let p: DispatchParams = serde_json::from_value(json!({
            "session_id": "s", "function": "f"
        }))
        .unwrap();
        assert_eq!(p.params, Value::Null);
    }

    #[test]
    fn start_session_response_omits_absent_expiry() {
        let res = StartSessionResponse {
            session_id: "s".into(),
            expires_at: None,
        };
        let serialized = serde_json::to_string(&res).unwrap();
        assert!(!serialized.contains("expires_at"));
    }
}
