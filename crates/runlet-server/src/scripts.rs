//! Stateless script cache.
//!
//! Content-addressed storage for standalone scripts: source text keyed by
//! its hash, with one lazily loaded unit per entry. The cache heals by
//! eviction: an entry whose load or invocation fails is removed entirely,
//! source included, and must be re-uploaded before it can be called again.
//!
//! The map itself is guarded by a plain mutex held only around map access;
//! a per-entry async lock serializes concurrent first loads of the same id
//! so the same source is never compiled twice in a race.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value as JsonValue;
use tokio::sync::Mutex as AsyncMutex;

use runlet_common::protocol::error::{Result, RunletError};

use crate::hash::script_id;
use crate::runtime::context::ScriptContext;

#[derive(Clone)]
struct ScriptEntry {
    source: String,
    unit: Arc<AsyncMutex<Option<Arc<ScriptContext>>>>,
}

impl ScriptEntry {
    fn new(source: String) -> Self {
        Self {
            source,
            unit: Arc::new(AsyncMutex::new(None)),
        }
    }
}

/// Process-wide cache of standalone scripts, keyed by content identity.
#[derive(Default)]
pub struct ScriptStore {
    entries: Mutex<HashMap<String, ScriptEntry>>,
}

impl ScriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the source under its content hash and returns the id.
    /// Re-uploading identical source is a no-op cache hit.
    pub fn upload(&self, source: &str) -> String {
        let id = script_id(source);
        let mut entries = self.entries.lock().unwrap();
        if entries.contains_key(&id) {
            tracing::debug!(id = %id, "Script re-uploaded, cache hit");
        } else {
            entries.insert(id.clone(), ScriptEntry::new(source.to_string()));
            tracing::info!(id = %id, "Script stored");
        }
        id
    }

    /// All known ids, sorted for a deterministic listing.
    pub fn list(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.lock().unwrap().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Replaces the content under an existing id and clears the loaded
    /// unit so the next call reloads.
    ///
    /// The id is deliberately NOT recomputed: hot-patching keeps the
    /// client's reference stable even though the new content hashes to a
    /// different value.
    pub fn update(&self, id: &str, new_source: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        if !entries.contains_key(id) {
            return Err(RunletError::NotFound(format!("Script '{id}' not found")));
        }
        entries.insert(id.to_string(), ScriptEntry::new(new_source.to_string()));
        tracing::info!(id = %id, "Script updated, loaded unit cleared");
        Ok(())
    }

    /// Removes the entry unconditionally; a repeat delete is NotFound.
    pub fn delete(&self, id: &str) -> Result<()> {
        match self.entries.lock().unwrap().remove(id) {
            Some(_) => {
                tracing::info!(id = %id, "Script deleted");
                Ok(())
            }
            None => Err(RunletError::NotFound(format!("Script '{id}' not found"))),
        }
    }

    /// Returns the loaded unit for `id`, loading it on first use.
    ///
    /// A load failure evicts the entire entry; re-upload is required to
    /// retry. The cache never holds an entry whose load is known-bad.
    pub async fn ensure_loaded(&self, id: &str) -> Result<Arc<ScriptContext>> {
        let entry = self
            .entries
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| RunletError::NotFound(format!("Script '{id}' not found")))?;

        let mut slot = entry.unit.lock().await;
        if let Some(unit) = slot.as_ref() {
            return Ok(unit.clone());
        }

        match ScriptContext::load_script(&entry.source) {
            Ok(unit) => {
                let unit = Arc::new(unit);
                *slot = Some(unit.clone());
                tracing::debug!(id = %id, "Script loaded");
                Ok(unit)
            }
            Err(e) => {
                self.evict(id);
                Err(e)
            }
        }
    }

    /// Resolves and invokes `function` on the loaded unit.
    ///
    /// An invocation failure evicts the entry, same policy as a load
    /// failure: a script that threw once is assumed unsafe to keep
    /// resident. An absent function is NotFound and leaves the entry.
    pub async fn call(&self, id: &str, function: &str, params: JsonValue) -> Result<JsonValue> {
        let unit = self.ensure_loaded(id).await?;
        match unit.call_function(function, params) {
            Ok(result) => Ok(result),
            Err(e @ RunletError::NotFound(_)) => Err(e),
            Err(e) => {
                self.evict(id);
                Err(e)
            }
        }
    }

    /// Current source text for `id`, if present.
    pub fn source(&self, id: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap()
            .get(id)
            .map(|e| e.source.clone())
    }

    fn evict(&self, id: &str) {
        if self.entries.lock().unwrap().remove(id).is_some() {
            tracing::warn!(id = %id, "Script evicted after failure");
        }
    }
}
