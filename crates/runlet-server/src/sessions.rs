//! Session registry, function dispatcher and expiry reaper.
//!
//! A session is a server-side container binding named modules, each loaded
//! into its own isolated unit. The registry owns creation, upload, TTL
//! expiry and teardown; dispatch resolves a function name across a
//! session's units in bind order and invokes the first match.
//!
//! One async mutex guards the session map. It is held only around map
//! access, never across a load or an invocation, so one session's hung
//! call does not block another session's progress. TTL expiry is one
//! spawned task per (session, deadline); the task re-validates the stored
//! deadline when it fires instead of relying on cancellation, which makes
//! `refresh_ttl` a plain store-and-respawn.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

use runlet_common::protocol::api::{ModuleUpload, SessionSummary};
use runlet_common::protocol::error::{Result, RunletError};

use crate::runtime::context::{ScriptContext, ON_DESTROY_HOOK};
use crate::runtime::reflect::describe_interface;

/// The file in a module bundle the loader evaluates.
pub const ENTRY_FILE: &str = "main.js";

struct Session {
    created_at: DateTime<Utc>,
    /// Monotonic deadline the reaper checks; the paired wall-clock instant
    /// is what clients see.
    deadline: Option<Instant>,
    expires_at: Option<DateTime<Utc>>,
    /// Bind-order list of (module name, unit). The order is the dispatch
    /// precedence; a rebind replaces in place and keeps its position.
    modules: Vec<(String, Arc<ScriptContext>)>,
}

impl Session {
    fn new() -> Self {
        Self {
            created_at: Utc::now(),
            deadline: None,
            expires_at: None,
            modules: Vec::new(),
        }
    }

    /// Binds `name` to a unit. Rebinding a name replaces the unit without
    /// invoking the replaced unit's destroy hook (legacy behavior, kept —
    /// only session teardown runs destroy hooks).
    fn bind(&mut self, name: &str, unit: Arc<ScriptContext>) {
        if let Some(slot) = self.modules.iter_mut().find(|(n, _)| n == name) {
            slot.1 = unit;
        } else {
            self.modules.push((name.to_string(), unit));
        }
    }
}

/// Registry of live sessions. Cheap to clone; all clones share the map.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    sessions: Mutex<HashMap<String, Session>>,
    modules_dir: PathBuf,
}

impl SessionRegistry {
    /// Creates the registry, ensuring the modules directory exists.
    pub fn new(modules_dir: impl Into<PathBuf>) -> Result<Self> {
        let modules_dir = modules_dir.into();
        std::fs::create_dir_all(&modules_dir)?;
        Ok(Self {
            inner: Arc::new(RegistryInner {
                sessions: Mutex::new(HashMap::new()),
                modules_dir,
            }),
        })
    }

    /// Starts a fresh session; with a TTL, schedules a reaper task for its
    /// expiry instant and returns the wall-clock expiry for the client.
    pub async fn create(&self, ttl: Option<Duration>) -> (String, Option<DateTime<Utc>>) {
        let session_id = Uuid::new_v4().to_string();
        let mut session = Session::new();

        let schedule = ttl.map(|ttl| {
            let deadline = Instant::now() + ttl;
            let expires_at = Utc::now() + chrono::Duration::milliseconds(ttl.as_millis() as i64);
            session.deadline = Some(deadline);
            session.expires_at = Some(expires_at);
            (deadline, expires_at)
        });

        self.inner
            .sessions
            .lock()
            .await
            .insert(session_id.clone(), session);

        if let Some((deadline, _)) = schedule {
            self.spawn_reaper(session_id.clone(), deadline);
        }

        tracing::info!(session = %session_id, ttl = ?ttl, "Session started");
        (session_id, schedule.map(|(_, at)| at))
    }

    /// Moves the session's expiry forward and schedules a new reaper task.
    /// The task scheduled for the previous deadline becomes a no-op when
    /// it fires, because it re-checks the stored deadline first.
    pub async fn refresh_ttl(&self, session_id: &str, ttl: Duration) -> Result<DateTime<Utc>> {
        let deadline = Instant::now() + ttl;
        let expires_at = Utc::now() + chrono::Duration::milliseconds(ttl.as_millis() as i64);
        {
            let mut sessions = self.inner.sessions.lock().await;
            let session = sessions
                .get_mut(session_id)
                .ok_or_else(|| not_found(session_id))?;
            session.deadline = Some(deadline);
            session.expires_at = Some(expires_at);
        }
        self.spawn_reaper(session_id.to_string(), deadline);
        tracing::info!(session = %session_id, ttl = ?ttl, "Session TTL refreshed");
        Ok(expires_at)
    }

    /// Persists each module's files, then loads and binds the modules in
    /// upload order. Returns the combined interface description of the
    /// modules loaded by this call.
    ///
    /// A failing module aborts the call with a LoadError naming it, but
    /// modules bound earlier in the same call stay bound; there is no
    /// cross-module rollback.
    pub async fn upload(&self, session_id: &str, modules: &[ModuleUpload]) -> Result<String> {
        {
            let sessions = self.inner.sessions.lock().await;
            if !sessions.contains_key(session_id) {
                return Err(not_found(session_id));
            }
        }

        let session_path = self.inner.modules_dir.join(session_id);
        for module in modules {
            let module_path = session_path.join(&module.name);
            std::fs::create_dir_all(&module_path)?;
            for (filename, content) in &module.files {
                std::fs::write(module_path.join(filename), content)?;
                tracing::debug!(session = %session_id, module = %module.name, file = %filename, "File persisted");
            }
        }

        let mut interface = String::new();
        for module in modules {
            let entry = module.files.get(ENTRY_FILE).ok_or_else(|| {
                RunletError::Load(format!(
                    "Module '{}' has no {ENTRY_FILE} entry file",
                    module.name
                ))
            })?;
            let unit = Arc::new(ScriptContext::load_module(&module.name, entry)?);
            interface.push_str(&describe_interface(&module.name, &unit));

            let mut sessions = self.inner.sessions.lock().await;
            let session = sessions
                .get_mut(session_id)
                .ok_or_else(|| not_found(session_id))?;
            session.bind(&module.name, unit);
            tracing::info!(session = %session_id, module = %module.name, "Module bound");
        }

        Ok(interface)
    }

    /// First-match function dispatch across the session's units, in bind
    /// order. The unit snapshot is taken under the registry lock; the
    /// invocation runs outside it, so a concurrent rebind may win the race
    /// and the call lands on whichever unit the snapshot saw.
    pub async fn dispatch(
        &self,
        session_id: &str,
        function: &str,
        params: JsonValue,
    ) -> Result<JsonValue> {
        let units: Vec<(String, Arc<ScriptContext>)> = {
            let sessions = self.inner.sessions.lock().await;
            let session = sessions
                .get(session_id)
                .ok_or_else(|| not_found(session_id))?;
            session.modules.clone()
        };

        for (name, unit) in &units {
            if unit.has_attribute(function) {
                tracing::debug!(session = %session_id, module = %name, function = %function, "Dispatching");
                return unit.call_function(function, params);
            }
        }

        Err(RunletError::NotFound(format!(
            "Function '{function}' not found in any module of session {session_id}"
        )))
    }

    /// Closes the session: destroy hooks, then record and file removal.
    pub async fn close(&self, session_id: &str) -> Result<()> {
        let session = self
            .inner
            .sessions
            .lock()
            .await
            .remove(session_id)
            .ok_or_else(|| not_found(session_id))?;
        tracing::info!(session = %session_id, "Session closed");
        self.teardown(session_id, session);
        Ok(())
    }

    /// Read-only diagnostic snapshot: bound module names, persisted files
    /// and lifetimes per session.
    pub async fn describe(&self) -> BTreeMap<String, SessionSummary> {
        let listings: Vec<(String, SessionSummary)> = {
            let sessions = self.inner.sessions.lock().await;
            sessions
                .iter()
                .map(|(id, s)| {
                    (
                        id.clone(),
                        SessionSummary {
                            modules: s.modules.iter().map(|(n, _)| n.clone()).collect(),
                            files: Vec::new(),
                            created_at: s.created_at.to_rfc3339(),
                            expires_at: s.expires_at.map(|t| t.to_rfc3339()),
                        },
                    )
                })
                .collect()
        };

        let mut report = BTreeMap::new();
        for (id, mut summary) in listings {
            summary.files = list_files(&self.inner.modules_dir.join(&id));
            report.insert(id, summary);
        }
        report
    }

    pub async fn active_count(&self) -> usize {
        self.inner.sessions.lock().await.len()
    }

    fn spawn_reaper(&self, session_id: String, deadline: Instant) {
        let registry = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            registry.reap(&session_id, deadline).await;
        });
    }

    /// Removes the session if it still exists and its stored deadline is
    /// the one this task was scheduled for; a refresh or an explicit close
    /// in the meantime turns the task into a no-op.
    async fn reap(&self, session_id: &str, scheduled: Instant) {
        let session = {
            let mut sessions = self.inner.sessions.lock().await;
            match sessions.get(session_id) {
                Some(s) if s.deadline == Some(scheduled) => sessions.remove(session_id),
                _ => None,
            }
        };

        if let Some(session) = session {
            tracing::info!(session = %session_id, "Session TTL expired, closing automatically");
            self.teardown(session_id, session);
        }
    }

    /// Best-effort teardown: every unit's destroy hook runs even when some
    /// fail, then the session's persisted files are removed.
    fn teardown(&self, session_id: &str, session: Session) {
        for (name, unit) in &session.modules {
            match unit.run_hook(ON_DESTROY_HOOK) {
                Ok(true) => {
                    tracing::debug!(session = %session_id, module = %name, "Destroy hook finished")
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(session = %session_id, module = %name, error = %e, "Destroy hook failed")
                }
            }
        }

        let session_path = self.inner.modules_dir.join(session_id);
        if session_path.exists() {
            if let Err(e) = std::fs::remove_dir_all(&session_path) {
                tracing::warn!(session = %session_id, error = %e, "Failed to remove session files");
            }
        }
    }
}

fn not_found(session_id: &str) -> RunletError {
    RunletError::NotFound(format!("Session '{session_id}' not found"))
}

/// Walks a session directory and returns relative file paths, sorted.
fn list_files(dir: &Path) -> Vec<String> {
    fn walk(base: &Path, dir: &Path, out: &mut Vec<String>) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                walk(base, &path, out);
            } else if let Ok(rel) = path.strip_prefix(base) {
                out.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
    }

    let mut files = Vec::new();
    walk(dir, dir, &mut files);
    files.sort();
    files
}
