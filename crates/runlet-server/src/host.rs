//! The engine aggregate an HTTP server exposes.

use std::path::PathBuf;

use chrono::Utc;

use runlet_common::protocol::api::StatusReport;
use runlet_common::protocol::error::Result;

use crate::scripts::ScriptStore;
use crate::sessions::SessionRegistry;

/// The resident Runlet engine: the session registry plus the stateless
/// script cache, sharing one process.
pub struct Host {
    scripts: ScriptStore,
    sessions: SessionRegistry,
}

impl Host {
    /// Creates the engine. The modules directory is created if absent and
    /// holds one subdirectory per session.
    pub fn new(modules_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            scripts: ScriptStore::new(),
            sessions: SessionRegistry::new(modules_dir)?,
        })
    }

    pub fn scripts(&self) -> &ScriptStore {
        &self.scripts
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Diagnostic snapshot served by the `_status` builtin.
    pub async fn status(&self) -> StatusReport {
        let sessions = self.sessions.describe().await;
        StatusReport {
            status: "running".into(),
            timestamp: Utc::now().to_rfc3339(),
            active_sessions: sessions.len(),
            sessions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn status_reports_active_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let host = Host::new(dir.path()).unwrap();

        let report = host.status().await;
        assert_eq!(report.status, "running");
        assert_eq!(report.active_sessions, 0);

        let (s1, _) = host.sessions().create(None).await;
        let report = host.status().await;
        assert_eq!(report.active_sessions, 1);
        assert!(report.sessions.contains_key(&s1));
    }
}
