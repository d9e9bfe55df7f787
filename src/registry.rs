// Mount session bookkeeping. Pure in-memory, no filesystem or process
// access, which is what lets the orchestrator tests run without mounting
// anything real. The orchestrator is the only writer.

use std::path::PathBuf;

use crate::error::{Error, Result};

/// One live binding of an archive to a local read-only mount path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MountSession {
    pub repository: String,
    pub archive: String,
    pub mount_path: PathBuf,
}

impl MountSession {
    pub fn key(&self) -> (&str, &str) {
        (&self.repository, &self.archive)
    }
}

/// Table of active sessions keyed by (repository, archive), preserving
/// insertion order: most recently mounted last, which is the order the
/// status display shows.
#[derive(Debug, Default)]
pub struct MountRegistry {
    sessions: Vec<MountSession>,
}

impl MountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session. At most one session may exist per key.
    pub fn add(&mut self, session: MountSession) -> Result<()> {
        if self.get(&session.repository, &session.archive).is_some() {
            return Err(Error::DuplicateSession {
                repository: session.repository,
                archive: session.archive,
            });
        }
        self.sessions.push(session);
        Ok(())
    }

    /// Deregister and return the session for a key.
    pub fn remove(&mut self, repository: &str, archive: &str) -> Result<MountSession> {
        let pos = self
            .sessions
            .iter()
            .position(|s| s.key() == (repository, archive))
            .ok_or_else(|| Error::NoSuchSession {
                repository: repository.to_string(),
                archive: archive.to_string(),
            })?;
        Ok(self.sessions.remove(pos))
    }

    pub fn get(&self, repository: &str, archive: &str) -> Option<&MountSession> {
        self.sessions.iter().find(|s| s.key() == (repository, archive))
    }

    /// All sessions in insertion order.
    pub fn list(&self) -> &[MountSession] {
        &self.sessions
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
