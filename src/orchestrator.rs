// The mount/unmount state machine. This is the only component that
// writes to the session registry and the only one allowed to create or
// remove directories under the mount base, and it does both only as part
// of a recognized transition: Unmounted -> Mounting -> Mounted ->
// Unmounting -> Unmounted.
//
// The external tool and the mount-point check are injected behind traits
// so the whole machine can be driven in tests with a fake invoker and a
// real temp directory, the same way the OpsPad example hides its secret
// store behind a provider trait.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::borg::{ArchiveTool, ToolError};
use crate::config::RepositoryConfig;
use crate::error::{Error, Result};
use crate::registry::{MountRegistry, MountSession};
use crate::secret;

/// Answers "is this directory currently a mount point?". Used by
/// startup reconciliation to tell live mounts from leftover directories.
pub trait MountProbe {
    fn is_mount_point(&self, path: &Path) -> bool;
}

/// Production probe: a directory is a mount point when it sits on a
/// different device than its parent.
pub struct DeviceIdProbe;

impl MountProbe for DeviceIdProbe {
    #[cfg(unix)]
    fn is_mount_point(&self, path: &Path) -> bool {
        use std::os::unix::fs::MetadataExt;
        let Some(parent) = path.parent() else {
            return false;
        };
        match (fs::metadata(path), fs::metadata(parent)) {
            (Ok(own), Ok(parent)) => own.dev() != parent.dev(),
            _ => false,
        }
    }

    #[cfg(not(unix))]
    fn is_mount_point(&self, _path: &Path) -> bool {
        false
    }
}

/// Drives mounts and unmounts and owns the session registry.
pub struct Orchestrator<T, P> {
    tool: T,
    probe: P,
    mount_base: PathBuf,
    registry: MountRegistry,
}

impl<T: ArchiveTool, P: MountProbe> Orchestrator<T, P> {
    pub fn new(mount_base: PathBuf, tool: T, probe: P) -> Self {
        Orchestrator {
            tool,
            probe,
            mount_base,
            registry: MountRegistry::new(),
        }
    }

    /// Read access for the status display and the unmount menu.
    pub fn registry(&self) -> &MountRegistry {
        &self.registry
    }

    /// The injected tool, for callers that also need to list archives.
    pub fn tool(&self) -> &T {
        &self.tool
    }

    /// Deterministic mount path for a pair: `{base}/{repo}/{archive}`.
    fn mount_path(&self, repository: &str, archive: &str) -> PathBuf {
        self.mount_base.join(repository).join(archive)
    }

    /// Mount one archive read-only. On any failure after the mount
    /// directory was created, the directory is rolled back so no orphan
    /// path outlives a failed transition.
    pub fn mount(&mut self, repo: &RepositoryConfig, archive: &str) -> Result<MountSession> {
        if self.registry.get(&repo.identifier, archive).is_some() {
            return Err(Error::AlreadyMounted {
                repository: repo.identifier.clone(),
                archive: archive.to_string(),
            });
        }

        // Resolve the secret before touching the filesystem: a missing
        // passphrase must not leave a directory behind.
        let secret = secret::resolve(repo)?;

        let path = self.mount_path(&repo.identifier, archive);
        fs::create_dir_all(&path).map_err(|source| Error::MountPathCreateFailed {
            path: path.clone(),
            source,
        })?;

        if let Err(e) = self.tool.mount(
            &repo.location,
            archive,
            &repo.remote_program,
            &secret,
            &path,
        ) {
            self.rollback_mount_path(&path);
            return Err(Error::MountFailed {
                repository: repo.identifier.clone(),
                archive: archive.to_string(),
                reason: e.to_string(),
            });
        }

        let session = MountSession {
            repository: repo.identifier.clone(),
            archive: archive.to_string(),
            mount_path: path,
        };
        self.registry.add(session.clone())?;
        info!(
            "mounted {}::{} at {}",
            session.repository,
            session.archive,
            session.mount_path.display()
        );
        Ok(session)
    }

    /// Unmount an active session, selected by key from the registry --
    /// never by an operator-supplied path. On `UnmountBusy` both the
    /// session and its directory intentionally remain for a later retry.
    pub fn unmount(&mut self, repository: &str, archive: &str) -> Result<()> {
        let Some(session) = self.registry.get(repository, archive) else {
            return Err(Error::NotMounted {
                repository: repository.to_string(),
                archive: archive.to_string(),
            });
        };
        let path = session.mount_path.clone();

        match self.tool.unmount(&path) {
            Ok(()) => {}
            Err(ToolError::Busy) => {
                return Err(Error::UnmountBusy {
                    repository: repository.to_string(),
                    archive: archive.to_string(),
                });
            }
            Err(e) => {
                return Err(Error::UnmountFailed {
                    repository: repository.to_string(),
                    archive: archive.to_string(),
                    reason: e.to_string(),
                });
            }
        }

        self.remove_session_dirs(&path);
        self.registry.remove(repository, archive)?;
        info!("unmounted {}::{}", repository, archive);
        Ok(())
    }

    /// Startup reconciliation: walk `{base}/{repo}/{archive}` and bring
    /// the registry in line with on-disk reality.
    ///
    /// - A directory that is a live mount point belongs to a prior run;
    ///   it is adopted as a session (mounts persist across restarts).
    /// - An empty non-mount directory is a leftover from an interrupted
    ///   transition and is removed.
    /// - A non-empty non-mount directory is never removed; it is logged
    ///   and skipped in case it holds real data.
    ///
    /// All of this is best-effort: errors are logged, never fatal.
    pub fn reconcile(&mut self) {
        let repo_dirs = match fs::read_dir(&self.mount_base) {
            Ok(entries) => entries,
            // No mount base yet means nothing to reconcile.
            Err(_) => return,
        };

        for repo_entry in repo_dirs.flatten() {
            let repo_dir = repo_entry.path();
            if !repo_dir.is_dir() {
                continue;
            }
            let Some(repository) = file_name_string(&repo_dir) else {
                continue;
            };

            let archive_dirs = match fs::read_dir(&repo_dir) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("cannot scan {}: {}", repo_dir.display(), e);
                    continue;
                }
            };

            for archive_entry in archive_dirs.flatten() {
                let archive_dir = archive_entry.path();
                if !archive_dir.is_dir() {
                    continue;
                }
                let Some(archive) = file_name_string(&archive_dir) else {
                    continue;
                };

                if self.probe.is_mount_point(&archive_dir) {
                    let session = MountSession {
                        repository: repository.clone(),
                        archive,
                        mount_path: archive_dir.clone(),
                    };
                    info!(
                        "adopting live mount from a previous run: {}",
                        archive_dir.display()
                    );
                    if let Err(e) = self.registry.add(session) {
                        warn!("cannot adopt {}: {}", archive_dir.display(), e);
                    }
                } else {
                    // remove_dir refuses non-empty directories, which is
                    // exactly the guard we want here.
                    match fs::remove_dir(&archive_dir) {
                        Ok(()) => info!("removed leftover mount path {}", archive_dir.display()),
                        Err(e) => warn!(
                            "leaving {} alone (not empty or not removable): {}",
                            archive_dir.display(),
                            e
                        ),
                    }
                }
            }

            // Drop the per-repository directory too once nothing is left.
            let _ = fs::remove_dir(&repo_dir);
        }
    }

    /// Undo a partially completed mount: drop the just-created archive
    /// directory and, when that leaves the repository directory empty,
    /// drop it as well. Both refuse non-empty directories.
    fn rollback_mount_path(&self, path: &Path) {
        self.remove_session_dirs(path);
    }

    fn remove_session_dirs(&self, path: &Path) {
        if let Err(e) = fs::remove_dir(path) {
            warn!("cannot remove mount path {}: {}", path.display(), e);
        }
        if let Some(parent) = path.parent() {
            if parent != self.mount_base {
                let _ = fs::remove_dir(parent);
            }
        }
    }
}

fn file_name_string(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
}
