// Status display. A pure function of the registry: no filesystem reads,
// no side effects, nothing that can fail.

use std::fmt::Write;

use crate::registry::MountRegistry;

/// Render the active sessions for the operator, one block per session
/// in mount order, or an explicit "no archive mounted" line when the
/// registry is empty.
pub fn render(registry: &MountRegistry) -> String {
    let mut out = String::from("STATUS:\n");
    if registry.is_empty() {
        out.push_str(" - No archive mounted\n");
        return out;
    }

    for session in registry.list() {
        let _ = writeln!(out, " - Repo   : {}", session.repository);
        let _ = writeln!(out, "   Archive: {}", session.archive);
        let _ = writeln!(out, "   Mount  : {}", session.mount_path.display());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MountSession;
    use std::path::PathBuf;

    #[test]
    fn empty_registry_says_no_archive_mounted() {
        let registry = MountRegistry::new();
        let text = render(&registry);
        assert!(text.contains("No archive mounted"));
    }

    #[test]
    fn one_session_renders_repo_archive_and_full_path() {
        let mut registry = MountRegistry::new();
        registry
            .add(MountSession {
                repository: "cloud".into(),
                archive: "container-os-2025-12-15T02:01:11".into(),
                mount_path: PathBuf::from(
                    "/mnt/borgrestore/cloud/container-os-2025-12-15T02:01:11",
                ),
            })
            .unwrap();

        let text = render(&registry);
        assert!(text.contains("Repo   : cloud"));
        assert!(text.contains("Archive: container-os-2025-12-15T02:01:11"));
        assert!(text.contains("Mount  : /mnt/borgrestore/cloud/container-os-2025-12-15T02:01:11"));
        assert!(!text.contains("No archive mounted"));
    }

    #[test]
    fn sessions_render_in_mount_order() {
        let mut registry = MountRegistry::new();
        for (repo, archive) in [("cloud", "a1"), ("web", "b1")] {
            registry
                .add(MountSession {
                    repository: repo.into(),
                    archive: archive.into(),
                    mount_path: PathBuf::from(format!("/mnt/borgrestore/{repo}/{archive}")),
                })
                .unwrap();
        }

        let text = render(&registry);
        let cloud_at = text.find("cloud").unwrap();
        let web_at = text.find("web").unwrap();
        assert!(cloud_at < web_at);
    }
}
