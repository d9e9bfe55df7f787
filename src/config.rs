// Configuration entries: one borgmatic-style YAML file per repository.
// Both the newer schema (everything nested under `location:`) and the old
// flat schema are accepted, because real config directories contain a mix
// of both. Parsing is deliberately loose: unknown keys are ignored and
// only the handful of fields this tool needs are pulled out.

use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::settings::Settings;

/// One configured backup repository, as read from a single config entry.
/// Immutable for the process lifetime. The passphrase is not stored here;
/// it is resolved lazily from `source_path` when a mount needs it.
#[derive(Clone, Debug)]
pub struct RepositoryConfig {
    /// Operator-facing identifier: the repository label if the entry
    /// declares one, otherwise the config file stem.
    pub identifier: String,
    /// Repository location: a local path or a remote `host:path` form.
    pub location: String,
    /// Remote borg program (`--remote-path`) for this repository.
    pub remote_program: String,
    /// The config file this entry was read from.
    pub source_path: PathBuf,
}

#[derive(Deserialize)]
struct RawConfig {
    #[serde(default)]
    location: Option<RawLocation>,
    #[serde(default)]
    repositories: Option<Vec<RawRepository>>,
    #[serde(default)]
    storage: Option<RawStorage>,
    #[serde(default)]
    encryption_passphrase: Option<String>,
}

#[derive(Deserialize)]
struct RawLocation {
    #[serde(default)]
    remote_path: Option<String>,
    #[serde(default)]
    repositories: Option<Vec<RawRepository>>,
}

#[derive(Deserialize)]
struct RawStorage {
    #[serde(default)]
    encryption_passphrase: Option<String>,
}

/// Repositories appear either as a bare string or as a mapping with
/// `path` and an optional `label`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawRepository {
    Detailed {
        #[serde(default)]
        path: Option<String>,
        #[serde(default)]
        label: Option<String>,
    },
    Plain(String),
}

impl RawRepository {
    fn path(&self) -> Option<&str> {
        match self {
            RawRepository::Plain(p) => Some(p),
            RawRepository::Detailed { path, .. } => path.as_deref(),
        }
    }

    fn label(&self) -> Option<&str> {
        match self {
            RawRepository::Plain(_) => None,
            RawRepository::Detailed { label, .. } => label.as_deref(),
        }
    }
}

fn load_raw(path: &Path) -> anyhow::Result<RawConfig> {
    let text = fs::read_to_string(path)?;
    let raw: RawConfig = serde_yaml::from_str(&text)?;
    Ok(raw)
}

/// Extract the identifier / location / remote program from one entry.
/// Returns `None` when the entry declares no repository at all.
fn parse_entry(path: &Path, default_remote: &str) -> anyhow::Result<Option<RepositoryConfig>> {
    let raw = load_raw(path)?;

    // New schema first, then the old flat one, first repository wins.
    let (repo, remote) = match &raw.location {
        Some(loc) => (
            loc.repositories.as_ref().and_then(|r| r.first()),
            loc.remote_path.as_deref(),
        ),
        None => (None, None),
    };
    let repo = repo.or_else(|| raw.repositories.as_ref().and_then(|r| r.first()));

    let Some(repo) = repo else {
        return Ok(None);
    };
    let Some(location) = repo.path() else {
        return Ok(None);
    };

    let identifier = repo
        .label()
        .map(str::to_string)
        .or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| location.to_string());

    Ok(Some(RepositoryConfig {
        identifier,
        location: location.to_string(),
        remote_program: remote.unwrap_or(default_remote).to_string(),
        source_path: path.to_path_buf(),
    }))
}

/// Read the passphrase from a config entry, checking the new `storage:`
/// position first and the old top-level key second.
pub(crate) fn load_passphrase(path: &Path) -> anyhow::Result<Option<String>> {
    let raw = load_raw(path)?;
    let pass = raw
        .storage
        .and_then(|s| s.encryption_passphrase)
        .or(raw.encryption_passphrase);
    Ok(pass)
}

/// Scan the configuration directory and return one `RepositoryConfig` per
/// readable `.yml`/`.yaml` entry, sorted lexicographically by identifier
/// so operator-facing indices stay stable across invocations.
///
/// An unreadable directory is `ConfigUnavailable` (fatal to startup).
/// A malformed or repository-less entry is logged and skipped so one bad
/// file does not take the whole catalog down.
pub fn read_entries(settings: &Settings) -> Result<Vec<RepositoryConfig>> {
    let dir = &settings.config_dir;
    let entries = fs::read_dir(dir).map_err(|source| Error::ConfigUnavailable {
        path: dir.clone(),
        source,
    })?;

    let mut repos = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| Error::ConfigUnavailable {
            path: dir.clone(),
            source,
        })?;
        let path = entry.path();
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e == "yml" || e == "yaml")
            .unwrap_or(false);
        if !is_yaml {
            continue;
        }

        match parse_entry(&path, &settings.default_remote_program) {
            Ok(Some(repo)) => repos.push(repo),
            Ok(None) => warn!("no repository declared in {}, skipping", path.display()),
            Err(e) => warn!("cannot parse {}: {}, skipping", path.display(), e),
        }
    }

    repos.sort_by(|a, b| a.identifier.cmp(&b.identifier));
    Ok(repos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn settings_for(dir: &TempDir) -> Settings {
        Settings {
            config_dir: dir.path().to_path_buf(),
            mount_base: PathBuf::from("/tmp/unused"),
            borg_binary: "borg".into(),
            default_remote_program: "borg14".into(),
            tool_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn parses_new_schema_with_label_and_remote() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("cloud.yaml"),
            "location:\n  remote_path: borg15\n  repositories:\n    - path: ssh://backup@host/./repo\n      label: cloud\nstorage:\n  encryption_passphrase: hunter2\n",
        )
        .unwrap();

        let repos = read_entries(&settings_for(&dir)).unwrap();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].identifier, "cloud");
        assert_eq!(repos[0].location, "ssh://backup@host/./repo");
        assert_eq!(repos[0].remote_program, "borg15");
    }

    #[test]
    fn parses_old_flat_schema_with_plain_repository() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("web.yml"),
            "repositories:\n  - /srv/backups/web\nencryption_passphrase: s3cret\n",
        )
        .unwrap();

        let repos = read_entries(&settings_for(&dir)).unwrap();
        assert_eq!(repos.len(), 1);
        // No label: identifier falls back to the file stem.
        assert_eq!(repos[0].identifier, "web");
        assert_eq!(repos[0].location, "/srv/backups/web");
        assert_eq!(repos[0].remote_program, "borg14");
    }

    #[test]
    fn ordering_is_lexicographic_by_identifier() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("zz.yml"), "repositories:\n  - /srv/a\n").unwrap();
        fs::write(dir.path().join("aa.yml"), "repositories:\n  - /srv/b\n").unwrap();

        let repos = read_entries(&settings_for(&dir)).unwrap();
        let ids: Vec<_> = repos.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(ids, vec!["aa", "zz"]);
    }

    #[test]
    fn skips_non_yaml_and_malformed_entries() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("notes.txt"), "not a config").unwrap();
        fs::write(dir.path().join("broken.yml"), "repositories: [unclosed").unwrap();
        fs::write(dir.path().join("ok.yml"), "repositories:\n  - /srv/ok\n").unwrap();

        let repos = read_entries(&settings_for(&dir)).unwrap();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].identifier, "ok");
    }

    #[test]
    fn missing_directory_is_config_unavailable() {
        let dir = TempDir::new().unwrap();
        let mut settings = settings_for(&dir);
        settings.config_dir = dir.path().join("does-not-exist");

        let err = read_entries(&settings).unwrap_err();
        assert!(matches!(err, Error::ConfigUnavailable { .. }));
    }

    #[test]
    fn passphrase_found_in_either_schema_position() {
        let dir = TempDir::new().unwrap();
        let new_style = dir.path().join("new.yml");
        fs::write(&new_style, "storage:\n  encryption_passphrase: abc\n").unwrap();
        let old_style = dir.path().join("old.yml");
        fs::write(&old_style, "encryption_passphrase: xyz\n").unwrap();

        assert_eq!(load_passphrase(&new_style).unwrap().as_deref(), Some("abc"));
        assert_eq!(load_passphrase(&old_style).unwrap().as_deref(), Some("xyz"));
    }
}
