// Process settings resolved from environment variables with sensible
// defaults, mirroring the rest of the tool's zero-flag invocation style.
// Everything here is read once at startup and treated as immutable.

use std::path::PathBuf;
use std::time::Duration;

/// Default location of the borgmatic configuration entries.
const DEFAULT_CONFIG_DIR: &str = "/root/borgmatic";
/// Default base directory under which archives are mounted.
const DEFAULT_MOUNT_BASE: &str = "/mnt/borgrestore";
/// Default borg binary name, resolved through PATH.
const DEFAULT_BORG_BINARY: &str = "borg";
/// Default remote borg program for repositories that do not name one.
const DEFAULT_REMOTE_PROGRAM: &str = "borg14";
/// Default timeout for every external tool invocation, in seconds.
/// A hung remote repository otherwise blocks the whole session forever.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Settings for one run of the tool.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Directory holding one configuration entry per repository.
    pub config_dir: PathBuf,
    /// Base directory for mount points: `{mount_base}/{repo}/{archive}`.
    pub mount_base: PathBuf,
    /// Name or path of the borg binary.
    pub borg_binary: String,
    /// Remote borg program passed as `--remote-path` when a repository
    /// config does not specify its own.
    pub default_remote_program: String,
    /// Upper bound on the runtime of a single external invocation.
    pub tool_timeout: Duration,
}

impl Settings {
    /// Build settings from the environment, falling back to the defaults
    /// above. Recognised variables: `BORGRESTORE_CONFIG_DIR`,
    /// `BORGRESTORE_MOUNT_BASE`, `BORGRESTORE_BORG`,
    /// `BORGRESTORE_REMOTE` and `BORGRESTORE_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let config_dir = std::env::var("BORGRESTORE_CONFIG_DIR")
            .unwrap_or_else(|_| DEFAULT_CONFIG_DIR.into());
        let mount_base = std::env::var("BORGRESTORE_MOUNT_BASE")
            .unwrap_or_else(|_| DEFAULT_MOUNT_BASE.into());
        let borg_binary =
            std::env::var("BORGRESTORE_BORG").unwrap_or_else(|_| DEFAULT_BORG_BINARY.into());
        let default_remote_program =
            std::env::var("BORGRESTORE_REMOTE").unwrap_or_else(|_| DEFAULT_REMOTE_PROGRAM.into());
        let timeout_secs = std::env::var("BORGRESTORE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Settings {
            config_dir: PathBuf::from(config_dir),
            mount_base: PathBuf::from(mount_base),
            borg_binary,
            default_remote_program,
            tool_timeout: Duration::from_secs(timeout_secs),
        }
    }
}
