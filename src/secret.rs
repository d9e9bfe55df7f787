// Secret resolution. The passphrase lives only in process memory inside
// the `Secret` wrapper and is handed to the child process as a
// per-invocation environment variable; it is never written to disk and
// never shows up in log or debug output.

use std::fmt;

use crate::config::{self, RepositoryConfig};
use crate::error::{Error, Result};

/// A repository passphrase. Redacted in `Debug` and `Display`; callers
/// that genuinely need the value must say so via [`Secret::expose`].
#[derive(Clone)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Secret(value.into())
    }

    /// The raw passphrase, for handing to the external tool.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(****)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

/// Read the passphrase for a repository from its configuration entry.
/// Fails with `SecretUnavailable` when the entry has none or cannot be
/// re-read.
pub fn resolve(repo: &RepositoryConfig) -> Result<Secret> {
    let pass = config::load_passphrase(&repo.source_path)
        .ok()
        .flatten()
        .ok_or_else(|| Error::SecretUnavailable {
            repository: repo.identifier.clone(),
        })?;
    Ok(Secret::new(pass))
}
