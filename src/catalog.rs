// Repository and archive enumeration. Each call re-queries live state;
// nothing here is cached, so a listing always reflects what the config
// directory and the repository actually contain right now.

use crate::borg::ArchiveTool;
use crate::config::{self, RepositoryConfig};
use crate::error::{Error, Result};
use crate::secret::Secret;
use crate::settings::Settings;

/// One archive available for mounting, as seen by the operator.
#[derive(Clone, Debug)]
pub struct ArchiveDescriptor {
    pub repository: String,
    pub name: String,
    pub created_at: Option<String>,
}

/// All configured repositories, sorted by identifier.
pub fn list_repositories(settings: &Settings) -> Result<Vec<RepositoryConfig>> {
    config::read_entries(settings)
}

/// The archives currently stored in one repository. A tool failure
/// (network, bad passphrase, timeout) surfaces as `RepositoryUnreachable`
/// naming the repository; it never touches the session registry.
pub fn list_archives(
    tool: &dyn ArchiveTool,
    repo: &RepositoryConfig,
    secret: &Secret,
) -> Result<Vec<ArchiveDescriptor>> {
    let entries = tool
        .list(&repo.location, &repo.remote_program, secret)
        .map_err(|e| Error::RepositoryUnreachable {
            repository: repo.identifier.clone(),
            reason: e.to_string(),
        })?;

    Ok(entries
        .into_iter()
        .map(|e| ArchiveDescriptor {
            repository: repo.identifier.clone(),
            name: e.name,
            created_at: e.created_at,
        })
        .collect())
}
