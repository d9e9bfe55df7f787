// UI layer: provides the interactive menu using `dialoguer`.
// The functions are small and synchronous to make the flow easy to
// follow. Every selection is made from an enumerated list; in
// particular, unmount targets come from the session registry, never from
// a typed-in path.

use anyhow::Result;
use dialoguer::Select;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::borg::ArchiveTool;
use crate::catalog;
use crate::error::Error;
use crate::orchestrator::{MountProbe, Orchestrator};
use crate::secret;
use crate::settings::Settings;
use crate::status;

/// Main interactive menu. Receives the orchestrator and runs a select
/// loop until the operator chooses "Exit". Active mounts are left in
/// place on exit by design; re-running the tool offers to unmount them.
///
/// Note: `Select::interact()` is keyboard-driven: arrow keys and Enter
/// choose an option.
pub fn main_menu<T: ArchiveTool, P: MountProbe>(
    mut orch: Orchestrator<T, P>,
    settings: &Settings,
) -> Result<()> {
    loop {
        let items = vec!["Mount an archive", "Unmount an archive", "Show status", "Exit"];
        let selection = Select::new().items(&items).default(0).interact()?;
        match selection {
            0 => handle_mount(&mut orch, settings)?,
            1 => handle_unmount(&mut orch)?,
            2 => println!("\n{}", status::render(orch.registry())),
            3 => break,
            _ => {}
        }
    }
    Ok(())
}

/// Repository selection -> archive selection -> mount. Each failure is
/// printed and returns the operator to the menu; nothing here is fatal.
fn handle_mount<T: ArchiveTool, P: MountProbe>(
    orch: &mut Orchestrator<T, P>,
    settings: &Settings,
) -> Result<()> {
    let repos = match catalog::list_repositories(settings) {
        Ok(repos) => repos,
        Err(e) => {
            println!("Cannot read configurations: {}", e);
            return Ok(());
        }
    };
    if repos.is_empty() {
        println!("No repository configurations found in {}.", settings.config_dir.display());
        return Ok(());
    }

    let labels: Vec<String> = repos
        .iter()
        .map(|r| format!("{} ({})", r.identifier, r.location))
        .collect();
    let choice = Select::new()
        .with_prompt("Select repository")
        .items(&labels)
        .default(0)
        .interact()?;
    let repo = &repos[choice];

    let secret = match secret::resolve(repo) {
        Ok(secret) => secret,
        Err(e) => {
            println!("{}", e);
            return Ok(());
        }
    };

    // Listing a remote repository can take a while; show a spinner so
    // the operator knows the tool is working.
    let spinner = spinner("Querying archives...");
    let archives = catalog::list_archives(orch.tool(), repo, &secret);
    spinner.finish_and_clear();

    let archives = match archives {
        Ok(archives) => archives,
        Err(e) => {
            println!("{}", e);
            return Ok(());
        }
    };
    if archives.is_empty() {
        println!("No archives found in repository '{}'.", repo.identifier);
        return Ok(());
    }

    let labels: Vec<String> = archives
        .iter()
        .map(|a| match &a.created_at {
            Some(time) => format!("{}  ({})", a.name, time),
            None => a.name.clone(),
        })
        .collect();
    let choice = Select::new()
        .with_prompt("Select archive")
        .items(&labels)
        .default(labels.len() - 1)
        .interact()?;
    let archive = &archives[choice].name;

    println!("\nArchives are mounted READ-ONLY; repository data is not modified.");
    let spinner = self::spinner("Mounting...");
    let outcome = orch.mount(repo, archive);
    spinner.finish_and_clear();

    match outcome {
        Ok(session) => {
            println!("Mounted archive : {}", session.archive);
            println!("Mount point     : {}", session.mount_path.display());
        }
        Err(e @ Error::AlreadyMounted { .. }) => println!("{}", e),
        Err(e) => println!("Mount failed: {}", e),
    }
    Ok(())
}

/// Pick an active session from the registry and unmount it.
fn handle_unmount<T: ArchiveTool, P: MountProbe>(orch: &mut Orchestrator<T, P>) -> Result<()> {
    let sessions: Vec<(String, String)> = orch
        .registry()
        .list()
        .iter()
        .map(|s| (s.repository.clone(), s.archive.clone()))
        .collect();
    if sessions.is_empty() {
        println!("No archive mounted.");
        return Ok(());
    }

    let labels: Vec<String> = sessions
        .iter()
        .map(|(repo, archive)| format!("{} :: {}", repo, archive))
        .collect();
    let choice = Select::new()
        .with_prompt("Select session to unmount")
        .items(&labels)
        .default(0)
        .interact()?;
    let (repository, archive) = &sessions[choice];

    let spinner = spinner("Unmounting...");
    let outcome = orch.unmount(repository, archive);
    spinner.finish_and_clear();

    match outcome {
        Ok(()) => println!("Unmounted {} :: {}", repository, archive),
        Err(e @ Error::UnmountBusy { .. }) => println!("{}", e),
        Err(e) => println!("Unmount failed: {}", e),
    }
    Ok(())
}

fn spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
