// Entrypoint for the borgrestore CLI.
// - Keeps `main` small: build settings, validate the configuration
//   directory, reconcile leftover mount points, then hand control to the
//   interactive menu loop.
// - Returns `anyhow::Result` so a fatal startup error (an unreadable
//   configuration directory) exits non-zero with a readable message.

use borgrestore::borg::BorgTool;
use borgrestore::catalog;
use borgrestore::orchestrator::{DeviceIdProbe, Orchestrator};
use borgrestore::settings::Settings;
use borgrestore::status;
use borgrestore::ui::main_menu;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Settings come from environment variables with defaults; see
    // `settings::Settings::from_env`.
    let settings = Settings::from_env();

    // Fail fast when the configuration directory is unreadable. The
    // catalog re-reads it per action, so this is purely a startup gate.
    catalog::list_repositories(&settings)?;

    let tool = BorgTool::new(&settings);
    let mut orch = Orchestrator::new(settings.mount_base.clone(), tool, DeviceIdProbe);

    // Adopt mounts left by a previous run and clear out half-finished
    // mount directories before the operator sees anything.
    orch.reconcile();

    println!("\n=== Borg Restore Tool ===");
    println!("\n{}", status::render(orch.registry()));

    // Start the interactive menu. This call blocks until the operator
    // exits; active mounts persist across exits by design.
    main_menu(orch, &settings)?;
    Ok(())
}
