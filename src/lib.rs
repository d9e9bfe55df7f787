// Library root
// -----------
// This crate exposes a small library surface for the borgrestore CLI.
// The binary (`main.rs`) uses these modules to implement the interactive
// mount/unmount tool.
//
// Module responsibilities:
// - `settings`: Process-wide settings resolved from environment variables
//   (config directory, mount base, borg binary, timeout).
// - `error`: The structured error taxonomy shared by all core operations.
// - `config`: Reads borgmatic-style configuration entries and yields one
//   `RepositoryConfig` per file.
// - `secret`: Extracts a repository's encryption passphrase and wraps it
//   in a redacting `Secret` type.
// - `borg`: The boundary to the external `borg` tool (list, mount,
//   unmount) behind the `ArchiveTool` trait.
// - `catalog`: Enumerates repositories and, per repository, the archives
//   currently stored in it.
// - `registry`: Pure in-memory bookkeeping of active mount sessions.
// - `orchestrator`: The mount/unmount state machine that ties the above
//   together and owns the mount base directory tree.
// - `status`: Renders the registry for the operator.
// - `ui`: Implements the terminal menu flows and delegates to the
//   orchestrator.
//
// Keeping this separation makes it easier to test the mount logic with a
// fake tool invoker, or replace the UI in the future.
pub mod borg;
pub mod catalog;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod registry;
pub mod secret;
pub mod settings;
pub mod status;
pub mod ui;
