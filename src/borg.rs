// Boundary to the external archive tool. Everything the rest of the
// system knows about borg lives behind the `ArchiveTool` trait, so the
// orchestrator and catalog never branch on raw command output and the
// tests can substitute a fake invoker.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use log::debug;
use thiserror::Error;

use crate::secret::Secret;
use crate::settings::Settings;

/// One archive as reported by the listing capability.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    /// Creation time as reported by the tool, surfaced only for display.
    pub created_at: Option<String>,
}

/// Narrow result type for external invocations. The rest of the system
/// matches on these kinds instead of parsing tool output itself.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The unmount target has open file handles.
    #[error("target is busy")]
    Busy,
    /// The invocation exceeded the configured timeout and was killed.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    /// The tool exited non-zero for any other reason.
    #[error("{stderr}")]
    Failed { stderr: String },
    /// The tool could not be started at all.
    #[error("failed to start tool: {0}")]
    Spawn(#[from] std::io::Error),
}

/// The three capabilities the core consumes from the external tool.
pub trait ArchiveTool {
    /// List the archives in a repository, most recent last.
    fn list(
        &self,
        location: &str,
        remote_program: &str,
        secret: &Secret,
    ) -> Result<Vec<ArchiveEntry>, ToolError>;

    /// Mount one archive read-only onto `target`.
    fn mount(
        &self,
        location: &str,
        archive: &str,
        remote_program: &str,
        secret: &Secret,
        target: &Path,
    ) -> Result<(), ToolError>;

    /// Unmount whatever is mounted on `target`.
    fn unmount(&self, target: &Path) -> Result<(), ToolError>;
}

/// Production implementation driving the `borg` and `umount` binaries.
pub struct BorgTool {
    borg: PathBuf,
    timeout: Duration,
}

impl BorgTool {
    /// Resolve the borg binary through PATH, falling back to the bare
    /// name so a missing binary fails at invocation time with a clear
    /// spawn error rather than at startup.
    pub fn new(settings: &Settings) -> Self {
        let borg = which::which(&settings.borg_binary)
            .unwrap_or_else(|_| PathBuf::from(&settings.borg_binary));
        BorgTool {
            borg,
            timeout: settings.tool_timeout,
        }
    }

    fn borg_command(&self, secret: &Secret) -> Command {
        let mut cmd = Command::new(&self.borg);
        // The passphrase is scoped to this one child invocation; it is
        // not exported into the tool's own environment.
        cmd.env("BORG_PASSPHRASE", secret.expose());
        cmd
    }
}

impl ArchiveTool for BorgTool {
    fn list(
        &self,
        location: &str,
        remote_program: &str,
        secret: &Secret,
    ) -> Result<Vec<ArchiveEntry>, ToolError> {
        let mut cmd = self.borg_command(secret);
        cmd.arg("list")
            .arg(location)
            .arg("--format")
            .arg("{name}\t{time}{NL}")
            .arg("--remote-path")
            .arg(remote_program);
        let output = run_with_timeout(cmd, self.timeout)?;
        Ok(parse_list_output(&output))
    }

    fn mount(
        &self,
        location: &str,
        archive: &str,
        remote_program: &str,
        secret: &Secret,
        target: &Path,
    ) -> Result<(), ToolError> {
        let mut cmd = self.borg_command(secret);
        cmd.arg("mount")
            .arg(format!("{}::{}", location, archive))
            .arg(target)
            .arg("--remote-path")
            .arg(remote_program)
            .arg("-o")
            .arg("ro")
            .arg("--umask")
            .arg("022");
        run_with_timeout(cmd, self.timeout)?;
        Ok(())
    }

    fn unmount(&self, target: &Path) -> Result<(), ToolError> {
        let mut cmd = Command::new("umount");
        cmd.arg(target);
        match run_with_timeout(cmd, self.timeout) {
            Ok(_) => Ok(()),
            Err(ToolError::Failed { stderr }) if stderr_reports_busy(&stderr) => {
                Err(ToolError::Busy)
            }
            Err(e) => Err(e),
        }
    }
}

/// Run a command to completion, enforcing the timeout. The child's
/// stdout and stderr are drained on separate threads so a chatty tool
/// cannot deadlock on a full pipe. On expiry the child is killed and
/// `ToolError::Timeout` is returned.
fn run_with_timeout(mut cmd: Command, timeout: Duration) -> Result<String, ToolError> {
    debug!("running {:?}", cmd);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = cmd.spawn()?;

    let stdout_reader = drain(child.stdout.take());
    let stderr_reader = drain(child.stderr.take());

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait()? {
            Some(status) => break status,
            None if Instant::now() >= deadline => {
                kill_and_reap(&mut child);
                return Err(ToolError::Timeout(timeout));
            }
            None => std::thread::sleep(Duration::from_millis(50)),
        }
    };

    let stdout = stdout_reader.join().unwrap_or_default();
    let stderr = stderr_reader.join().unwrap_or_default();

    if status.success() {
        Ok(stdout)
    } else {
        let stderr = stderr.trim().to_string();
        let stderr = if stderr.is_empty() {
            format!("exited with {}", status)
        } else {
            stderr
        };
        Err(ToolError::Failed { stderr })
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> std::thread::JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_string(&mut buf);
        }
        buf
    })
}

fn kill_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Parse `borg list --format "{name}\t{time}{NL}"` output. Lines without
/// a tab still yield an entry with no creation time, so an older tool
/// that ignores the format string degrades gracefully.
fn parse_list_output(output: &str) -> Vec<ArchiveEntry> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|line| match line.split_once('\t') {
            Some((name, time)) => ArchiveEntry {
                name: name.trim().to_string(),
                created_at: Some(time.trim().to_string()).filter(|t| !t.is_empty()),
            },
            None => ArchiveEntry {
                name: line.to_string(),
                created_at: None,
            },
        })
        .collect()
}

/// `umount` wording differs across util-linux versions; both the old
/// "device is busy" and the new "target is busy" forms must match.
fn stderr_reports_busy(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    lower.contains("busy")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_times() {
        let out = "container-os-2025-12-15T02:01:11\tMon, 2025-12-15 02:01:11\n\
                   web-2025-12-16T03:00:00\tTue, 2025-12-16 03:00:00\n";
        let entries = parse_list_output(out);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "container-os-2025-12-15T02:01:11");
        assert_eq!(
            entries[0].created_at.as_deref(),
            Some("Mon, 2025-12-15 02:01:11")
        );
    }

    #[test]
    fn parses_short_lines_without_times() {
        let entries = parse_list_output("plain-archive\n\n  \n");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "plain-archive");
        assert!(entries[0].created_at.is_none());
    }

    #[test]
    fn busy_detection_matches_both_umount_wordings() {
        assert!(stderr_reports_busy("umount: /mnt/x: target is busy."));
        assert!(stderr_reports_busy("umount: /mnt/x: device is busy"));
        assert!(!stderr_reports_busy("umount: /mnt/x: not mounted"));
    }

    #[test]
    fn run_captures_stdout_of_successful_command() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("echo hello");
        let out = run_with_timeout(cmd, Duration::from_secs(5)).unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[test]
    fn run_reports_stderr_of_failing_command() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("echo oops >&2; exit 2");
        let err = run_with_timeout(cmd, Duration::from_secs(5)).unwrap_err();
        match err {
            ToolError::Failed { stderr } => assert_eq!(stderr, "oops"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn run_kills_commands_that_exceed_the_timeout() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("sleep 30");
        let start = Instant::now();
        let err = run_with_timeout(cmd, Duration::from_millis(200)).unwrap_err();
        assert!(matches!(err, ToolError::Timeout(_)));
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
