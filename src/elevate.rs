//! Privileged replacement of local files.

use crate::error::{HostsError, Result};
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::Path;
use std::process::Command;

/// Replaces a file the current user may not be allowed to write.
///
/// On success `target` holds exactly the bytes of `source`. On failure
/// `target` is either untouched or fully replaced, never partially written.
pub trait Elevator {
    /// Replaces `target` with the contents of `source`.
    ///
    /// # Errors
    ///
    /// Returns [`HostsError::Io`] or [`HostsError::ElevationFailed`] if the
    /// replacement could not be completed.
    fn replace(&self, source: &Path, target: &Path) -> Result<()>;
}

/// Replaces files directly when running as root, through `sudo` otherwise.
///
/// The file is staged next to `target` and renamed over it, so readers see
/// either the old or the new table.
#[derive(Debug, Clone)]
pub struct SudoReplace {
    program: OsString,
}

impl SudoReplace {
    /// Uses `sudo` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_program("sudo")
    }

    /// Uses another escalation helper with `sudo`-compatible arguments
    /// (e.g. `doas`).
    #[must_use]
    pub fn with_program(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, args: &[&OsStr]) -> Result<()> {
        let output = Command::new(&self.program).args(args).output()?;
        if output.status.success() {
            return Ok(());
        }
        Err(HostsError::ElevationFailed {
            status: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

impl Default for SudoReplace {
    fn default() -> Self {
        Self::new()
    }
}

impl Elevator for SudoReplace {
    fn replace(&self, source: &Path, target: &Path) -> Result<()> {
        let staged = staging_path(target);

        if is_root() {
            replace_direct(source, &staged, target)?;
        } else {
            let moved = self
                .run(&[OsStr::new("cp"), source.as_os_str(), staged.as_os_str()])
                .and_then(|()| self.run(&[OsStr::new("mv"), staged.as_os_str(), target.as_os_str()]));
            if let Err(e) = moved {
                if let Err(cleanup) = self.run(&[OsStr::new("rm"), OsStr::new("-f"), staged.as_os_str()]) {
                    tracing::warn!(path = %staged.display(), error = %cleanup, "Failed to remove staged file");
                }
                return Err(e);
            }
        }

        tracing::debug!(path = %target.display(), "Replaced file with elevated privileges");
        Ok(())
    }
}

/// Copies `source` to `staged` and renames it over `target`. `staged` is
/// removed if either step fails.
fn replace_direct(source: &Path, staged: &Path, target: &Path) -> Result<()> {
    let moved = fs::copy(source, staged).and_then(|_| fs::rename(staged, target));
    if let Err(e) = moved {
        discard(staged);
        return Err(e.into());
    }
    Ok(())
}

fn discard(staged: &Path) {
    match fs::remove_file(staged) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %staged.display(), error = %e, "Failed to remove staged file");
        }
    }
}

/// Sibling of `target` used to stage the new content.
fn staging_path(target: &Path) -> std::path::PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".hostmanager.tmp");
    target.with_file_name(name)
}

/// Returns `true` if the process runs with an effective uid of 0.
#[must_use]
pub fn is_root() -> bool {
    // SAFETY: `geteuid` has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}
