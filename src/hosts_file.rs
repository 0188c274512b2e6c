//! Hosts table reconciliation.
//!
//! Every line written by this module carries a marker comment with the
//! machine id. Lines without the marker belong to someone else and are
//! copied through untouched.

use crate::error::Result;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Marker comment embedded in every managed hosts line.
pub const MANAGED_MARKER: &str = "# VAGRANT ID:";

/// One generated hosts line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedEntry {
    /// Advertised address; `None` renders as an empty field.
    pub address: Option<String>,
    pub hostname: String,
    pub aliases: Vec<String>,
    /// Provider-assigned machine id; may be empty.
    pub machine_id: String,
}

impl ManagedEntry {
    #[must_use]
    pub fn new(
        address: Option<String>,
        hostname: impl Into<String>,
        aliases: Vec<String>,
        machine_id: impl Into<String>,
    ) -> Self {
        Self {
            address,
            hostname: hostname.into(),
            aliases,
            machine_id: machine_id.into(),
        }
    }

    /// Renders the entry as a hosts line, terminator included.
    ///
    /// ```text
    /// 10.0.0.9	web www	# VAGRANT ID: 5f1c...
    /// ```
    #[must_use]
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ManagedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{address}\t{host} {aliases}\t{MANAGED_MARKER} {id}",
            address = self.address.as_deref().unwrap_or_default(),
            host = self.hostname,
            aliases = self.aliases.join(" "),
            id = self.machine_id,
        )
    }
}

/// Returns `true` if `line` was generated by this crate.
#[must_use]
pub fn is_managed_line(line: &str) -> bool {
    line.contains(MANAGED_MARKER)
}

/// Managed lines of `table`, terminators included, in file order.
#[must_use]
pub fn managed_lines(table: &str) -> Vec<&str> {
    table
        .split_inclusive('\n')
        .filter(|line| is_managed_line(line))
        .collect()
}

/// Merges `entries` into an existing hosts table.
///
/// Foreign lines are kept byte for byte and in order; every managed line is
/// dropped and `entries` are appended after the last foreign line. Running
/// this again on its own output with the same entries returns it unchanged.
#[must_use]
pub fn reconcile(existing: &str, entries: &[ManagedEntry]) -> String {
    let mut out = String::with_capacity(existing.len() + entries.len() * 64);

    for line in existing.split_inclusive('\n') {
        if !is_managed_line(line) {
            out.push_str(line);
        }
    }

    if entries.is_empty() {
        return out;
    }
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    for entry in entries {
        out.push_str(&entry.render());
    }
    out
}

/// Rewrites the hosts table at `path` with `entries`.
///
/// The new content is written to a temp file in the same directory as
/// `path` and renamed over it once fully flushed, so `path` is never left
/// half-written. The file's permissions are carried over.
///
/// # Errors
///
/// Returns [`HostsError::Io`](crate::HostsError::Io) if `path` cannot be
/// read or the temp file cannot be written or persisted.
pub fn update_file(path: &Path, entries: &[ManagedEntry]) -> Result<()> {
    let existing = fs::read_to_string(path)?;
    let updated = reconcile(&existing, entries);

    if updated == existing {
        tracing::debug!(path = %path.display(), "Hosts table already up to date");
        return Ok(());
    }

    // Same directory, so the final rename never crosses filesystems.
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::Builder::new()
        .prefix("hostmanager")
        .tempfile_in(dir)?;
    tmp.write_all(updated.as_bytes())?;
    tmp.as_file().sync_all()?;
    fs::set_permissions(tmp.path(), fs::metadata(path)?.permissions())?;
    tmp.persist(path).map_err(std::io::Error::from)?;

    tracing::debug!(
        path = %path.display(),
        entries = entries.len(),
        "Rewrote hosts table"
    );
    Ok(())
}
