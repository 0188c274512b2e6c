//! Local and guest sync flows.
//!
//! Both flows stage the table in a freshly created, uniquely named file in
//! the scratch directory, rewrite the staged copy, and only then move it over
//! the live file. A failure at any step leaves the live table untouched and
//! is reported for that machine alone.

use crate::context::ReconcileContext;
use crate::elevate::Elevator;
use crate::entries::{build_entries, collect_entries, enumerate_machines};
use crate::error::{HostsError, Result, SyncStep};
use crate::hosts_file::{ManagedEntry, update_file};
use crate::machine::MachineRef;
use crate::resolver::Resolver;
use std::fs;
use std::io;
use std::path::Path;
use tempfile::NamedTempFile;

/// Machine name used in errors and logs for the local host.
pub const LOCAL: &str = "local";

/// Outcome of syncing one guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteSync {
    /// The guest's table now holds `entries` managed lines.
    Updated { entries: usize },
    /// The guest had no live channel and was left alone.
    NotReady,
}

/// Drives reconciliation passes against the local host and guests.
///
/// # Example
///
/// ```rust,ignore
/// use hostmanager::{HostManagerConfig, HostsSync, ReconcileContext, SudoReplace};
///
/// let config = HostManagerConfig::new();
/// let ctx = ReconcileContext::new(&roster, &transport, &config, "virtualbox");
/// let sync = HostsSync::new(ctx, &SudoReplace::new())?;
///
/// sync.sync_local()?;
/// for (machine, result) in sync.sync_guests() {
///     if let Err(e) = result {
///         eprintln!("{machine}: {e}");
///     }
/// }
/// ```
pub struct HostsSync<'a> {
    ctx: ReconcileContext<'a>,
    elevator: &'a dyn Elevator,
}

impl<'a> HostsSync<'a> {
    /// Creates a driver for `ctx`, using `elevator` for the local table.
    ///
    /// # Errors
    ///
    /// Returns [`HostsError::InvalidConfig`] if the context's config is invalid.
    pub fn new(ctx: ReconcileContext<'a>, elevator: &'a dyn Elevator) -> Result<Self> {
        ctx.config.validate()?;
        Ok(Self { ctx, elevator })
    }

    /// Computes the managed entries for the current roster.
    #[must_use]
    pub fn entries(&self) -> Vec<ManagedEntry> {
        collect_entries(&self.ctx)
    }

    /// Rewrites the local hosts table. Returns the number of managed lines.
    ///
    /// # Errors
    ///
    /// Returns [`HostsError::Sync`] naming the failed step if the table could
    /// not be staged, rewritten, or replaced, or [`HostsError::Cancelled`].
    pub fn sync_local(&self) -> Result<usize> {
        self.ctx.check_cancelled()?;
        let entries = self.entries();
        self.write_local(&entries)
    }

    /// Rewrites the local hosts table with precomputed `entries`.
    ///
    /// # Errors
    ///
    /// Same as [`sync_local`](Self::sync_local).
    pub fn write_local(&self, entries: &[ManagedEntry]) -> Result<usize> {
        let config = self.ctx.config;
        let scratch = scratch_file(&config.scratch_dir, LOCAL)
            .and_then(|mut scratch| {
                stage_local(&config.hosts_path, &mut scratch)?;
                Ok(scratch)
            })
            .map_err(|e| HostsError::from(e).during(LOCAL, SyncStep::CopyToScratch))?;
        update_file(scratch.path(), entries)
            .map_err(|e| e.during(LOCAL, SyncStep::Rewrite))?;

        self.ctx.check_cancelled()?;
        self.elevator
            .replace(scratch.path(), &config.hosts_path)
            .map_err(|e| e.during(LOCAL, SyncStep::ElevatedReplace))?;

        tracing::info!(
            path = %config.hosts_path.display(),
            entries = entries.len(),
            "Updated local hosts table"
        );
        Ok(entries.len())
    }

    /// Rewrites the hosts table on `machine`.
    ///
    /// A guest without a live channel is skipped with [`RemoteSync::NotReady`].
    ///
    /// # Errors
    ///
    /// Returns [`HostsError::Sync`] naming the failed step, or
    /// [`HostsError::Cancelled`].
    pub fn sync_remote(&self, machine: &MachineRef) -> Result<RemoteSync> {
        self.ctx.check_cancelled()?;
        let entries = self.entries();
        self.push_remote(machine, &entries)
    }

    /// Rewrites the hosts table on `machine` with precomputed `entries`.
    ///
    /// # Errors
    ///
    /// Same as [`sync_remote`](Self::sync_remote).
    pub fn push_remote(&self, machine: &MachineRef, entries: &[ManagedEntry]) -> Result<RemoteSync> {
        let ctx = &self.ctx;
        let config = ctx.config;
        let name = machine.name.as_str();

        ctx.check_cancelled()?;
        if !ctx.transport.ready(machine) {
            tracing::debug!(machine = %name, "Guest not ready, skipping");
            return Ok(RemoteSync::NotReady);
        }

        let scratch = scratch_file(&config.scratch_dir, name)
            .map_err(|e| HostsError::from(e).during(name, SyncStep::Download))?;
        ctx.transport
            .download(machine, &config.guest_hosts_path, scratch.path())
            .map_err(|e| HostsError::from(e).during(name, SyncStep::Download))?;
        make_world_readable(scratch.path())
            .map_err(|e| HostsError::from(e).during(name, SyncStep::Download))?;
        update_file(scratch.path(), entries)
            .map_err(|e| e.during(name, SyncStep::Rewrite))?;

        ctx.check_cancelled()?;
        ctx.transport
            .upload(machine, scratch.path(), &config.guest_upload_path)
            .map_err(|e| HostsError::from(e).during(name, SyncStep::Upload))?;

        ctx.check_cancelled()?;
        ctx.transport
            .elevated_move(machine, &config.guest_upload_path, &config.guest_hosts_path)
            .map_err(|e| HostsError::from(e).during(name, SyncStep::ElevatedMove))?;

        tracing::info!(machine = %name, entries = entries.len(), "Updated guest hosts table");
        Ok(RemoteSync::Updated {
            entries: entries.len(),
        })
    }

    /// Rewrites the hosts table on every machine of the provider.
    ///
    /// Entries are computed once so every guest receives the same managed
    /// lines. Guests are processed one at a time in roster order; a failure
    /// is recorded for that guest and the batch moves on.
    #[must_use]
    pub fn sync_guests(&self) -> Vec<(MachineRef, Result<RemoteSync>)> {
        let ctx = &self.ctx;
        let machines = enumerate_machines(ctx.roster, ctx.provider, ctx.config.include_offline);
        let entries = build_entries(
            &machines,
            &Resolver::new(ctx.transport),
            ctx.config.missing_address,
        );

        machines
            .into_iter()
            .map(|(machine, _)| {
                let result = self.push_remote(&machine, &entries);
                if let Err(e) = &result {
                    tracing::warn!(machine = %machine.name, error = %e, "Guest sync failed");
                }
                (machine, result)
            })
            .collect()
    }
}

/// Creates an empty scratch file with an unpredictable name in `dir`.
///
/// The file is created exclusively (never through an existing link) and is
/// removed when dropped.
fn scratch_file(dir: &Path, machine: &str) -> io::Result<NamedTempFile> {
    let safe: String = machine
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    tempfile::Builder::new()
        .prefix(&format!("hosts.{safe}."))
        .tempfile_in(dir)
}

/// Copies the live table into `scratch` through the open handle, keeping its
/// permissions.
fn stage_local(live: &Path, scratch: &mut NamedTempFile) -> io::Result<()> {
    let mut source = fs::File::open(live)?;
    io::copy(&mut source, scratch.as_file_mut())?;
    scratch
        .as_file()
        .set_permissions(source.metadata()?.permissions())
}

/// Scratch files start out `0600`; a guest table must stay readable by all.
#[cfg(unix)]
fn make_world_readable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn make_world_readable(_: &Path) -> io::Result<()> {
    Ok(())
}
