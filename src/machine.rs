//! Machines and the collaborators that enumerate and reach them.
//!
//! The orchestration layer implements [`Roster`]; the remote shell layer
//! implements [`Transport`]. Both are consumed through trait objects so a
//! pass can be driven by Vagrant, a test double, or anything in between.

use crate::config::{MachineConfig, check_host_token};
use crate::error::{HostsError, Result, TransportError};
use std::fmt;
use std::ops::ControlFlow;
use std::path::Path;

/// Identifies a machine within the roster.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MachineRef {
    /// Unique, stable, non-empty name.
    pub name: String,
    /// Provider the machine runs on (e.g. `virtualbox`).
    pub provider: String,
}

impl MachineRef {
    #[must_use]
    pub fn new(name: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            provider: provider.into(),
        }
    }

    /// Returns `true` if the machine belongs to `provider`.
    #[must_use]
    pub fn is_on(&self, provider: &str) -> bool {
        self.provider == provider
    }
}

impl fmt::Display for MachineRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.provider)
    }
}

/// What the roster knows about one machine.
#[derive(Debug, Clone)]
pub struct MachineInfo {
    /// Provider-assigned id; `None` if the machine was never created.
    pub id: Option<String>,
    pub config: MachineConfig,
}

impl MachineInfo {
    #[must_use]
    pub fn new(id: Option<String>, config: MachineConfig) -> Self {
        Self { id, config }
    }

    /// Checks that everything rendered into the machine's hosts line stays
    /// on one line. `name` is the hostname fallback.
    ///
    /// # Errors
    ///
    /// Returns [`HostsError::InvalidConfig`] for a hostname, alias, or
    /// fallback name that is not a single token, or an id with control
    /// characters.
    pub fn validate(&self, name: &str) -> Result<()> {
        self.config.validate_names()?;
        if self.config.hostname.is_none() {
            check_host_token("machine name", name)?;
        }
        if let Some(id) = &self.id {
            if id.chars().any(char::is_control) {
                return Err(HostsError::InvalidConfig(format!(
                    "machine id contains control characters: {id:?}"
                )));
            }
        }
        Ok(())
    }
}

/// The orchestration layer's view of the cluster.
///
/// Implementations should return machines in a stable order (declaration
/// order, for instance) so the generated table diffs cleanly between runs.
pub trait Roster {
    /// Running machines, across all providers.
    fn active_machines(&self) -> Vec<MachineRef>;

    /// Every declared machine name, running or not.
    fn machine_names(&self) -> Vec<String>;

    /// Loads a machine.
    ///
    /// # Errors
    ///
    /// Returns [`HostsError::MachineNotFound`](crate::HostsError::MachineNotFound)
    /// if the machine does not exist for `provider`.
    fn lookup(&self, name: &str, provider: &str) -> Result<MachineInfo>;
}

/// Stream a command output line arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Runs commands on machines and moves files to and from them.
///
/// Every method is expected to be bounded by the implementation's own
/// timeout and to report it as [`TransportError::Timeout`].
pub trait Transport {
    /// Returns `true` if the machine has a live communication channel.
    fn ready(&self, machine: &MachineRef) -> bool;

    /// Host or IP the transport last reached the machine on.
    fn connection_host(&self, machine: &MachineRef) -> Option<String>;

    /// Runs `command` with elevated privileges on the machine.
    ///
    /// Output lines (without terminators) are passed to `on_output` as they
    /// arrive. Once it returns [`ControlFlow::Break`], no further lines are
    /// delivered. The exit status is returned when the command finishes.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the command could not be run or did
    /// not finish in time.
    fn run(
        &self,
        machine: &MachineRef,
        command: &str,
        on_output: &mut dyn FnMut(OutputStream, &str) -> ControlFlow<()>,
    ) -> std::result::Result<i32, TransportError>;

    /// Copies `remote` on the machine to the local path `local`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the transfer fails.
    fn download(
        &self,
        machine: &MachineRef,
        remote: &str,
        local: &Path,
    ) -> std::result::Result<(), TransportError>;

    /// Copies the local file `local` to `remote` on the machine.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the transfer fails.
    fn upload(
        &self,
        machine: &MachineRef,
        local: &Path,
        remote: &str,
    ) -> std::result::Result<(), TransportError>;

    /// Renames `from` over `to` on the machine with elevated privileges.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the move fails.
    fn elevated_move(
        &self,
        machine: &MachineRef,
        from: &str,
        to: &str,
    ) -> std::result::Result<(), TransportError>;
}
