//! Error types.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Result alias for hosts-table operations.
pub type Result<T> = std::result::Result<T, HostsError>;

/// Errors returned by hosts-table operations.
#[derive(Debug, Error)]
pub enum HostsError {
    /// Local filesystem I/O failed (typically `PermissionDenied` on `/etc/hosts`).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The remote transport failed to run a command or move a file.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The roster has no machine with this name for this provider.
    #[error("machine not found: {name} ({provider})")]
    MachineNotFound {
        /// Machine name that was looked up.
        name: String,
        /// Provider the lookup was scoped to.
        provider: String,
    },

    /// The privileged replace of a local file failed.
    #[error("elevated replace failed (status {status:?}): {stderr}")]
    ElevationFailed {
        /// Exit code of the helper, if it exited normally.
        status: Option<i32>,
        /// Captured standard error of the helper.
        stderr: String,
    },

    /// Invalid configuration values.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The pass was aborted before this machine was processed.
    #[error("sync cancelled")]
    Cancelled,

    /// A sync step failed for one machine.
    #[error("{machine}: {step} failed: {source}")]
    Sync {
        /// Machine being synced (`local` for the host itself).
        machine: String,
        /// Step that failed.
        step: SyncStep,
        /// Underlying failure.
        #[source]
        source: Box<HostsError>,
    },
}

impl HostsError {
    /// Wraps `self` with the machine and step it failed in.
    #[must_use]
    pub fn during(self, machine: impl Into<String>, step: SyncStep) -> Self {
        Self::Sync {
            machine: machine.into(),
            step,
            source: Box::new(self),
        }
    }

    /// Returns `true` if the underlying I/O error is `PermissionDenied`.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::Io(e) => e.kind() == std::io::ErrorKind::PermissionDenied,
            Self::Transport(TransportError::Io(e)) => {
                e.kind() == std::io::ErrorKind::PermissionDenied
            }
            Self::Sync { source, .. } => source.is_permission_denied(),
            _ => false,
        }
    }

    /// Returns `true` for [`HostsError::MachineNotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::MachineNotFound { .. })
    }

    /// Machine name attached by [`during`](Self::during), if any.
    #[must_use]
    pub fn machine(&self) -> Option<&str> {
        match self {
            Self::Sync { machine, .. } => Some(machine),
            _ => None,
        }
    }
}

/// Failures reported by a [`Transport`](crate::machine::Transport).
#[derive(Debug, Error)]
pub enum TransportError {
    /// The operation did not finish within the transport's deadline.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Socket or file I/O failed underneath the transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other transport-level failure.
    #[error("{0}")]
    Failed(String),
}

/// The step of a sync flow that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStep {
    /// Copying the live local table into the scratch dir.
    CopyToScratch,
    /// Downloading the guest table.
    Download,
    /// Reconciling and rewriting the scratch copy.
    Rewrite,
    /// Uploading the scratch copy to the guest.
    Upload,
    /// Moving the uploaded file over the guest table.
    ElevatedMove,
    /// Replacing the local table with elevated privileges.
    ElevatedReplace,
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CopyToScratch => "copy to scratch",
            Self::Download => "download",
            Self::Rewrite => "rewrite",
            Self::Upload => "upload",
            Self::ElevatedMove => "elevated move",
            Self::ElevatedReplace => "elevated replace",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_denied_seen_through_sync_wrapper() {
        let err = HostsError::from(std::io::Error::from(std::io::ErrorKind::PermissionDenied))
            .during("web", SyncStep::ElevatedReplace);
        assert!(err.is_permission_denied());
        assert_eq!(err.machine(), Some("web"));
    }

    #[test]
    fn sync_error_names_machine_and_step() {
        let err = HostsError::from(TransportError::Failed("no route".into()))
            .during("db", SyncStep::Download);
        assert_eq!(
            err.to_string(),
            "db: download failed: transport error: no route"
        );
    }

    #[test]
    fn not_found_predicate() {
        let err = HostsError::MachineNotFound {
            name: "gone".into(),
            provider: "virtualbox".into(),
        };
        assert!(err.is_not_found());
        assert!(!err.is_permission_denied());
    }
}
