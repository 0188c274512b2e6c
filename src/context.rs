//! Everything a reconciliation pass needs, passed explicitly.

use crate::config::HostManagerConfig;
use crate::error::{HostsError, Result};
use crate::machine::{Roster, Transport};
use std::sync::atomic::{AtomicBool, Ordering};

/// Collaborators and settings for one reconciliation pass.
///
/// # Example
///
/// ```rust,ignore
/// use hostmanager::{HostManagerConfig, ReconcileContext};
///
/// let config = HostManagerConfig::new();
/// let ctx = ReconcileContext::new(&roster, &transport, &config, "virtualbox");
/// ```
#[derive(Clone, Copy)]
pub struct ReconcileContext<'a> {
    pub roster: &'a dyn Roster,
    pub transport: &'a dyn Transport,
    pub config: &'a HostManagerConfig,
    /// Only machines on this provider get entries.
    pub provider: &'a str,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> ReconcileContext<'a> {
    #[must_use]
    pub fn new(
        roster: &'a dyn Roster,
        transport: &'a dyn Transport,
        config: &'a HostManagerConfig,
        provider: &'a str,
    ) -> Self {
        Self {
            roster,
            transport,
            config,
            provider,
            cancel: None,
        }
    }

    /// Aborts remaining work once `flag` is set (e.g. from a Ctrl-C handler).
    #[must_use]
    pub const fn with_cancel(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Returns `true` once the pass has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Fails with [`HostsError::Cancelled`] once the pass has been cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`HostsError::Cancelled`] if the cancel flag is set.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(HostsError::Cancelled)
        } else {
            Ok(())
        }
    }
}
