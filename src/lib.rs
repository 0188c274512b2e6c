//! # hostmanager
//!
//! Keep `/etc/hosts` in sync across the machines of a development cluster.
//!
//! Every machine gets one line per cluster member, tagged with a
//! `# VAGRANT ID: <id>` marker so it can be regenerated on the next pass.
//! Lines without the marker (entries added by hand or by other tools) are
//! never reordered or modified.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use hostmanager::{HostManagerConfig, HostsSync, ReconcileContext, SudoReplace};
//!
//! let config = HostManagerConfig::new().with_include_offline(true);
//! let ctx = ReconcileContext::new(&roster, &transport, &config, "virtualbox");
//! let sync = HostsSync::new(ctx, &SudoReplace::new())?;
//!
//! // Host machine (uses sudo unless already root).
//! sync.sync_local()?;
//!
//! // Every guest; failures are reported per machine.
//! for (machine, result) in sync.sync_guests() {
//!     println!("{machine}: {result:?}");
//! }
//! ```
//!
//! ## Collaborators
//!
//! The crate does not talk to a hypervisor or open SSH sessions itself. The
//! caller provides:
//!
//! - a [`Roster`] listing machines and their configuration,
//! - a [`Transport`] that runs commands and moves files on guests,
//! - an [`Elevator`] that replaces the local table ([`SudoReplace`] by default).
//!
//! ## Address selection
//!
//! See [`Resolver`]: a static private-network IP wins, then (when
//! `ignore_private_ip` is set) the address read from the configured
//! interface, then the transport's connection host.
//!
//! ## Pure merge
//!
//! [`reconcile`] is a pure function and can be used on its own:
//!
//! ```
//! use hostmanager::{ManagedEntry, reconcile};
//!
//! let table = "127.0.0.1 localhost\n10.0.0.5 old # VAGRANT ID: abc\n";
//! let entry = ManagedEntry::new(Some("10.0.0.9".into()), "web", vec!["www".into()], "xyz");
//!
//! assert_eq!(
//!     reconcile(table, &[entry]),
//!     "127.0.0.1 localhost\n10.0.0.9\tweb www\t# VAGRANT ID: xyz\n",
//! );
//! ```

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod context;
pub mod elevate;
pub mod entries;
pub mod error;
pub mod hosts_file;
pub mod machine;
pub mod resolver;
pub mod sync;

pub use config::{HostManagerConfig, MachineConfig, MissingAddress, NetworkBinding, NetworkKind};
pub use context::ReconcileContext;
pub use elevate::{Elevator, SudoReplace};
pub use entries::{build_entries, collect_entries, enumerate_machines};
pub use error::{HostsError, Result, SyncStep, TransportError};
pub use hosts_file::{MANAGED_MARKER, ManagedEntry, is_managed_line, reconcile, update_file};
pub use machine::{MachineInfo, MachineRef, OutputStream, Roster, Transport};
pub use resolver::Resolver;
pub use sync::{HostsSync, RemoteSync};
