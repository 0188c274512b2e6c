//! Address discovery for a single machine.

use crate::config::{MachineConfig, check_host_token};
use crate::machine::{MachineRef, OutputStream, Transport};
use std::ops::ControlFlow;

/// Picks the address advertised for a machine.
///
/// Sources are tried in order:
///
/// 1. the first static private-network IP, unless `ignore_private_ip` is set;
/// 2. the configured interface's address, read by running the discovery
///    command on the machine (only when `ignore_private_ip` is set and live
///    queries are enabled);
/// 3. the host the transport last reached the machine on.
///
/// For the interface query, the address is the first stdout line that is not
/// blank; leading blank lines are skipped, and output made only of blank
/// lines counts as empty. Stderr is logged but never taken as an address.
///
/// Resolution never fails the pass; an unresolvable machine yields `None`.
pub struct Resolver<'a> {
    transport: &'a dyn Transport,
    live_query: bool,
}

impl<'a> Resolver<'a> {
    /// Creates a resolver with live interface queries enabled.
    #[must_use]
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self {
            transport,
            live_query: true,
        }
    }

    /// Enables or disables running discovery commands on machines.
    #[must_use]
    pub const fn with_live_query(mut self, enabled: bool) -> Self {
        self.live_query = enabled;
        self
    }

    /// Resolves the address for `machine`.
    ///
    /// An address that is not a single token (embedded whitespace or line
    /// breaks) is discarded and the machine counts as unresolved.
    #[must_use]
    pub fn resolve(&self, machine: &MachineRef, config: &MachineConfig) -> Option<String> {
        let address = self.lookup(machine, config)?;
        match check_host_token("address", &address) {
            Ok(()) => Some(address),
            Err(e) => {
                tracing::warn!(machine = %machine.name, error = %e, "Discarding resolved address");
                None
            }
        }
    }

    fn lookup(&self, machine: &MachineRef, config: &MachineConfig) -> Option<String> {
        if config.ignore_private_ip {
            if self.live_query {
                if let Some(ip) = self.query_interface(machine, config) {
                    return Some(ip);
                }
            }
        } else if let Some(ip) = first_private_ip(config) {
            return Some(ip.to_string());
        }

        self.transport.connection_host(machine)
    }

    fn query_interface(&self, machine: &MachineRef, config: &MachineConfig) -> Option<String> {
        let command = match config.interface_command() {
            Ok(Some(command)) => command,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(machine = %machine.name, error = %e, "Skipping interface lookup");
                return None;
            }
        };

        tracing::debug!(machine = %machine.name, command = %command, "Querying interface address");

        let mut first_line = None;
        let status = self.transport.run(machine, &command, &mut |stream, line| {
            tracing::debug!(machine = %machine.name, ?stream, "{line}");
            if stream == OutputStream::Stdout {
                let line = line.trim();
                if !line.is_empty() {
                    first_line = Some(line.to_string());
                    return ControlFlow::Break(());
                }
            }
            ControlFlow::Continue(())
        });

        match status {
            Ok(0) => first_line,
            Ok(code) => {
                tracing::warn!(machine = %machine.name, status = code, "Interface lookup exited non-zero");
                None
            }
            Err(e) => {
                tracing::warn!(machine = %machine.name, error = %e, "Interface lookup failed");
                None
            }
        }
    }
}

fn first_private_ip(config: &MachineConfig) -> Option<&str> {
    config.networks.iter().find_map(|n| n.private_ip())
}
