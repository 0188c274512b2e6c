//! Global and per-machine configuration.

use crate::error::{HostsError, Result};
use std::path::PathBuf;

/// Default command used to read an interface's address on a guest.
///
/// `%s` is replaced with the interface name.
pub const DEFAULT_INTERFACE_IP_COMMAND: &str =
    "ip addr list %s | grep 'inet ' | cut -d' ' -f6 | cut -d/ -f1";

/// Placeholder substituted with the interface name.
const INTERFACE_PLACEHOLDER: &str = "%s";

/// What to do with a machine whose address could not be resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingAddress {
    /// Emit the entry with an empty address field.
    #[default]
    EmitEmpty,
    /// Leave the machine out of the table.
    Skip,
}

/// Settings shared by every machine in a pass.
///
/// # Example
///
/// ```
/// use hostmanager::{HostManagerConfig, MissingAddress};
///
/// let config = HostManagerConfig::new()
///     .with_include_offline(true)
///     .with_missing_address(MissingAddress::Skip);
///
/// assert!(config.include_offline);
/// assert_eq!(config.hosts_path.to_str(), Some("/etc/hosts"));
/// ```
#[derive(Debug, Clone)]
pub struct HostManagerConfig {
    /// Include stopped and not-yet-created machines in the table.
    pub include_offline: bool,

    /// Policy for entries without an address.
    pub missing_address: MissingAddress,

    /// Hosts table on the local machine.
    pub hosts_path: PathBuf,

    /// Hosts table on each guest.
    pub guest_hosts_path: String,

    /// Where the rewritten table is staged on the guest before the move.
    pub guest_upload_path: String,

    /// Local directory for scratch copies.
    pub scratch_dir: PathBuf,
}

impl HostManagerConfig {
    /// Creates a config with the standard `/etc/hosts` locations.
    #[must_use]
    pub fn new() -> Self {
        Self {
            include_offline: false,
            missing_address: MissingAddress::default(),
            hosts_path: PathBuf::from("/etc/hosts"),
            guest_hosts_path: "/etc/hosts".to_string(),
            guest_upload_path: "/tmp/hosts".to_string(),
            scratch_dir: std::env::temp_dir(),
        }
    }

    /// Sets whether offline machines get entries.
    #[must_use]
    pub const fn with_include_offline(mut self, include: bool) -> Self {
        self.include_offline = include;
        self
    }

    /// Sets the missing-address policy.
    #[must_use]
    pub const fn with_missing_address(mut self, policy: MissingAddress) -> Self {
        self.missing_address = policy;
        self
    }

    /// Overrides the local hosts table path.
    #[must_use]
    pub fn with_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.hosts_path = path.into();
        self
    }

    /// Overrides the guest hosts table and upload paths.
    #[must_use]
    pub fn with_guest_paths(
        mut self,
        hosts_path: impl Into<String>,
        upload_path: impl Into<String>,
    ) -> Self {
        self.guest_hosts_path = hosts_path.into();
        self.guest_upload_path = upload_path.into();
        self
    }

    /// Overrides the scratch directory.
    #[must_use]
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    /// Checks that the guest paths are usable.
    ///
    /// # Errors
    ///
    /// Returns [`HostsError::InvalidConfig`] if a guest path is empty or the
    /// upload path equals the live table path.
    pub fn validate(&self) -> Result<()> {
        if self.guest_hosts_path.is_empty() || self.guest_upload_path.is_empty() {
            return Err(HostsError::InvalidConfig(
                "guest hosts and upload paths must not be empty".into(),
            ));
        }
        if self.guest_hosts_path == self.guest_upload_path {
            return Err(HostsError::InvalidConfig(format!(
                "guest upload path must differ from {}",
                self.guest_hosts_path
            )));
        }
        Ok(())
    }
}

impl Default for HostManagerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Kind of a declared network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkKind {
    /// Host-only network with a fixed or DHCP address.
    PrivateNetwork,
    /// Bridged network.
    PublicNetwork,
    /// Port forward from host to guest.
    ForwardedPort,
}

/// One declared network of a machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkBinding {
    pub kind: NetworkKind,
    /// Static address, if one was declared.
    pub ip: Option<String>,
}

impl NetworkBinding {
    /// Private network with a static address.
    #[must_use]
    pub fn private(ip: impl Into<String>) -> Self {
        Self {
            kind: NetworkKind::PrivateNetwork,
            ip: Some(ip.into()),
        }
    }

    /// Private network without a static address (DHCP).
    #[must_use]
    pub const fn private_dhcp() -> Self {
        Self {
            kind: NetworkKind::PrivateNetwork,
            ip: None,
        }
    }

    /// Any other network kind.
    #[must_use]
    pub const fn other(kind: NetworkKind, ip: Option<String>) -> Self {
        Self { kind, ip }
    }

    /// Static address of a private network, if any.
    #[must_use]
    pub fn private_ip(&self) -> Option<&str> {
        match self.kind {
            NetworkKind::PrivateNetwork => self.ip.as_deref(),
            _ => None,
        }
    }
}

/// Per-machine attributes used to build its hosts entry.
///
/// # Example
///
/// ```
/// use hostmanager::{MachineConfig, NetworkBinding};
///
/// let config = MachineConfig::new()
///     .with_hostname("web.local")
///     .with_aliases(["www", "web"])
///     .with_network(NetworkBinding::private("192.168.50.10"));
///
/// assert_eq!(config.hostname_or("web"), "web.local");
/// assert_eq!(config.aliases, vec!["www", "web"]);
/// ```
#[derive(Debug, Clone)]
pub struct MachineConfig {
    /// Declared hostname; the machine name is used when absent.
    pub hostname: Option<String>,

    /// Extra names for the machine, in order.
    pub aliases: Vec<String>,

    /// Skip static private-network addresses and query the interface instead.
    pub ignore_private_ip: bool,

    /// Interface whose address is advertised when `ignore_private_ip` is set.
    pub interface: Option<String>,

    /// Discovery command template; `%s` is the interface name.
    pub interface_ip_command: String,

    /// Declared networks, in order.
    pub networks: Vec<NetworkBinding>,
}

impl MachineConfig {
    /// Creates a config with no hostname, aliases, or networks.
    #[must_use]
    pub fn new() -> Self {
        Self {
            hostname: None,
            aliases: Vec::new(),
            ignore_private_ip: false,
            interface: None,
            interface_ip_command: DEFAULT_INTERFACE_IP_COMMAND.to_string(),
            networks: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    #[must_use]
    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_network(mut self, network: NetworkBinding) -> Self {
        self.networks.push(network);
        self
    }

    /// Ignores private-network addresses and advertises `interface` instead.
    #[must_use]
    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.ignore_private_ip = true;
        self.interface = Some(interface.into());
        self
    }

    #[must_use]
    pub const fn with_ignore_private_ip(mut self, ignore: bool) -> Self {
        self.ignore_private_ip = ignore;
        self
    }

    #[must_use]
    pub fn with_interface_ip_command(mut self, template: impl Into<String>) -> Self {
        self.interface_ip_command = template.into();
        self
    }

    /// Declared hostname, or `fallback` when none is set.
    #[must_use]
    pub fn hostname_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.hostname.as_deref().unwrap_or(fallback)
    }

    /// Discovery command for the configured interface.
    ///
    /// Returns `Ok(None)` when no interface is set.
    ///
    /// # Errors
    ///
    /// Returns [`HostsError::InvalidConfig`] if the template has no `%s`.
    pub fn interface_command(&self) -> Result<Option<String>> {
        let Some(interface) = self.interface.as_deref() else {
            return Ok(None);
        };
        if !self.interface_ip_command.contains(INTERFACE_PLACEHOLDER) {
            return Err(HostsError::InvalidConfig(format!(
                "interface ip command has no {INTERFACE_PLACEHOLDER} placeholder: {}",
                self.interface_ip_command
            )));
        }
        Ok(Some(self.interface_ip_command.replacen(
            INTERFACE_PLACEHOLDER,
            interface,
            1,
        )))
    }

    /// Checks the hostname, aliases, and discovery template.
    ///
    /// # Errors
    ///
    /// Returns [`HostsError::InvalidConfig`] if a name is not a single
    /// hosts-file token, or if an interface is set but the template has no
    /// `%s` placeholder.
    pub fn validate(&self) -> Result<()> {
        self.validate_names()?;
        self.interface_command().map(|_| ())
    }

    /// Checks that the hostname and aliases can be written as hosts fields.
    ///
    /// # Errors
    ///
    /// Returns [`HostsError::InvalidConfig`] naming the first bad value.
    pub fn validate_names(&self) -> Result<()> {
        if let Some(hostname) = &self.hostname {
            check_host_token("hostname", hostname)?;
        }
        self.aliases
            .iter()
            .try_for_each(|alias| check_host_token("alias", alias))
    }
}

/// Rejects values that would split or merge hosts-file fields.
///
/// # Errors
///
/// Returns [`HostsError::InvalidConfig`] if `value` is empty or contains
/// whitespace or control characters.
pub fn check_host_token(kind: &str, value: &str) -> Result<()> {
    if value.is_empty() || value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(HostsError::InvalidConfig(format!(
            "{kind} must be a single non-empty token: {value:?}"
        )));
    }
    Ok(())
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_sets_defaults() {
        let c = HostManagerConfig::new();
        assert!(!c.include_offline);
        assert_eq!(c.missing_address, MissingAddress::EmitEmpty);
        assert_eq!(c.guest_hosts_path, "/etc/hosts");
        assert_eq!(c.guest_upload_path, "/tmp/hosts");
        assert!(c.validate().is_ok());
    }

    #[test]
    fn validate_rejects_upload_over_live_path() {
        let c = HostManagerConfig::new().with_guest_paths("/etc/hosts", "/etc/hosts");
        assert!(matches!(c.validate(), Err(HostsError::InvalidConfig(_))));

        let c = HostManagerConfig::new().with_guest_paths("/etc/hosts", "");
        assert!(c.validate().is_err());
    }

    #[test]
    fn hostname_falls_back_to_name() {
        let c = MachineConfig::new();
        assert_eq!(c.hostname_or("db"), "db");
    }

    #[test]
    fn interface_command_substitutes_name() {
        let c = MachineConfig::new().with_interface("eth1");
        assert_eq!(
            c.interface_command().unwrap().as_deref(),
            Some("ip addr list eth1 | grep 'inet ' | cut -d' ' -f6 | cut -d/ -f1")
        );
        assert!(c.ignore_private_ip);
    }

    #[test]
    fn interface_command_without_interface_is_none() {
        assert!(MachineConfig::new().interface_command().unwrap().is_none());
    }

    #[test]
    fn interface_command_requires_placeholder() {
        let c = MachineConfig::new()
            .with_interface("eth1")
            .with_interface_ip_command("hostname -I");
        assert!(c.validate().is_err());
    }

    #[test]
    fn names_must_be_single_tokens() {
        assert!(MachineConfig::new().with_hostname("web\nevil").validate().is_err());
        assert!(MachineConfig::new().with_hostname("web evil").validate().is_err());
        assert!(MachineConfig::new().with_aliases(["ok", "bad\talias"]).validate().is_err());
        assert!(MachineConfig::new().with_aliases([""]).validate_names().is_err());
        assert!(
            MachineConfig::new()
                .with_hostname("web.local")
                .with_aliases(["www", "web-1"])
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn private_ip_only_for_private_networks() {
        assert_eq!(
            NetworkBinding::private("10.0.0.2").private_ip(),
            Some("10.0.0.2")
        );
        assert_eq!(NetworkBinding::private_dhcp().private_ip(), None);
        let public = NetworkBinding::other(NetworkKind::PublicNetwork, Some("1.2.3.4".into()));
        assert_eq!(public.private_ip(), None);
    }
}
