//! Building managed entries from the roster.

use crate::config::MissingAddress;
use crate::context::ReconcileContext;
use crate::hosts_file::ManagedEntry;
use crate::machine::{MachineInfo, MachineRef, Roster};
use crate::resolver::Resolver;

/// Machines on `provider` that should appear in the table, in roster order.
///
/// With `include_offline`, every declared machine is considered and names
/// that no longer exist for `provider` are skipped. Otherwise only running
/// machines are used. Lookup failures never abort enumeration.
#[must_use]
pub fn enumerate_machines(
    roster: &dyn Roster,
    provider: &str,
    include_offline: bool,
) -> Vec<(MachineRef, MachineInfo)> {
    let candidates: Vec<MachineRef> = if include_offline {
        roster
            .machine_names()
            .into_iter()
            .map(|name| MachineRef::new(name, provider))
            .collect()
    } else {
        roster
            .active_machines()
            .into_iter()
            .filter(|m| m.is_on(provider))
            .collect()
    };

    candidates
        .into_iter()
        .filter_map(|machine| match roster.lookup(&machine.name, provider) {
            Ok(info) => Some((machine, info)),
            Err(e) if e.is_not_found() => {
                tracing::debug!(machine = %machine.name, provider, "Machine not found, skipping");
                None
            }
            Err(e) => {
                tracing::warn!(machine = %machine.name, error = %e, "Machine lookup failed, skipping");
                None
            }
        })
        .collect()
}

/// Builds one entry per machine, in order.
///
/// Machines whose hostname, aliases, or id would not fit on a single hosts
/// line are left out with a warning. Hostnames are not deduplicated.
/// Machines without an address are kept with an empty address or dropped,
/// according to `missing_address`.
#[must_use]
pub fn build_entries(
    machines: &[(MachineRef, MachineInfo)],
    resolver: &Resolver<'_>,
    missing_address: MissingAddress,
) -> Vec<ManagedEntry> {
    let mut entries = Vec::with_capacity(machines.len());
    for (machine, info) in machines {
        if let Err(e) = info.validate(&machine.name) {
            tracing::warn!(machine = %machine.name, error = %e, "Invalid hosts fields, leaving machine out");
            continue;
        }
        let address = resolver.resolve(machine, &info.config);
        if address.is_none() {
            if missing_address == MissingAddress::Skip {
                tracing::warn!(machine = %machine.name, "No address resolved, leaving machine out");
                continue;
            }
            tracing::warn!(machine = %machine.name, "No address resolved, emitting empty address");
        }

        entries.push(ManagedEntry::new(
            address,
            info.config.hostname_or(&machine.name),
            info.config.aliases.clone(),
            info.id.clone().unwrap_or_default(),
        ));
    }
    entries
}

/// Enumerates the context's roster and builds its entries.
#[must_use]
pub fn collect_entries(ctx: &ReconcileContext<'_>) -> Vec<ManagedEntry> {
    let machines = enumerate_machines(ctx.roster, ctx.provider, ctx.config.include_offline);
    build_entries(
        &machines,
        &Resolver::new(ctx.transport),
        ctx.config.missing_address,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MachineConfig, NetworkBinding};
    use crate::error::{HostsError, Result, TransportError};
    use crate::machine::{OutputStream, Transport};
    use std::ops::ControlFlow;
    use std::path::Path;

    struct StaticRoster {
        /// (name, provider, running, config, id)
        machines: Vec<(&'static str, &'static str, bool, MachineConfig, Option<&'static str>)>,
    }

    impl Roster for StaticRoster {
        fn active_machines(&self) -> Vec<MachineRef> {
            self.machines
                .iter()
                .filter(|m| m.2)
                .map(|m| MachineRef::new(m.0, m.1))
                .collect()
        }

        fn machine_names(&self) -> Vec<String> {
            self.machines.iter().map(|m| m.0.to_string()).collect()
        }

        fn lookup(&self, name: &str, provider: &str) -> Result<MachineInfo> {
            self.machines
                .iter()
                .find(|m| m.0 == name && m.1 == provider)
                .map(|m| MachineInfo::new(m.4.map(str::to_string), m.3.clone()))
                .ok_or_else(|| HostsError::MachineNotFound {
                    name: name.to_string(),
                    provider: provider.to_string(),
                })
        }
    }

    struct NoTransport;

    impl Transport for NoTransport {
        fn ready(&self, _: &MachineRef) -> bool {
            false
        }

        fn connection_host(&self, _: &MachineRef) -> Option<String> {
            None
        }

        fn run(
            &self,
            _: &MachineRef,
            _: &str,
            _: &mut dyn FnMut(OutputStream, &str) -> ControlFlow<()>,
        ) -> std::result::Result<i32, TransportError> {
            Err(TransportError::Failed("unreachable".into()))
        }

        fn download(&self, _: &MachineRef, _: &str, _: &Path) -> std::result::Result<(), TransportError> {
            unreachable!()
        }

        fn upload(&self, _: &MachineRef, _: &Path, _: &str) -> std::result::Result<(), TransportError> {
            unreachable!()
        }

        fn elevated_move(&self, _: &MachineRef, _: &str, _: &str) -> std::result::Result<(), TransportError> {
            unreachable!()
        }
    }

    fn private(ip: &str) -> MachineConfig {
        MachineConfig::new().with_network(NetworkBinding::private(ip))
    }

    fn roster() -> StaticRoster {
        StaticRoster {
            machines: vec![
                ("web", "virtualbox", true, private("10.0.0.1").with_aliases(["www"]), Some("id-web")),
                ("db", "virtualbox", false, private("10.0.0.2").with_hostname("db.local"), None),
                ("cache", "docker", true, private("10.0.0.3"), Some("id-cache")),
            ],
        }
    }

    #[test]
    fn active_only_filters_provider_and_offline() {
        let machines = enumerate_machines(&roster(), "virtualbox", false);
        let names: Vec<_> = machines.iter().map(|(m, _)| m.name.as_str()).collect();
        assert_eq!(names, vec!["web"]);
    }

    #[test]
    fn include_offline_skips_missing_machines() {
        let machines = enumerate_machines(&roster(), "virtualbox", true);
        let names: Vec<_> = machines.iter().map(|(m, _)| m.name.as_str()).collect();
        // `cache` only exists on docker and is skipped.
        assert_eq!(names, vec!["web", "db"]);
    }

    #[test]
    fn entries_follow_roster_order_and_fallbacks() {
        let machines = enumerate_machines(&roster(), "virtualbox", true);
        let entries = build_entries(&machines, &Resolver::new(&NoTransport), MissingAddress::EmitEmpty);

        assert_eq!(
            entries,
            vec![
                ManagedEntry::new(Some("10.0.0.1".into()), "web", vec!["www".into()], "id-web"),
                ManagedEntry::new(Some("10.0.0.2".into()), "db.local", Vec::new(), ""),
            ]
        );
    }

    #[test]
    fn multi_line_names_are_left_out() {
        let roster = StaticRoster {
            machines: vec![
                ("evil", "virtualbox", true, private("10.0.0.6").with_hostname("web\nevil"), Some("1")),
                ("alias", "virtualbox", true, private("10.0.0.7").with_aliases(["a b"]), Some("2")),
                ("id", "virtualbox", true, private("10.0.0.8"), Some("3\n10.0.0.9 x")),
                ("web", "virtualbox", true, private("10.0.0.1"), Some("4")),
            ],
        };
        let machines = enumerate_machines(&roster, "virtualbox", false);
        let entries = build_entries(&machines, &Resolver::new(&NoTransport), MissingAddress::EmitEmpty);

        assert_eq!(
            entries,
            vec![ManagedEntry::new(Some("10.0.0.1".into()), "web", Vec::new(), "4")]
        );
        let once = crate::hosts_file::reconcile("127.0.0.1 localhost\n", &entries);
        assert_eq!(crate::hosts_file::reconcile(&once, &entries), once);
    }

    #[test]
    fn missing_address_policy() {
        let roster = StaticRoster {
            machines: vec![("dhcp", "virtualbox", true, MachineConfig::new(), Some("1"))],
        };
        let machines = enumerate_machines(&roster, "virtualbox", false);
        let resolver = Resolver::new(&NoTransport);

        let kept = build_entries(&machines, &resolver, MissingAddress::EmitEmpty);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].address, None);

        assert!(build_entries(&machines, &resolver, MissingAddress::Skip).is_empty());
    }
}
