//! Properties of the hosts table merge.

use hostmanager::{MANAGED_MARKER, ManagedEntry, is_managed_line, reconcile};
use proptest::prelude::*;

fn foreign_line() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("# comment".to_string()),
        "[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}[ \t]+[a-z][a-z0-9.-]{0,15}",
        "[ \ta-z0-9#.:-]{0,30}",
    ]
    .prop_filter("foreign lines carry no marker", |l| !l.contains(MANAGED_MARKER))
}

fn stale_managed_line() -> impl Strategy<Value = String> {
    ("[0-9.]{0,15}", "[a-z]{1,8}", "[a-z0-9]{0,8}")
        .prop_map(|(ip, host, id)| format!("{ip}\t{host} \t{MANAGED_MARKER} {id}"))
}

/// Table text mixing foreign and managed lines, with `\n` or `\r\n` endings.
fn table() -> impl Strategy<Value = String> {
    (
        prop::collection::vec(
            prop_oneof![3 => foreign_line(), 1 => stale_managed_line()],
            0..12,
        ),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(lines, crlf, trailing)| {
            let eol = if crlf { "\r\n" } else { "\n" };
            let mut text = lines.join(eol);
            if trailing && !text.is_empty() {
                text.push_str(eol);
            }
            text
        })
}

fn entries() -> impl Strategy<Value = Vec<ManagedEntry>> {
    prop::collection::vec(
        (
            prop::option::of("10\\.[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}"),
            "[a-z][a-z0-9-]{0,10}",
            prop::collection::vec("[a-z]{1,6}", 0..3),
            "[0-9a-f]{0,12}",
        )
            .prop_map(|(address, host, aliases, id)| ManagedEntry::new(address, host, aliases, id)),
        0..6,
    )
}

fn foreign_lines(text: &str) -> Vec<&str> {
    text.split_inclusive('\n')
        .filter(|l| !is_managed_line(l))
        .map(|l| l.trim_end_matches('\n'))
        .collect()
}

proptest! {
    #[test]
    fn reconcile_is_idempotent(t in table(), e in entries()) {
        let once = reconcile(&t, &e);
        prop_assert_eq!(reconcile(&once, &e), once);
    }

    #[test]
    fn foreign_lines_survive_in_order(t in table(), e in entries()) {
        let out = reconcile(&t, &e);
        prop_assert_eq!(foreign_lines(&out), foreign_lines(&t));
    }

    #[test]
    fn managed_lines_are_exactly_the_entries(t in table(), e in entries()) {
        let out = reconcile(&t, &e);
        let managed: String = e.iter().map(ManagedEntry::render).collect();
        prop_assert!(out.ends_with(&managed));
        prop_assert_eq!(
            hostmanager::hosts_file::managed_lines(&out).concat(),
            managed
        );
    }

    #[test]
    fn reconcile_is_deterministic(t in table(), e in entries()) {
        prop_assert_eq!(reconcile(&t, &e), reconcile(&t, &e));
    }
}
