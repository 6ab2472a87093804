//! Process filters
//!
//! CLI filters are fixed at startup (until cleared from the UI). The
//! interactive filter is typed live and only matches display names.

use super::process::ProcessRecord;

/// Filters given on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    pub port: Option<u16>,
    pub user: Option<String>,
    pub command: Option<String>,
}

impl FilterSpec {
    /// Check if any filter is set
    pub fn is_active(&self) -> bool {
        self.port.is_some() || self.user.is_some() || self.command.is_some()
    }

    /// Drop every filter
    pub fn clear(&mut self) {
        *self = FilterSpec::default();
    }

    /// Check if a single record passes all filters
    pub fn matches(&self, process: &ProcessRecord) -> bool {
        if let Some(port) = self.port {
            if process.port.number() != Some(port) {
                return false;
            }
        }
        if let Some(ref user) = self.user {
            if &process.user != user {
                return false;
            }
        }
        if let Some(ref command) = self.command {
            if !contains_ignore_case(&process.raw_command, command) {
                return false;
            }
        }
        true
    }
}

/// Keep the records matching every CLI filter
pub fn apply_cli_filters(processes: &[ProcessRecord], filters: &FilterSpec) -> Vec<ProcessRecord> {
    processes
        .iter()
        .filter(|p| filters.matches(p))
        .cloned()
        .collect()
}

/// Keep the records whose display name contains `text` (case-insensitive).
/// Empty text keeps everything.
pub fn apply_interactive_filter(text: &str, processes: &[ProcessRecord]) -> Vec<ProcessRecord> {
    if text.is_empty() {
        return processes.to_vec();
    }
    processes
        .iter()
        .filter(|p| contains_ignore_case(&p.display_name, text))
        .cloned()
        .collect()
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Port;
    use proptest::prelude::*;

    fn record(pid: u32, port: u16, user: &str, command: &str) -> ProcessRecord {
        ProcessRecord::new(
            pid,
            Port::Number(port),
            Some(user.to_string()),
            Some(command.to_string()),
        )
    }

    fn sample() -> Vec<ProcessRecord> {
        vec![
            record(1234, 8000, "savannah", "python3 -m http.server 8000"),
            record(5678, 3000, "savannah", "/usr/bin/node server.js"),
            record(9012, 8000, "root", "/usr/sbin/nginx -g daemon off;"),
        ]
    }

    #[test]
    fn test_no_filters_is_identity() {
        let processes = sample();
        let filters = FilterSpec::default();
        assert!(!filters.is_active());
        assert_eq!(apply_cli_filters(&processes, &filters), processes);
    }

    #[test]
    fn test_port_filter() {
        let filters = FilterSpec {
            port: Some(8000),
            ..Default::default()
        };
        let filtered = apply_cli_filters(&sample(), &filters);
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|p| p.port == Port::Number(8000)));
    }

    #[test]
    fn test_user_filter_is_exact() {
        let filters = FilterSpec {
            user: Some("savannah".to_string()),
            ..Default::default()
        };
        assert_eq!(apply_cli_filters(&sample(), &filters).len(), 2);

        let filters = FilterSpec {
            user: Some("savann".to_string()),
            ..Default::default()
        };
        assert!(apply_cli_filters(&sample(), &filters).is_empty());
    }

    #[test]
    fn test_combined_filters() {
        let filters = FilterSpec {
            port: Some(8000),
            user: Some("savannah".to_string()),
            command: None,
        };
        let filtered = apply_cli_filters(&sample(), &filters);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].pid, 1234);
    }

    #[test]
    fn test_command_filter_ignores_case() {
        let filters = FilterSpec {
            command: Some("NGINX".to_string()),
            ..Default::default()
        };
        let filtered = apply_cli_filters(&sample(), &filters);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].pid, 9012);
    }

    #[test]
    fn test_port_filter_skips_opaque_ports() {
        let mut processes = sample();
        processes.push(ProcessRecord::new(
            77,
            Port::Opaque("8000".to_string()),
            None,
            None,
        ));
        let filters = FilterSpec {
            port: Some(8000),
            ..Default::default()
        };
        assert!(apply_cli_filters(&processes, &filters).iter().all(|p| p.pid != 77));
    }

    #[test]
    fn test_interactive_filter_matches_display_name() {
        let processes = sample();
        assert_eq!(apply_interactive_filter("", &processes), processes);

        let filtered = apply_interactive_filter("NOD", &processes);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].display_name, "node");

        // "server" appears in commands but not in display names
        assert!(apply_interactive_filter("server", &processes).is_empty());
    }

    #[test]
    fn test_clear() {
        let mut filters = FilterSpec {
            port: Some(1),
            user: Some("root".to_string()),
            command: Some("x".to_string()),
        };
        assert!(filters.is_active());
        filters.clear();
        assert!(!filters.is_active());
    }

    fn arb_record() -> impl Strategy<Value = ProcessRecord> {
        (
            1u32..500,
            prop_oneof![Just(22u16), Just(80u16), Just(8000u16), any::<u16>()],
            prop_oneof![Just("root"), Just("alice"), Just("bob")],
            prop_oneof![Just("node app.js"), Just("/usr/sbin/sshd -D"), Just("python3 -m http.server")],
        )
            .prop_map(|(pid, port, user, cmd)| record(pid, port, user, cmd))
    }

    proptest! {
        #[test]
        fn prop_cli_filters_are_idempotent(
            processes in proptest::collection::vec(arb_record(), 0..20),
            port in proptest::option::of(prop_oneof![Just(22u16), Just(80u16), Just(8000u16)]),
            user in proptest::option::of(prop_oneof![Just("root".to_string()), Just("alice".to_string())]),
        ) {
            let filters = FilterSpec { port, user, command: None };
            let once = apply_cli_filters(&processes, &filters);
            let twice = apply_cli_filters(&once, &filters);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_port_and_user_filters_commute(
            processes in proptest::collection::vec(arb_record(), 0..20),
            port in prop_oneof![Just(22u16), Just(80u16), Just(8000u16)],
            user in prop_oneof![Just("root".to_string()), Just("bob".to_string())],
        ) {
            let by_port = FilterSpec { port: Some(port), ..Default::default() };
            let by_user = FilterSpec { user: Some(user), ..Default::default() };

            let port_then_user = apply_cli_filters(&apply_cli_filters(&processes, &by_port), &by_user);
            let user_then_port = apply_cli_filters(&apply_cli_filters(&processes, &by_user), &by_port);
            prop_assert_eq!(port_then_user, user_then_port);
        }

        #[test]
        fn prop_interactive_filter_is_idempotent(
            processes in proptest::collection::vec(arb_record(), 0..20),
            text in "[a-z]{0,3}",
        ) {
            let once = apply_interactive_filter(&text, &processes);
            prop_assert_eq!(apply_interactive_filter(&text, &once), once.clone());
            prop_assert!(once.len() <= processes.len());
        }
    }
}
