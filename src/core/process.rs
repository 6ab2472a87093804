//! Process representation
//!
//! This module contains the ProcessRecord struct which represents a single
//! process bound to a listening port, plus the helpers that normalize the
//! raw values reported by the operating system.

use std::cmp::Ordering;
use std::fmt;

/// Placeholder shown when a field could not be read
pub const N_A: &str = "N/A";

/// Helper process suffixes stripped from display names
const HELPER_SUFFIXES: [&str; 3] = [" (Plugin)", " (Renderer)", " (GPU)"];

/// Local port of a listening socket
///
/// Most sockets report a plain number, but some descriptors only give an
/// opaque string (wildcard addresses and the like). Those are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Port {
    Number(u16),
    Opaque(String),
}

impl Port {
    /// Numeric value, if any
    pub fn number(&self) -> Option<u16> {
        match self {
            Port::Number(n) => Some(*n),
            Port::Opaque(_) => None,
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Port::Number(n) => write!(f, "{}", n),
            Port::Opaque(s) => f.write_str(s),
        }
    }
}

impl Ord for Port {
    /// Numeric ports first (ascending), then opaque ports in string order
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Port::Number(a), Port::Number(b)) => a.cmp(b),
            (Port::Number(_), Port::Opaque(_)) => Ordering::Less,
            (Port::Opaque(_), Port::Number(_)) => Ordering::Greater,
            (Port::Opaque(a), Port::Opaque(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Port {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Parse a port string.
///
/// A string made only of decimal digits that fits a port number becomes
/// `Port::Number`; anything else (including the empty string) is preserved.
pub fn parse_port(s: &str) -> Port {
    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(n) = s.parse::<u16>() {
            return Port::Number(n);
        }
    }
    Port::Opaque(s.to_string())
}

/// Snapshot of one process listening on one port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecord {
    pub pid: u32,
    pub port: Port,
    pub user: String,
    pub raw_command: String,
    pub display_name: String,
}

impl ProcessRecord {
    /// Build a record, deriving the display name from the command.
    ///
    /// Missing user or command degrade to `N/A`.
    pub fn new(pid: u32, port: Port, user: Option<String>, command: Option<String>) -> Self {
        let user = user
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| N_A.to_string());
        let raw_command = command
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| N_A.to_string());
        let display_name = display_name(&raw_command);

        ProcessRecord {
            pid,
            port,
            user,
            raw_command,
            display_name,
        }
    }
}

/// Derive a short, recognizable name from a full command line.
///
/// - empty or `N/A` is returned unchanged
/// - macOS bundles resolve to the outermost `.app` name
/// - Windows paths resolve to the `.exe` file stem
/// - otherwise the basename of the first token, minus helper suffixes
pub fn display_name(command: &str) -> String {
    if command.is_empty() || command == N_A {
        return command.to_string();
    }

    if let Some(name) = bundle_name(command) {
        return name.to_string();
    }

    if let Some(name) = exe_name(command) {
        return name.to_string();
    }

    let Some(executable) = command.split_whitespace().next() else {
        return command.to_string();
    };
    let mut basename = executable.rsplit('/').next().unwrap_or(executable).to_string();
    for suffix in HELPER_SUFFIXES {
        basename = basename.replace(suffix, "");
    }
    basename
}

/// Name of the first `.app` bundle in the command, if any
fn bundle_name(command: &str) -> Option<&str> {
    let end = command.find(".app/")?;
    let path = &command[..end];
    let start = path.rfind('/')?;
    Some(&path[start + 1..])
}

/// Stem of the first `.exe` path component, if any
fn exe_name(command: &str) -> Option<&str> {
    let end = command.find(".exe")?;
    let path = &command[..end];
    let start = path.rfind(['\\', '/'])?;
    Some(&path[start + 1..])
}
