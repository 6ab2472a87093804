//! Linux platform implementation
//!
//! Listening sockets are read from the /proc/net socket tables and matched to
//! their owners through the socket inodes found under /proc/PID/fd.

use std::collections::HashMap;
use std::path::Path;

use procfs::net::{TcpNetEntry, TcpState, UdpNetEntry};
use procfs::process::{FDTarget, Process};
use procfs::ProcError;
use rayon::prelude::*;
use tracing::debug;

use super::{PlatformError, UsersTable};
use crate::core::{ProcessSource, RawSocket, ScanFlags, SourceError};

/// Socket inode -> local port
type ListeningPorts = HashMap<u64, u16>;

/// Process source backed by procfs
pub struct ProcfsSource {
    flags: ScanFlags,
    users_table: UsersTable,
}

impl ProcfsSource {
    /// Check that /proc exposes socket tables before committing to procfs
    pub fn new(flags: ScanFlags) -> Result<Self, PlatformError> {
        if !Path::new("/proc/net/tcp").exists() {
            return Err(PlatformError::Unsupported(
                "linux without /proc/net/tcp".to_string(),
            ));
        }
        Ok(ProcfsSource {
            flags,
            users_table: UsersTable::new(),
        })
    }

    /// Build the inode -> port map from the host-wide socket tables
    fn host_listening_ports(&self) -> Result<ListeningPorts, SourceError> {
        let mut ports = ListeningPorts::new();
        if self.flags.contains(ScanFlags::TCP) {
            add_tcp(&mut ports, procfs::net::tcp().map_err(source_error)?);
        }
        if self.flags.contains(ScanFlags::TCP6) {
            add_tcp(&mut ports, procfs::net::tcp6().map_err(source_error)?);
        }
        if self.flags.contains(ScanFlags::UDP) {
            add_udp(&mut ports, procfs::net::udp().map_err(source_error)?);
        }
        if self.flags.contains(ScanFlags::UDP6) {
            add_udp(&mut ports, procfs::net::udp6().map_err(source_error)?);
        }
        Ok(ports)
    }

    /// Build the inode -> port map from the tables visible to one process.
    /// These follow the network namespace of that process.
    fn process_listening_ports(&self, proc: &Process) -> Result<ListeningPorts, SourceError> {
        let mut ports = ListeningPorts::new();
        if self.flags.contains(ScanFlags::TCP) {
            add_tcp(&mut ports, proc.tcp().map_err(source_error)?);
        }
        if self.flags.contains(ScanFlags::TCP6) {
            // IPv6 can be disabled per namespace
            if let Ok(entries) = proc.tcp6() {
                add_tcp(&mut ports, entries);
            }
        }
        if self.flags.contains(ScanFlags::UDP) {
            add_udp(&mut ports, proc.udp().map_err(source_error)?);
        }
        if self.flags.contains(ScanFlags::UDP6) {
            if let Ok(entries) = proc.udp6() {
                add_udp(&mut ports, entries);
            }
        }
        Ok(ports)
    }

    /// Match the socket fds of a process against known listening inodes
    fn owned_sockets(
        &self,
        proc: &Process,
        ports: &ListeningPorts,
    ) -> Result<Vec<RawSocket>, SourceError> {
        let mut found: Vec<u16> = Vec::new();
        for fd in proc.fd().map_err(source_error)? {
            // Descriptors can close while we walk the directory
            let Ok(fd) = fd else { continue };
            if let FDTarget::Socket(inode) = fd.target {
                if let Some(&port) = ports.get(&inode) {
                    found.push(port);
                }
            }
        }

        if found.is_empty() {
            return Ok(Vec::new());
        }

        let pid = proc.pid as u32;
        let user = proc
            .uid()
            .ok()
            .and_then(|uid| self.users_table.get_username(uid));
        let command_line = command_line(proc);

        Ok(found
            .into_iter()
            .map(|port| RawSocket {
                pid,
                local_port: port.to_string(),
                user: user.clone(),
                command_line: command_line.clone(),
            })
            .collect())
    }
}

impl ProcessSource for ProcfsSource {
    fn listening_sockets(&self) -> Result<Vec<RawSocket>, SourceError> {
        let ports = self.host_listening_ports()?;
        if ports.is_empty() {
            return Ok(Vec::new());
        }

        let procs: Vec<Process> = procfs::process::all_processes()
            .map_err(source_error)?
            .filter_map(Result::ok)
            .collect();

        // Processes we may not inspect are skipped, matching `ss -p` without root
        let sockets: Vec<RawSocket> = procs
            .par_iter()
            .filter_map(|proc| self.owned_sockets(proc, &ports).ok())
            .flatten()
            .collect();

        debug!(inodes = ports.len(), sockets = sockets.len(), "scanned /proc");
        Ok(sockets)
    }

    fn pids(&self) -> Result<Vec<u32>, SourceError> {
        Ok(procfs::process::all_processes()
            .map_err(source_error)?
            .filter_map(Result::ok)
            .map(|proc| proc.pid as u32)
            .collect())
    }

    fn sockets_for_pid(&self, pid: u32) -> Result<Vec<RawSocket>, SourceError> {
        let raw = i32::try_from(pid).map_err(|_| SourceError::Vanished(pid))?;
        let proc = Process::new(raw).map_err(|e| pid_error(pid, e))?;
        let ports = self.process_listening_ports(&proc)?;
        if ports.is_empty() {
            return Ok(Vec::new());
        }
        self.owned_sockets(&proc, &ports)
    }
}

fn add_tcp(ports: &mut ListeningPorts, entries: Vec<TcpNetEntry>) {
    for entry in entries {
        if entry.state == TcpState::Listen {
            ports.insert(entry.inode, entry.local_address.port());
        }
    }
}

/// UDP has no listen state; an unconnected bound socket counts as listening
fn add_udp(ports: &mut ListeningPorts, entries: Vec<UdpNetEntry>) {
    for entry in entries {
        if entry.remote_address.port() == 0 && entry.local_address.port() != 0 {
            ports.insert(entry.inode, entry.local_address.port());
        }
    }
}

/// Full command line, or the kernel's short name when argv is empty
fn command_line(proc: &Process) -> Option<String> {
    if let Ok(cmdline) = proc.cmdline() {
        if !cmdline.is_empty() {
            return Some(cmdline.join(" "));
        }
    }
    proc.stat().ok().map(|stat| stat.comm)
}

fn source_error(e: ProcError) -> SourceError {
    match e {
        ProcError::PermissionDenied(path) => SourceError::PermissionDenied(describe(path)),
        ProcError::Io(err, _) => SourceError::Io(err),
        other => SourceError::Other(other.to_string()),
    }
}

fn pid_error(pid: u32, e: ProcError) -> SourceError {
    match e {
        ProcError::NotFound(_) => SourceError::Vanished(pid),
        other => source_error(other),
    }
}

fn describe(path: Option<std::path::PathBuf>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "/proc".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Enumerator;
    use std::net::TcpListener;
    use std::sync::Arc;

    #[test]
    fn test_own_listener_is_found() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let source = ProcfsSource::new(ScanFlags::tcp()).unwrap();
        let records = Enumerator::new(Arc::new(source)).enumerate();
        let me = std::process::id();

        let mine = records
            .iter()
            .find(|r| r.pid == me && r.port.number() == Some(port))
            .expect("own listener should be listed");
        assert_ne!(mine.raw_command, "N/A");
    }

    #[test]
    fn test_sockets_for_own_pid() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let source = ProcfsSource::new(ScanFlags::tcp()).unwrap();
        let sockets = source.sockets_for_pid(std::process::id()).unwrap();
        assert!(sockets.iter().any(|s| s.local_port == port.to_string()));
    }

    #[test]
    fn test_sockets_for_missing_pid() {
        let source = ProcfsSource::new(ScanFlags::tcp()).unwrap();
        assert!(matches!(
            source.sockets_for_pid(i32::MAX as u32),
            Err(SourceError::Vanished(_))
        ));
    }

    /// A listener on 8080 and one accepted connection to it
    const TCP_TABLE: &str = "\
  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
   0: 0100007F:1F90 00000000:0000 0A 00000000:00000000 00:00000000 00000000  1000        0 41001 1 0000000000000000 100 0 0 10 0
   1: 0100007F:1F90 0100007F:D431 01 00000000:00000000 00:00000000 00000000  1000        0 41002 1 0000000000000000 20 4 30 10 -1
   2: 0100007F:D431 0100007F:1F90 01 00000000:00000000 00:00000000 00000000  1000        0 41003 1 0000000000000000 20 4 30 10 -1
";

    #[test]
    fn test_connected_sockets_are_ignored() {
        use procfs::net::TcpNetEntries;
        use procfs::FromBufReadSI;

        let entries =
            TcpNetEntries::from_buf_read(TCP_TABLE.as_bytes(), procfs::current_system_info())
                .unwrap()
                .0;
        assert_eq!(entries.len(), 3);

        let mut ports = ListeningPorts::new();
        add_tcp(&mut ports, entries);
        assert_eq!(ports.len(), 1);
        assert_eq!(ports.get(&41001), Some(&8080));
    }
}
