//! Process enumeration
//!
//! The enumerator asks a `ProcessSource` for listening sockets, turns them
//! into `ProcessRecord`s, drops duplicates and sorts by port. It never fails:
//! lookup problems degrade single fields to `N/A`, and a permission error on
//! the bulk query falls back to asking every process individually.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use super::process::{parse_port, Port, ProcessRecord};

/// One listening socket as reported by the operating system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSocket {
    pub pid: u32,
    pub local_port: String,
    pub user: Option<String>,
    pub command_line: Option<String>,
}

/// Errors reported by a process source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("process {0} no longer exists")]
    Vanished(u32),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
}

/// Operating system access to processes and their listening sockets
pub trait ProcessSource: Send + Sync {
    /// List every listening socket on the host in one pass
    fn listening_sockets(&self) -> Result<Vec<RawSocket>, SourceError>;

    /// List all process ids
    fn pids(&self) -> Result<Vec<u32>, SourceError>;

    /// List the listening sockets owned by a single process
    fn sockets_for_pid(&self, pid: u32) -> Result<Vec<RawSocket>, SourceError>;
}

/// One enumeration, tagged with the order in which it was started
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Increases with every enumeration started by any clone of the enumerator
    pub generation: u64,
    pub records: Vec<ProcessRecord>,
}

/// Builds the sorted, deduplicated process list
#[derive(Clone)]
pub struct Enumerator {
    source: Arc<dyn ProcessSource>,
    generation: Arc<AtomicU64>,
}

impl Enumerator {
    pub fn new(source: Arc<dyn ProcessSource>) -> Self {
        Enumerator {
            source,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Enumerate all processes holding a listening socket
    pub fn enumerate(&self) -> Vec<ProcessRecord> {
        self.snapshot().records
    }

    /// Enumerate, remembering when this enumeration started relative to others
    pub fn snapshot(&self) -> Snapshot {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        Snapshot {
            generation,
            records: self.collect(),
        }
    }

    fn collect(&self) -> Vec<ProcessRecord> {
        let sockets = match self.source.listening_sockets() {
            Ok(sockets) => sockets,
            Err(SourceError::PermissionDenied(what)) => {
                warn!(%what, "bulk socket listing denied, scanning processes one by one");
                self.enumerate_per_process()
            }
            Err(e) => {
                warn!(error = %e, "failed to list listening sockets");
                Vec::new()
            }
        };

        let records = normalize(sockets);
        debug!(count = records.len(), "enumerated listening processes");
        records
    }

    /// Fallback strategy: ask each process for its own sockets
    fn enumerate_per_process(&self) -> Vec<RawSocket> {
        let pids = match self.source.pids() {
            Ok(pids) => pids,
            Err(e) => {
                warn!(error = %e, "failed to list processes");
                return Vec::new();
            }
        };

        let mut sockets = Vec::new();
        for pid in pids {
            match self.source.sockets_for_pid(pid) {
                Ok(found) => sockets.extend(found),
                // Gone or not ours to inspect
                Err(SourceError::Vanished(_)) | Err(SourceError::PermissionDenied(_)) => continue,
                Err(e) => debug!(pid, error = %e, "skipping process"),
            }
        }
        sockets
    }
}

/// Convert raw sockets into records, dropping duplicate `(pid, port)` pairs
/// and sorting numeric ports before opaque ones.
pub fn normalize(sockets: Vec<RawSocket>) -> Vec<ProcessRecord> {
    let mut seen: HashSet<(u32, Port)> = HashSet::new();
    let mut records: Vec<ProcessRecord> = Vec::with_capacity(sockets.len());

    for socket in sockets {
        let port = parse_port(&socket.local_port);
        if !seen.insert((socket.pid, port.clone())) {
            continue;
        }
        records.push(ProcessRecord::new(
            socket.pid,
            port,
            socket.user,
            socket.command_line,
        ));
    }

    records.sort_by(|a, b| a.port.cmp(&b.port));
    records
}
