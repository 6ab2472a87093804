//! Platform-specific system information
//!
//! This module provides platform-specific implementations for finding the
//! processes that hold listening sockets, and for killing them.

use std::sync::Arc;

use thiserror::Error;

use crate::core::{ProcessSource, ScanFlags, TerminateError, Terminator};

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "macos")]
mod darwin;

mod refresh_worker;
mod users_table;

pub use refresh_worker::RefreshWorker;
pub use users_table::UsersTable;

/// Errors raised while preparing platform access
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("unsupported platform: {0}")]
    Unsupported(String),
}

/// Build the process source for the running platform
pub fn process_source(flags: ScanFlags) -> Result<Arc<dyn ProcessSource>, PlatformError> {
    #[cfg(target_os = "linux")]
    {
        let source = linux::ProcfsSource::new(flags)?;
        Ok(Arc::new(source))
    }
    #[cfg(target_os = "macos")]
    {
        Ok(Arc::new(darwin::LibprocSource::new(flags)))
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        let _ = flags;
        Err(PlatformError::Unsupported(std::env::consts::OS.to_string()))
    }
}

/// Kills processes with SIGKILL
#[derive(Debug, Default, Clone, Copy)]
pub struct SignalTerminator;

impl Terminator for SignalTerminator {
    #[cfg(unix)]
    fn kill(&self, pid: u32) -> Result<(), TerminateError> {
        use nix::errno::Errno;
        use nix::sys::signal::{self, Signal};
        use nix::unistd::Pid;

        let raw = i32::try_from(pid).map_err(|_| TerminateError::NoSuchProcess(pid))?;
        match signal::kill(Pid::from_raw(raw), Signal::SIGKILL) {
            Ok(()) => Ok(()),
            Err(Errno::ESRCH) => Err(TerminateError::NoSuchProcess(pid)),
            Err(Errno::EPERM) => Err(TerminateError::PermissionDenied(pid)),
            Err(e) => Err(TerminateError::Other {
                pid,
                reason: e.desc().to_string(),
            }),
        }
    }

    #[cfg(not(unix))]
    fn kill(&self, pid: u32) -> Result<(), TerminateError> {
        Err(TerminateError::Other {
            pid,
            reason: "signals are not supported on this platform".to_string(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_kill_missing_process() {
        // Out of range for any real pid table
        let pid = i32::MAX as u32;
        match SignalTerminator.kill(pid) {
            Err(TerminateError::NoSuchProcess(p)) => assert_eq!(p, pid),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_kill_rejects_oversized_pid() {
        assert!(matches!(
            SignalTerminator.kill(u32::MAX),
            Err(TerminateError::NoSuchProcess(_))
        ));
    }
}
