//! macOS platform implementation
//!
//! macOS has no host-wide socket table we can read without privileges, so
//! every process's descriptor table is walked through libproc. Any process
//! we are not allowed to inspect turns the bulk listing into a permission
//! error and the enumerator retries one process at a time.

use std::io;
use std::mem;
use std::ptr;

use libc::{c_int, c_void, size_t};
use libproc::bsd_info::BSDInfo;
use libproc::file_info::{pidfdinfo, ListFDs, ProcFDType};
use libproc::net_info::{SocketFDInfo, SocketInfoKind, TcpSIState};
use libproc::processes::{pids_by_type, ProcFilter};
use libproc::proc_pid::{listpidinfo, pidinfo};
use rayon::prelude::*;
use tracing::debug;

use super::UsersTable;
use crate::core::{ProcessSource, RawSocket, ScanFlags, SourceError};

const CTL_KERN: c_int = 1;
const KERN_ARGMAX: c_int = 8;
const KERN_PROCARGS2: c_int = 49;

const INI_IPV4: u8 = 0x1;
const INI_IPV6: u8 = 0x2;
const IPPROTO_UDP: c_int = 17;

/// Process source backed by libproc
pub struct LibprocSource {
    flags: ScanFlags,
    users_table: UsersTable,
}

impl LibprocSource {
    pub fn new(flags: ScanFlags) -> Self {
        LibprocSource {
            flags,
            users_table: UsersTable::new(),
        }
    }

    fn wants(&self, vflag: u8, v4: ScanFlags, v6: ScanFlags) -> bool {
        (vflag & INI_IPV4 != 0 && self.flags.contains(v4))
            || (vflag & INI_IPV6 != 0 && self.flags.contains(v6))
    }

    /// Local port of a listening socket, if this descriptor is one we scan
    fn listening_port(&self, socket: &SocketFDInfo) -> Option<u16> {
        match SocketInfoKind::from(socket.psi.soi_kind) {
            SocketInfoKind::Tcp => {
                // SAFETY: soi_kind says the tcp member is populated
                let tcp = unsafe { socket.psi.soi_proto.pri_tcp };
                if !matches!(TcpSIState::from(tcp.tcpsi_state), TcpSIState::Listen) {
                    return None;
                }
                let ini = tcp.tcpsi_ini;
                self.wants(ini.insi_vflag, ScanFlags::TCP, ScanFlags::TCP6)
                    .then(|| u16::from_be(ini.insi_lport as u16))
            }
            SocketInfoKind::In if socket.psi.soi_protocol == IPPROTO_UDP => {
                // SAFETY: soi_kind says the in member is populated
                let ini = unsafe { socket.psi.soi_proto.pri_in };
                let local = u16::from_be(ini.insi_lport as u16);
                let remote = u16::from_be(ini.insi_fport as u16);
                (local != 0
                    && remote == 0
                    && self.wants(ini.insi_vflag, ScanFlags::UDP, ScanFlags::UDP6))
                .then_some(local)
            }
            _ => None,
        }
    }
}

impl ProcessSource for LibprocSource {
    fn listening_sockets(&self) -> Result<Vec<RawSocket>, SourceError> {
        let pids = self.pids()?;
        let results: Vec<Result<Vec<RawSocket>, SourceError>> =
            pids.par_iter().map(|&pid| self.sockets_for_pid(pid)).collect();

        let mut sockets = Vec::new();
        for result in results {
            match result {
                Ok(found) => sockets.extend(found),
                Err(SourceError::Vanished(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        debug!(pids = pids.len(), sockets = sockets.len(), "scanned descriptor tables");
        Ok(sockets)
    }

    fn pids(&self) -> Result<Vec<u32>, SourceError> {
        let pids = pids_by_type(ProcFilter::All)?;
        // The kernel pads the list with zeros
        Ok(pids.into_iter().filter(|&pid| pid != 0).collect())
    }

    fn sockets_for_pid(&self, pid: u32) -> Result<Vec<RawSocket>, SourceError> {
        let raw = i32::try_from(pid).map_err(|_| SourceError::Vanished(pid))?;
        let info = pidinfo::<BSDInfo>(raw, 0).map_err(|e| pid_error(pid, e))?;
        let fds = listpidinfo::<ListFDs>(raw, info.pbi_nfiles as usize)
            .map_err(|e| pid_error(pid, e))?;

        let mut ports: Vec<u16> = Vec::new();
        for fd in fds {
            if !matches!(ProcFDType::from(fd.proc_fdtype), ProcFDType::Socket) {
                continue;
            }
            // Closed since the listing
            let Ok(socket) = pidfdinfo::<SocketFDInfo>(raw, fd.proc_fd) else {
                continue;
            };
            if let Some(port) = self.listening_port(&socket) {
                ports.push(port);
            }
        }

        if ports.is_empty() {
            return Ok(Vec::new());
        }

        let user = self.users_table.get_username(info.pbi_uid);
        let command_line = process_cmdline(raw).or_else(|| comm(&info));

        Ok(ports
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

/// libproc reports failures as strings; errno still holds the cause
fn pid_error(pid: u32, message: String) -> SourceError {
    let errno = io::Error::last_os_error();
    match errno.raw_os_error() {
        Some(libc::ESRCH) => SourceError::Vanished(pid),
        Some(libc::EPERM) | Some(libc::EACCES) => {
            SourceError::PermissionDenied(format!("pid {}", pid))
        }
        _ => SourceError::Other(message),
    }
}

fn comm(info: &BSDInfo) -> Option<String> {
    let bytes: Vec<u8> = info
        .pbi_comm
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    if bytes.is_empty() {
        None
    } else {
        Some(String::from_utf8_lossy(&bytes).to_string())
    }
}

/// Read argv of a process through KERN_PROCARGS2
fn process_cmdline(pid: i32) -> Option<String> {
    let mut argmax: c_int = 0;
    let mut size = mem::size_of::<c_int>();
    let mut mib: [c_int; 2] = [CTL_KERN, KERN_ARGMAX];

    let ret = unsafe {
        libc::sysctl(
            mib.as_mut_ptr(),
            2,
            &mut argmax as *mut _ as *mut c_void,
            &mut size,
            ptr::null_mut(),
            0,
        )
    };
    if ret != 0 || argmax <= 0 {
        return None;
    }

    let mut procargs: Vec<u8> = vec![0; argmax as usize];
    let mut size = argmax as size_t;
    let mut mib: [c_int; 3] = [CTL_KERN, KERN_PROCARGS2, pid];

    let ret = unsafe {
        libc::sysctl(
            mib.as_mut_ptr(),
            3,
            procargs.as_mut_ptr() as *mut c_void,
            &mut size,
            ptr::null_mut(),
            0,
        )
    };
    if ret != 0 {
        return None;
    }

    procargs.truncate(size);
    parse_procargs(&procargs)
}

/// Parse a KERN_PROCARGS2 buffer.
///
/// Layout: nargs (int) | exec_path | \0+ | arg0 | \0 | arg1 | \0 | ...
fn parse_procargs(buf: &[u8]) -> Option<String> {
    let header = mem::size_of::<c_int>();
    let nargs = c_int::from_ne_bytes(buf.get(..header)?.try_into().ok()?);
    if nargs <= 0 {
        return None;
    }

    let rest = &buf[header..];
    let exec_end = rest.iter().position(|&c| c == 0)?;
    let args_start = exec_end + rest[exec_end..].iter().position(|&c| c != 0)?;

    let args: Vec<String> = rest[args_start..]
        .split(|&c| c == 0)
        .take(nargs as usize)
        .map(|arg| String::from_utf8_lossy(arg).to_string())
        .collect();

    let cmdline = args.join(" ");
    if cmdline.trim().is_empty() {
        None
    } else {
        Some(cmdline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn procargs(nargs: i32, exec_path: &str, args: &[&str]) -> Vec<u8> {
        let mut buf = nargs.to_ne_bytes().to_vec();
        buf.extend_from_slice(exec_path.as_bytes());
        buf.extend_from_slice(&[0, 0, 0]);
        for arg in args {
            buf.extend_from_slice(arg.as_bytes());
            buf.push(0);
        }
        // Environment follows argv
        buf.extend_from_slice(b"HOME=/Users/me\0");
        buf
    }

    #[test]
    fn test_parse_procargs() {
        let buf = procargs(2, "/usr/local/bin/node", &["node", "server.js"]);
        assert_eq!(parse_procargs(&buf).as_deref(), Some("node server.js"));
    }

    #[test]
    fn test_parse_procargs_rejects_garbage() {
        assert_eq!(parse_procargs(&[]), None);
        assert_eq!(parse_procargs(&procargs(0, "/bin/sh", &[])), None);
        assert_eq!(parse_procargs(&1i32.to_ne_bytes()), None);
    }

    #[test]
    fn test_own_listener_is_found() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let source = LibprocSource::new(ScanFlags::tcp());
        let sockets = source.sockets_for_pid(std::process::id()).unwrap();
        assert!(sockets.iter().any(|s| s.local_port == port.to_string()));
    }
}
