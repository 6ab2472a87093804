//! gruyere - view the processes listening on ports, and kill them
//!
//! Copyright (C) 2026 Trung Le
//! Released under the GNU GPLv2+

mod core;
mod platform;
mod ui;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Mutex};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing::info;

use crate::core::{ColorScheme, Enumerator, FilterSpec, ScanFlags, Session, SessionContext, Settings};
use crate::platform::{RefreshWorker, SignalTerminator};
use crate::ui::{Coordinator, Crt, CursesRenderer};

/// Set from the signal handler, consumed by the coordinator
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

const VERSION: &str = env!("CARGO_PKG_VERSION");
const COPYRIGHT: &str = "(C) 2026 Trung Le.";

fn print_version() {
    println!("gruyere {}", VERSION);
}

fn print_help() {
    print_version();
    println!("{}", COPYRIGHT);
    println!("Released under the GNU GPLv2+.");
    println!();
    println!("-p --port=PORT                  Show only processes listening on PORT");
    println!("-u --user=USERNAME              Show only processes owned by USERNAME");
    println!("-c --command=TEXT               Show only commands containing TEXT (any case)");
    println!("-r --refresh-rate=RATE          Screen updates per second (default 10)");
    println!("-d --details                    Show full command lines");
    println!("   --udp                        Also list bound UDP sockets");
    println!("-C --no-color                   Use a monochrome color scheme");
    println!("   --log-file=PATH              Write a debug log to PATH");
    println!("-h --help                       Print this help screen");
    println!("-V --version                    Print version info");
    println!();
    println!("Keys: up/k down/j move, Enter kills, / filters, d toggles details, q quits.");
}

/// gruyere - view and kill processes listening on ports
#[derive(Parser, Debug)]
#[command(name = "gruyere")]
#[command(disable_help_flag = true)]
#[command(disable_version_flag = true)]
struct Args {
    /// Show only processes listening on this port
    #[arg(short = 'p', long = "port", value_name = "PORT")]
    port: Option<u16>,

    /// Show only processes owned by this user
    #[arg(short = 'u', long = "user", value_name = "USERNAME")]
    user: Option<String>,

    /// Show only commands containing this text
    #[arg(short = 'c', long = "command", value_name = "TEXT")]
    command: Option<String>,

    /// Screen updates per second
    #[arg(short = 'r', long = "refresh-rate", value_name = "RATE")]
    refresh_rate: Option<u32>,

    /// Show full command lines
    #[arg(short = 'd', long = "details")]
    details: bool,

    /// Also list bound UDP sockets
    #[arg(long = "udp")]
    udp: bool,

    /// Use a monochrome color scheme
    #[arg(short = 'C', long = "no-color")]
    no_color: bool,

    /// Write a debug log to this file
    #[arg(long = "log-file", value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Print this help screen
    #[arg(short = 'h', long = "help", action = ArgAction::SetTrue)]
    help: bool,

    /// Print version info
    #[arg(short = 'V', long = "version", action = ArgAction::SetTrue)]
    version: bool,
}

/// Apply command line arguments on top of the defaults
fn build_settings(args: &Args) -> Settings {
    let mut settings = Settings {
        filters: FilterSpec {
            port: args.port,
            user: args.user.clone(),
            command: args.command.clone(),
        },
        show_details: args.details,
        ..Settings::default()
    };

    if let Some(rate) = args.refresh_rate {
        settings.set_paint_rate(rate);
    }
    if args.udp {
        settings.scan_flags = ScanFlags::tcp_and_udp();
    }
    if args.no_color {
        settings.color_scheme = ColorScheme::Monochrome;
    }
    settings
}

/// Send logs to `path`; the terminal belongs to the UI
fn init_tracing(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install logger: {}", e))
}

extern "C" fn handle_signal(_: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Turn SIGINT and SIGTERM into a quit request
fn setup_signal_handlers() -> Result<()> {
    use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

    let action = SigAction::new(
        SigHandler::Handler(handle_signal),
        SaFlags::empty(),
        SigSet::empty(),
    );
    for signal in [Signal::SIGINT, Signal::SIGTERM] {
        // SAFETY: the handler only stores to an atomic
        unsafe { sigaction(signal, &action) }
            .with_context(|| format!("failed to install {:?} handler", signal))?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.help {
        print_help();
        return Ok(());
    }
    if args.version {
        print_version();
        return Ok(());
    }

    let settings = build_settings(&args);
    if let Some(path) = &args.log_file {
        init_tracing(path)?;
    }

    // Refuse before touching the terminal
    let source = match platform::process_source(settings.scan_flags) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("gruyere: {}", e);
            std::process::exit(1);
        }
    };

    setup_signal_handlers()?;

    let enumerator = Enumerator::new(source);
    let session = Session::new(
        settings.filters.clone(),
        settings.show_details,
        enumerator.enumerate(),
    );
    info!(filters = ?settings.filters, scan = ?settings.scan_flags, "starting");

    let (events, receiver) = mpsc::channel();
    let mut worker = RefreshWorker::spawn(enumerator.clone(), settings.refresh_interval, events)?;

    let terminator = SignalTerminator;
    let mut renderer = CursesRenderer::new(Crt::new(settings.color_scheme)?);
    let mut coordinator = Coordinator::new(
        session,
        SessionContext {
            enumerator: &enumerator,
            terminator: &terminator,
        },
        receiver,
        &INTERRUPTED,
        settings.paint_interval(),
    );

    let result = coordinator.run(&mut renderer);

    // Cleanup
    renderer.done();
    worker.stop();

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["gruyere"]).unwrap();
        let settings = build_settings(&args);
        assert!(!settings.filters.is_active());
        assert!(!settings.show_details);
        assert_eq!(settings.scan_flags, ScanFlags::tcp());
        assert_eq!(settings.color_scheme, ColorScheme::Default);
        assert_eq!(settings.refresh_interval, Duration::from_secs(2));
    }

    #[test]
    fn test_filters_and_flags() {
        let args = Args::try_parse_from([
            "gruyere", "-p", "8000", "-u", "alice", "-c", "Node", "-r", "500", "-d", "--udp", "-C",
        ])
        .unwrap();
        let settings = build_settings(&args);
        assert_eq!(settings.filters.port, Some(8000));
        assert_eq!(settings.filters.user.as_deref(), Some("alice"));
        assert_eq!(settings.filters.command.as_deref(), Some("Node"));
        assert_eq!(settings.paint_rate, crate::core::MAX_PAINT_RATE);
        assert!(settings.show_details);
        assert_eq!(settings.scan_flags, ScanFlags::tcp_and_udp());
        assert_eq!(settings.color_scheme, ColorScheme::Monochrome);
    }

    #[test]
    fn test_port_must_fit() {
        assert!(Args::try_parse_from(["gruyere", "--port", "70000"]).is_err());
        assert!(Args::try_parse_from(["gruyere", "--port", "http"]).is_err());
    }
}
