//! Session state machine
//!
//! The session owns everything the screen shows: the CLI-filtered process
//! list, the visible (interactively filtered) list, the selection and the
//! current mode. All changes go through `Session::handle`, which is only
//! ever called by the coordinator thread.
//!
//! ```text
//!            '/'                 Enter (match)
//!   Browse ───────▶ Filtering ─────────────────┐
//!     ▲  ▲  ◀───────  │                         ▼
//!     │  │ Backspace  │ Enter (no match)   ConfirmKill
//!     │  │ on empty,  │                         │
//!     │  │ Esc        ▼                         │ y / n / q
//!     │  └──────── Browse ◀─────────────────────┘
//!     │ Enter
//!     └──────────▶ ConfirmKill
//!   'q' or interrupt from any mode ──▶ Exiting
//! ```

use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::enumerator::{Enumerator, Snapshot};
use super::filter::{apply_cli_filters, apply_interactive_filter, FilterSpec};
use super::process::ProcessRecord;
use super::selection::{clamp_index, move_down, move_up};

/// Errors from terminating a process
#[derive(Debug, Error)]
pub enum TerminateError {
    #[error("process {0} does not exist")]
    NoSuchProcess(u32),
    #[error("not permitted to kill process {0}")]
    PermissionDenied(u32),
    #[error("failed to kill process {pid}: {reason}")]
    Other { pid: u32, reason: String },
}

/// Kills processes
pub trait Terminator: Send + Sync {
    fn kill(&self, pid: u32) -> Result<(), TerminateError>;
}

/// Decoded keyboard input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Enter,
    Backspace,
    Escape,
    Char(char),
    /// Ctrl-C typed at the terminal
    Interrupt,
}

/// Everything that can change the session
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Key(Key),
    /// Fresh, unfiltered enumeration from the refresh worker
    Refreshed(Snapshot),
    /// SIGINT/SIGTERM received
    Interrupt,
}

/// Session mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Browse,
    Filtering,
    /// Waiting for the user to confirm killing the captured process
    ConfirmKill(ProcessRecord),
    Exiting,
}

/// Collaborators needed while handling an event
pub struct SessionContext<'a> {
    pub enumerator: &'a Enumerator,
    pub terminator: &'a dyn Terminator,
}

/// Interactive session state
#[derive(Debug, Clone)]
pub struct Session {
    cli_filters: FilterSpec,
    all_processes: Vec<ProcessRecord>,
    visible_processes: Vec<ProcessRecord>,
    selected: usize,
    mode: Mode,
    show_details: bool,
    filter_text: String,
    last_refresh: Option<DateTime<Local>>,
    /// Generation of the newest enumeration applied so far
    generation: u64,
}

impl Session {
    /// Create a session from an initial (unfiltered) enumeration
    pub fn new(cli_filters: FilterSpec, show_details: bool, processes: Vec<ProcessRecord>) -> Self {
        let all_processes = apply_cli_filters(&processes, &cli_filters);
        Session {
            cli_filters,
            visible_processes: all_processes.clone(),
            all_processes,
            selected: 0,
            mode: Mode::Browse,
            show_details,
            filter_text: String::new(),
            last_refresh: Some(Local::now()),
            generation: 0,
        }
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn is_exiting(&self) -> bool {
        self.mode == Mode::Exiting
    }

    pub fn cli_filters(&self) -> &FilterSpec {
        &self.cli_filters
    }

    pub fn all_processes(&self) -> &[ProcessRecord] {
        &self.all_processes
    }

    pub fn visible_processes(&self) -> &[ProcessRecord] {
        &self.visible_processes
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    /// The record under the cursor, if any
    pub fn selected_process(&self) -> Option<&ProcessRecord> {
        self.visible_processes.get(self.selected)
    }

    pub fn show_details(&self) -> bool {
        self.show_details
    }

    pub fn filter_text(&self) -> &str {
        &self.filter_text
    }

    pub fn last_refresh(&self) -> Option<DateTime<Local>> {
        self.last_refresh
    }

    /// Apply one event
    pub fn handle(&mut self, event: SessionEvent, ctx: &SessionContext<'_>) {
        match event {
            SessionEvent::Interrupt | SessionEvent::Key(Key::Interrupt) => {
                info!("interrupted, exiting");
                self.mode = Mode::Exiting;
            }
            SessionEvent::Refreshed(snapshot) => {
                if snapshot.generation < self.generation {
                    debug!(
                        stale = snapshot.generation,
                        current = self.generation,
                        "dropping refresh older than the last reload"
                    );
                } else {
                    self.apply_snapshot(snapshot);
                }
            }
            SessionEvent::Key(key) => match self.mode.clone() {
                Mode::Browse => self.handle_browse(key, ctx),
                Mode::Filtering => self.handle_filtering(key, ctx),
                Mode::ConfirmKill(process) => self.handle_confirm(key, process, ctx),
                Mode::Exiting => {}
            },
        }
    }

    fn handle_browse(&mut self, key: Key, ctx: &SessionContext<'_>) {
        match key {
            Key::Up | Key::Char('k') => self.selected = move_up(self.selected),
            Key::Down | Key::Char('j') => {
                self.selected = move_down(self.selected, self.visible_processes.len())
            }
            Key::Char('/') => {
                self.filter_text.clear();
                self.mode = Mode::Filtering;
            }
            Key::Char('d') => self.show_details = !self.show_details,
            Key::Enter => self.begin_confirm(),
            Key::Backspace => {
                if self.visible_processes.is_empty() && self.cli_filters.is_active() {
                    self.clear_cli_filters(ctx);
                }
            }
            Key::Char('q') => {
                info!("quit requested");
                self.mode = Mode::Exiting;
            }
            _ => {}
        }
    }

    fn handle_filtering(&mut self, key: Key, ctx: &SessionContext<'_>) {
        match key {
            Key::Up => self.selected = move_up(self.selected),
            Key::Down => self.selected = move_down(self.selected, self.visible_processes.len()),
            Key::Backspace => {
                if self.filter_text.pop().is_some() {
                    self.refilter(ctx);
                } else {
                    self.leave_filtering();
                    if self.all_processes.is_empty() && self.cli_filters.is_active() {
                        self.clear_cli_filters(ctx);
                    }
                }
            }
            Key::Escape => self.leave_filtering(),
            Key::Enter => {
                if self.visible_processes.is_empty() {
                    self.leave_filtering();
                } else {
                    self.begin_confirm();
                }
            }
            Key::Char(c) if !c.is_control() => {
                self.filter_text.push(c);
                self.refilter(ctx);
            }
            _ => {}
        }
    }

    fn handle_confirm(&mut self, key: Key, process: ProcessRecord, ctx: &SessionContext<'_>) {
        match key {
            Key::Char('y') | Key::Char('Y') => {
                match ctx.terminator.kill(process.pid) {
                    Ok(()) => info!(pid = process.pid, port = %process.port, "killed process"),
                    Err(e) => warn!(pid = process.pid, error = %e, "kill failed"),
                }
                self.return_to_browse(Some(&process));
                self.reload(ctx);
            }
            Key::Char('n') | Key::Char('N') | Key::Char('q') | Key::Char('Q') => {
                debug!(pid = process.pid, "kill cancelled");
                self.return_to_browse(Some(&process));
            }
            _ => {}
        }
    }

    fn begin_confirm(&mut self) {
        if let Some(process) = self.selected_process().cloned() {
            self.mode = Mode::ConfirmKill(process);
        }
    }

    /// Back to Browse with the interactive filter gone. The cursor follows
    /// `focus` into the full list, or goes to the top if it is not there.
    fn return_to_browse(&mut self, focus: Option<&ProcessRecord>) {
        self.mode = Mode::Browse;
        self.filter_text.clear();
        self.visible_processes = self.all_processes.clone();
        self.selected = match focus {
            Some(process) => self
                .visible_processes
                .iter()
                .position(|p| p.pid == process.pid && p.port == process.port)
                .unwrap_or(0),
            None => clamp_index(self.selected, self.visible_processes.len()),
        };
    }

    fn leave_filtering(&mut self) {
        self.return_to_browse(None);
        self.selected = 0;
    }

    fn clear_cli_filters(&mut self, ctx: &SessionContext<'_>) {
        info!(filters = ?self.cli_filters, "clearing command line filters");
        self.cli_filters.clear();
        self.reload(ctx);
        self.selected = 0;
    }

    /// Re-enumerate and re-apply the interactive filter from the top
    fn refilter(&mut self, ctx: &SessionContext<'_>) {
        self.reload(ctx);
        self.selected = 0;
    }

    fn reload(&mut self, ctx: &SessionContext<'_>) {
        let snapshot = ctx.enumerator.snapshot();
        self.apply_snapshot(snapshot);
    }

    /// Replace the process lists with a fresh enumeration
    fn apply_snapshot(&mut self, snapshot: Snapshot) {
        self.generation = self.generation.max(snapshot.generation);
        self.all_processes = apply_cli_filters(&snapshot.records, &self.cli_filters);
        self.visible_processes = match self.mode {
            Mode::Filtering => apply_interactive_filter(&self.filter_text, &self.all_processes),
            _ => self.all_processes.clone(),
        };
        self.selected = clamp_index(self.selected, self.visible_processes.len());
        self.last_refresh = Some(Local::now());
    }
}
