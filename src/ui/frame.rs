//! Frame - what the screen should show
//!
//! `Frame::build` turns the session into plain lines tagged with a color
//! element. It does no terminal I/O, so everything the user sees can be
//! checked in tests; `CursesRenderer` only paints the result.

use super::crt::ColorElement;
use super::function_bar::FunctionBar;
use crate::core::{page_indicator, page_window, Mode, ProcessRecord, Session, PAGE_SIZE};

pub const TITLE: &str = "Gruyere";
pub const TAGLINE: &str = "A tiny program for viewing + killing ports";
pub const SUBTEXT: &str = "Here's what's running...";
pub const EMPTY_FILTERED_HINT: &str = "No matching processes. Press Backspace to clear filters.";
pub const CONFIRM_QUESTION: &str = "Are you sure you want to kill the process?";
pub const CONFIRM_HINT: &str = "Press Y to confirm, N to cancel.";

/// Gutter mark on the selected row
const SELECTED_MARK: &str = "▐ ";
const UNSELECTED_MARK: &str = "  ";

/// One line of output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLine {
    pub text: String,
    pub color: ColorElement,
}

impl FrameLine {
    fn new(text: impl Into<String>, color: ColorElement) -> Self {
        FrameLine {
            text: text.into(),
            color,
        }
    }

    fn blank() -> Self {
        FrameLine::new("", ColorElement::DefaultColor)
    }
}

/// Immutable description of one screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub lines: Vec<FrameLine>,
    pub function_bar: FunctionBar,
}

impl Frame {
    /// Describe the current session state
    pub fn build(session: &Session) -> Frame {
        let mut lines = title_block();

        let filters = session.cli_filters();
        if let Some(port) = filters.port {
            lines.push(FrameLine::new(format!("Filtering by port: {}", port), ColorElement::Banner));
        }
        if let Some(user) = &filters.user {
            lines.push(FrameLine::new(format!("Filtering by user: {}", user), ColorElement::Banner));
        }
        if let Some(command) = &filters.command {
            lines.push(FrameLine::new(
                format!("Filtering by command: {}", command),
                ColorElement::Banner,
            ));
        }
        if filters.is_active() {
            lines.push(FrameLine::blank());
        }

        match session.mode() {
            Mode::ConfirmKill(process) => confirmation(&mut lines, process),
            _ => process_list(&mut lines, session),
        }

        Frame {
            lines,
            function_bar: FunctionBar::for_mode(session.mode()),
        }
    }

    /// All line texts, for inspection
    #[cfg(test)]
    pub fn texts(&self) -> Vec<&str> {
        self.lines.iter().map(|l| l.text.as_str()).collect()
    }
}

fn title_block() -> Vec<FrameLine> {
    vec![
        FrameLine::new(TITLE, ColorElement::Title),
        FrameLine::new(TAGLINE, ColorElement::Tagline),
        FrameLine::new("─".repeat(TAGLINE.chars().count()), ColorElement::Tagline),
        FrameLine::new(SUBTEXT, ColorElement::Tagline),
        FrameLine::blank(),
    ]
}

fn confirmation(lines: &mut Vec<FrameLine>, process: &ProcessRecord) {
    lines.push(FrameLine::new(CONFIRM_QUESTION, ColorElement::DialogEmphasis));
    lines.push(FrameLine::blank());
    lines.push(FrameLine::new(format!("PID: {}", process.pid), ColorElement::Dialog));
    lines.push(FrameLine::new(format!("Port: {}", process.port), ColorElement::Dialog));
    lines.push(FrameLine::new(format!("User: {}", process.user), ColorElement::Dialog));
    lines.push(FrameLine::new(
        format!("Command: {}", process.raw_command),
        ColorElement::Dialog,
    ));
    lines.push(FrameLine::blank());
    lines.push(FrameLine::new(CONFIRM_HINT, ColorElement::Hint));
}

fn process_list(lines: &mut Vec<FrameLine>, session: &Session) {
    let visible = session.visible_processes();
    let window = page_window(visible.len(), session.selected(), PAGE_SIZE);
    let row_height = if session.show_details() { 3 } else { 2 };

    if visible.is_empty() {
        let hint = if !session.filter_text().is_empty() {
            format!("No processes match \"{}\".", session.filter_text())
        } else if session.cli_filters().is_active() {
            EMPTY_FILTERED_HINT.to_string()
        } else {
            "No processes are listening on any port.".to_string()
        };
        lines.push(FrameLine::new(hint, ColorElement::Hint));
    }

    for (offset, process) in visible[window.start..window.end].iter().enumerate() {
        let selected = offset == window.display_index;
        row(lines, process, selected, session.show_details());
    }

    // Keep the layout steady on short pages
    let used = if window.is_empty() { 1 } else { window.len() * (row_height + 1) };
    for _ in used..PAGE_SIZE * (row_height + 1) {
        lines.push(FrameLine::blank());
    }

    match page_indicator(&window) {
        Some(dots) => lines.push(FrameLine::new(format!("  {}", dots), ColorElement::PageIndicator)),
        None => lines.push(FrameLine::blank()),
    }

    if matches!(session.mode(), Mode::Filtering) {
        lines.push(FrameLine::new(
            format!("Filter: {}_", session.filter_text()),
            ColorElement::FilterBar,
        ));
    }

    let status = match session.last_refresh() {
        Some(at) => format!(
            "{} of {} shown, updated {}",
            visible.len(),
            session.all_processes().len(),
            at.format("%H:%M:%S")
        ),
        None => format!("{} of {} shown", visible.len(), session.all_processes().len()),
    };
    lines.push(FrameLine::new(status, ColorElement::Status));
}

fn row(lines: &mut Vec<FrameLine>, process: &ProcessRecord, selected: bool, details: bool) {
    let (mark, main, dim) = if selected {
        (SELECTED_MARK, ColorElement::Selection, ColorElement::Selection)
    } else {
        (UNSELECTED_MARK, ColorElement::DefaultColor, ColorElement::Details)
    };

    lines.push(FrameLine::new(
        format!("{}Port: {} (PID: {})", mark, process.port, process.pid),
        main,
    ));
    lines.push(FrameLine::new(
        format!("{}App: {}, User: {}", mark, process.display_name, process.user),
        dim,
    ));
    if details {
        lines.push(FrameLine::new(
            format!("{}Details: {}", mark, process.raw_command),
            dim,
        ));
    }
    lines.push(FrameLine::blank());
}
