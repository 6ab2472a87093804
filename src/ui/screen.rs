//! Screen - painting frames and reading keys
//!
//! The coordinator talks to the terminal through two small traits so the
//! event loop can run against a scripted terminal in tests.

use std::time::Duration;

use super::crt::{translate_key, Crt};
use super::frame::Frame;
use crate::core::Key;

/// Paints a frame
pub trait Renderer {
    fn paint(&mut self, frame: &Frame);
}

/// Waits for keyboard input
pub trait KeyReader {
    /// Wait up to `timeout` for a key; `None` when nothing usable arrived
    fn read_key(&mut self, timeout: Duration) -> Option<Key>;
}

/// Renderer and key reader backed by ncurses
pub struct CursesRenderer {
    crt: Crt,
}

impl CursesRenderer {
    pub fn new(crt: Crt) -> Self {
        CursesRenderer { crt }
    }

    /// Restore the terminal
    pub fn done(&mut self) {
        self.crt.done();
    }
}

impl Renderer for CursesRenderer {
    fn paint(&mut self, frame: &Frame) {
        let crt = &self.crt;
        crt.clear();

        // Last row belongs to the function bar
        let body_rows = (crt.height() - 1).max(0) as usize;
        for (y, line) in frame.lines.iter().take(body_rows).enumerate() {
            crt.print_colored(y as i32, 1, line.color, &line.text);
        }
        if crt.height() > 0 {
            frame.function_bar.draw(crt, crt.height() - 1);
        }

        crt.refresh();
    }
}

impl KeyReader for CursesRenderer {
    fn read_key(&mut self, timeout: Duration) -> Option<Key> {
        self.crt.set_timeout(timeout.as_millis().min(i32::MAX as u128) as i32);
        self.crt.read_key().and_then(translate_key)
    }
}
