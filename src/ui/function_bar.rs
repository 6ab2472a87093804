//! FunctionBar - key labels at the bottom of the screen
//!
//! Keys are drawn in the FunctionKey color, labels in the FunctionBar color,
//! with no padding between key-label pairs.

use super::crt::ColorElement;
use super::Crt;
use crate::core::Mode;
use ncurses::*;

const BROWSE_FUNCTIONS: [(&str, &str); 6] = [
    ("↑/k", "Up "),
    ("↓/j", "Down "),
    ("Enter", "Kill "),
    ("/", "Filter "),
    ("d", "Details "),
    ("q", "Quit "),
];

const FILTER_FUNCTIONS: [(&str, &str); 4] = [
    ("↑/↓", "Move "),
    ("Enter", "Kill "),
    ("Bksp", "Erase "),
    ("Esc", "Done "),
];

const CONFIRM_FUNCTIONS: [(&str, &str); 2] = [("y", "Kill "), ("n", "Cancel ")];

/// Function bar at the bottom of the screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionBar {
    pub functions: Vec<(String, String)>,
}

impl FunctionBar {
    fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        FunctionBar {
            functions: pairs
                .iter()
                .map(|(k, v)| (format!(" {}", k), format!(" {}", v)))
                .collect(),
        }
    }

    /// Key help for the given mode
    pub fn for_mode(mode: &Mode) -> Self {
        match mode {
            Mode::Browse | Mode::Exiting => FunctionBar::from_pairs(&BROWSE_FUNCTIONS),
            Mode::Filtering => FunctionBar::from_pairs(&FILTER_FUNCTIONS),
            Mode::ConfirmKill(_) => FunctionBar::from_pairs(&CONFIRM_FUNCTIONS),
        }
    }

    /// Plain text of the bar, as it appears on screen
    #[cfg(test)]
    pub fn text(&self) -> String {
        self.functions
            .iter()
            .map(|(key, label)| format!("{}{}", key, label))
            .collect()
    }

    /// Draw the function bar on row `y`
    pub fn draw(&self, crt: &Crt, y: i32) {
        let width = crt.width();
        let bar_color = crt.color(ColorElement::FunctionBar);
        let key_color = crt.color(ColorElement::FunctionKey);

        crt.fill_line(y, ColorElement::FunctionBar);

        let mut x = 0i32;
        for (key, label) in &self.functions {
            if x >= width {
                break;
            }

            mv(y, x);
            attrset(key_color);
            let _ = addstr(key);
            x += key.chars().count() as i32;

            attrset(bar_color);
            let _ = addstr(label);
            x += label.chars().count() as i32;
        }
        attrset(A_NORMAL);
    }
}
