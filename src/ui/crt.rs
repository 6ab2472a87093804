//! CRT - Terminal handling
//!
//! Owns the ncurses screen: setup and teardown, the color table and key
//! reading. ncurses state is per thread, so a `Crt` must stay on the thread
//! that created it.

use std::io::{self, IsTerminal};

use anyhow::bail;
use ncurses::CURSOR_VISIBILITY::{CURSOR_INVISIBLE, CURSOR_VISIBLE};
use ncurses::*;

use crate::core::{ColorScheme, Key};

/// Ctrl-C when it reaches us as a key instead of a signal
const KEY_CTRL_C: i32 = 3;
const KEY_ESC: i32 = 27;
const KEY_DEL: i32 = 127;
const KEY_CTRL_H: i32 = 8;

/// Color elements for the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ColorElement {
    DefaultColor = 0,
    Title,
    Tagline,
    Banner,
    Selection,
    Details,
    PageIndicator,
    FilterBar,
    Dialog,
    DialogEmphasis,
    Status,
    Hint,
    FunctionBar,
    FunctionKey,
    LastColorElement,
}

const PAIR_CYAN: i16 = 1;
const PAIR_GREEN: i16 = 2;
const PAIR_YELLOW: i16 = 3;
const PAIR_RED: i16 = 4;
const PAIR_BLACK_CYAN: i16 = 5;

/// CRT - Terminal handler
pub struct Crt {
    colors: Vec<attr_t>,
    screen_width: i32,
    screen_height: i32,
    active: bool,
}

impl Crt {
    /// Initialize the terminal
    pub fn new(scheme: ColorScheme) -> anyhow::Result<Self> {
        ensure_terminal(io::stdin().is_terminal(), io::stdout().is_terminal())?;

        // Locale must be set before initscr for the page dots and arrows
        unsafe {
            libc::setlocale(libc::LC_CTYPE, b"\0".as_ptr() as *const libc::c_char);
        }

        initscr();
        noecho();
        cbreak();
        curs_set(CURSOR_INVISIBLE);
        keypad(stdscr(), true);

        if has_colors() {
            start_color();
            use_default_colors();
        }

        let mut crt = Crt {
            colors: vec![A_NORMAL; ColorElement::LastColorElement as usize],
            screen_width: 0,
            screen_height: 0,
            active: true,
        };
        crt.set_colors(scheme);
        crt.update_size();

        Ok(crt)
    }

    /// Set up color pairs for a color scheme
    pub fn set_colors(&mut self, scheme: ColorScheme) {
        use ColorElement::*;

        let monochrome = matches!(scheme, ColorScheme::Monochrome) || !has_colors();
        if monochrome {
            for color in &mut self.colors {
                *color = A_NORMAL;
            }
            self.colors[Title as usize] = A_BOLD;
            self.colors[Selection as usize] = A_REVERSE;
            self.colors[Details as usize] = A_DIM;
            self.colors[Dialog as usize] = A_BOLD;
            self.colors[DialogEmphasis as usize] = A_BOLD | A_REVERSE;
            self.colors[Hint as usize] = A_DIM;
            self.colors[FunctionBar as usize] = A_REVERSE;
            self.colors[FunctionKey as usize] = A_BOLD;
            return;
        }

        init_pair(PAIR_CYAN, COLOR_CYAN, -1);
        init_pair(PAIR_GREEN, COLOR_GREEN, -1);
        init_pair(PAIR_YELLOW, COLOR_YELLOW, -1);
        init_pair(PAIR_RED, COLOR_RED, -1);
        init_pair(PAIR_BLACK_CYAN, COLOR_BLACK, COLOR_CYAN);

        self.colors[DefaultColor as usize] = A_NORMAL;
        self.colors[Title as usize] = COLOR_PAIR(PAIR_YELLOW) | A_BOLD;
        self.colors[Tagline as usize] = A_NORMAL;
        self.colors[Banner as usize] = COLOR_PAIR(PAIR_CYAN);
        self.colors[Selection as usize] = COLOR_PAIR(PAIR_BLACK_CYAN) | A_BOLD;
        self.colors[Details as usize] = A_DIM;
        self.colors[PageIndicator as usize] = COLOR_PAIR(PAIR_CYAN);
        self.colors[FilterBar as usize] = COLOR_PAIR(PAIR_YELLOW);
        self.colors[Dialog as usize] = A_BOLD;
        self.colors[DialogEmphasis as usize] = COLOR_PAIR(PAIR_RED) | A_BOLD;
        self.colors[Status as usize] = COLOR_PAIR(PAIR_GREEN);
        self.colors[Hint as usize] = COLOR_PAIR(PAIR_YELLOW) | A_DIM;
        self.colors[FunctionBar as usize] = COLOR_PAIR(PAIR_BLACK_CYAN);
        self.colors[FunctionKey as usize] = A_NORMAL;
    }

    /// Get color attribute for an element
    pub fn color(&self, element: ColorElement) -> attr_t {
        self.colors
            .get(element as usize)
            .copied()
            .unwrap_or(A_NORMAL)
    }

    /// Update screen dimensions
    pub fn update_size(&mut self) {
        getmaxyx(stdscr(), &mut self.screen_height, &mut self.screen_width);
    }

    pub fn width(&self) -> i32 {
        self.screen_width
    }

    pub fn height(&self) -> i32 {
        self.screen_height
    }

    /// Block in `read_key` for at most `timeout_ms`
    pub fn set_timeout(&self, timeout_ms: i32) {
        ncurses::timeout(timeout_ms.clamp(0, 25500));
    }

    /// Read a key from input
    pub fn read_key(&mut self) -> Option<i32> {
        let ch = getch();
        if ch == ERR {
            return None;
        }
        if ch == KEY_RESIZE {
            self.update_size();
        }
        Some(ch)
    }

    /// Clear the screen
    pub fn clear(&self) {
        clear();
    }

    /// Refresh the screen
    pub fn refresh(&self) {
        refresh();
    }

    /// Print a string with attributes, cut to the screen width
    pub fn print_at(&self, y: i32, x: i32, attr: attr_t, text: &str) {
        if y < 0 || y >= self.screen_height || x >= self.screen_width {
            return;
        }
        let room = (self.screen_width - x).max(0) as usize;
        let clipped: String = text.chars().take(room).collect();
        attrset(attr);
        let _ = mvaddstr(y, x, &clipped);
        attrset(A_NORMAL);
    }

    /// Print a string with a specific color element
    pub fn print_colored(&self, y: i32, x: i32, element: ColorElement, text: &str) {
        self.print_at(y, x, self.color(element), text);
    }

    /// Fill a whole row with spaces in the given color
    pub fn fill_line(&self, y: i32, element: ColorElement) {
        mv(y, 0);
        attrset(self.color(element));
        for _ in 0..self.screen_width {
            addch(' ' as u32);
        }
        attrset(A_NORMAL);
    }

    /// Clean up terminal
    pub fn done(&mut self) {
        if self.active {
            curs_set(CURSOR_VISIBLE);
            endwin();
            self.active = false;
        }
    }
}

impl Drop for Crt {
    fn drop(&mut self) {
        self.done();
    }
}

/// ncurses needs a terminal on both ends; fail before it takes over the screen
fn ensure_terminal(stdin: bool, stdout: bool) -> anyhow::Result<()> {
    if !stdin {
        bail!("standard input is not a terminal");
    }
    if !stdout {
        bail!("standard output is not a terminal");
    }
    Ok(())
}

/// Translate an ncurses key code into a session key
pub fn translate_key(ch: i32) -> Option<Key> {
    match ch {
        KEY_CTRL_C => Some(Key::Interrupt),
        KEY_ESC => Some(Key::Escape),
        KEY_UP => Some(Key::Up),
        KEY_DOWN => Some(Key::Down),
        10 | 13 | KEY_ENTER => Some(Key::Enter),
        KEY_BACKSPACE | KEY_DEL | KEY_CTRL_H => Some(Key::Backspace),
        ch if (0x20..0x7f).contains(&ch) => char::from_u32(ch as u32).map(Key::Char),
        // Wide characters come through as their code point
        ch if ch >= 0xa0 && !CURSES_KEY_CODES.contains(&ch) => {
            char::from_u32(ch as u32).map(Key::Char)
        }
        _ => None,
    }
}

/// Range ncurses reserves for function and cursor keys
const CURSES_KEY_CODES: std::ops::RangeInclusive<i32> = 0o401..=0o777;
