//! UI module
//!
//! This module contains all UI-related components:
//! - CRT: Terminal abstraction using ncurses
//! - Frame: Pure description of what the screen shows
//! - Screen: Renderer/KeyReader traits and the ncurses implementation
//! - FunctionBar: Key help at the bottom of the screen
//! - Coordinator: The event loop that owns the session

mod coordinator;
mod crt;
mod frame;
mod function_bar;
mod screen;

pub use coordinator::*;
pub use crt::*;
pub use frame::*;
pub use function_bar::*;
pub use screen::*;
