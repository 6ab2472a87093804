//! Core module containing the session model
//!
//! This module contains:
//! - ProcessRecord: a process listening on a port
//! - Enumerator: turns raw listening sockets into a sorted process list
//! - Filters: command line and interactive filters
//! - Selection: clamped selection and page windows
//! - Session: the modal state machine
//! - Settings: runtime configuration

mod enumerator;
mod filter;
mod process;
mod selection;
mod session;
mod settings;

pub use enumerator::*;
pub use filter::*;
pub use process::*;
pub use selection::*;
pub use session::*;
pub use settings::*;

#[cfg(test)]
pub(crate) use enumerator::tests as enumerator_tests;
