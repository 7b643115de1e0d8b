//! Session domain module.
//!
//! This module contains the per-session state mirrored from the remote
//! authority, the turn log, the bounded undo history and the single
//! in-flight request guard.
//!
//! # Module Structure
//!
//! - `message`: Turn types (`Turn`, `TurnAuthor`, `AudioTiming`)
//! - `model`: Session state (`SessionState`, `SessionView`)
//! - `history`: Bounded LIFO snapshot store (`HistoryStack`, `HistoryEntry`)
//! - `busy`: Single in-flight request guard (`BusyFlag`, `BusyPermit`)
//!
//! # Usage
//!
//! ```ignore
//! use mindshift_core::session::{SessionState, Turn, HistoryStack, BusyFlag};
//! ```

mod busy;
mod history;
mod message;
mod model;

pub use busy::{BusyFlag, BusyPermit};
pub use history::{DEFAULT_HISTORY_CAPACITY, HistoryEntry, HistoryStack};
pub use message::{AudioTiming, Turn, TurnAuthor};
pub use model::{SessionState, SessionView};
