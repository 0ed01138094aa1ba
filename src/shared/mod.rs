//! Shared state and messaging between the analysis tasks of a session
//!
//! This module provides the thread-safe result slots and the events a
//! session publishes while it runs.

pub mod messages;
pub mod state;

pub use messages::SessionEvent;
pub use state::{AnalysisSlots, Slot};
