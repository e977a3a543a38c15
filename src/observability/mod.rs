//! Observability for the modeling engine
//!
//! Structured, deterministic JSON logging of typed engine events.
//! Validation outcomes are values returned to callers, never log
//! events.

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};
