//! Observable engine events
//!
//! Events are explicit and typed; one log line corresponds to one
//! event. Validation failures are not events: they are returned to
//! the caller as structured values.

use std::fmt;

/// Observable events in the modeling engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A schema finished compiling and is ready for use.
    SchemaCompiled,
    /// Schema compilation was rejected with a configuration error.
    SchemaCompileFailed,
    /// A record set was truncated in place by pagination.
    SetTruncated,
    /// A record set was emptied by reset.
    SetCleared,
}

impl Event {
    /// Returns the event name string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::SchemaCompiled => "SCHEMA_COMPILED",
            Event::SchemaCompileFailed => "SCHEMA_COMPILE_FAILED",
            Event::SetTruncated => "SET_TRUNCATED",
            Event::SetCleared => "SET_CLEARED",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
