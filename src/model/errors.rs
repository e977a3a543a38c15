//! Error types for the modeling engine
//!
//! Two kinds, with different lifecycles:
//! - `ConfigError`: schema misconfiguration. Always fatal, raised at
//!   schema-compile time, never recovered automatically.
//! - `ValidationError`: carries the structured, keyed, multi-valued
//!   error map produced by a full validation scan. Always recoverable
//!   by the caller.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Failure message codes surfaced in validation error entries.
pub mod messages {
    /// A `required` field resolved to null or an empty string.
    pub const VALUE_REQUIRED: &str = "VALUE_REQUIRED";
    /// A custom predicate returned false without further description.
    pub const CUSTOM_VALIDATION_FAILED: &str = "CUSTOM_VALIDATION_FAILED";
    /// The `email` rule rejected the value.
    pub const VALUE_INVALID_EMAIL: &str = "VALUE_INVALID_EMAIL";
    /// The `min_length` rule rejected the value.
    pub const VALUE_TOO_SHORT: &str = "VALUE_TOO_SHORT";
    /// The `max_length` rule rejected the value.
    pub const VALUE_TOO_LONG: &str = "VALUE_TOO_LONG";
    /// The `match` rule found the two fields unequal.
    pub const VALUES_NOT_MATCHING: &str = "VALUES_NOT_MATCHING";
}

/// Severity levels for engine errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The offending input is rejected; the caller may retry with
    /// corrected input.
    Reject,
    /// Misconfiguration; the schema is unusable.
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Result type for schema-configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Schema configuration errors
///
/// All of these are raised while a schema is being compiled, before
/// any record exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A field declared a type tag outside the supported set.
    #[error("unknown field type tag '{0}'")]
    UnknownTypeTag(String),

    /// A validation descriptor named a rule missing from the registry.
    #[error("unknown validation rule '{0}'")]
    UnknownRule(String),

    /// A named rule was given parameters of the wrong shape.
    #[error("malformed descriptor for validation rule '{0}'")]
    MalformedRule(String),

    /// A named rule is missing a parameter it requires.
    #[error("validation rule '{rule}' requires a '{param}' parameter")]
    MissingRuleParam {
        /// Rule name.
        rule: String,
        /// Name of the missing parameter.
        param: &'static str,
    },

    /// Two fields of one schema were marked as primary key.
    #[error("field '{duplicate}' marks a second primary key ('{existing}' already is one)")]
    DuplicatePrimaryKey {
        /// The field already holding the primary-key marking.
        existing: String,
        /// The field attempting the second marking.
        duplicate: String,
    },
}

impl ConfigError {
    /// Returns the severity level. Configuration errors are always fatal.
    pub fn severity(&self) -> Severity {
        Severity::Fatal
    }

    /// Returns the stable error code string.
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::UnknownTypeTag(_) => "UNKNOWN_TYPE_TAG",
            ConfigError::UnknownRule(_) => "UNKNOWN_RULE",
            ConfigError::MalformedRule(_) => "MALFORMED_RULE",
            ConfigError::MissingRuleParam { .. } => "MISSING_RULE_PARAM",
            ConfigError::DuplicatePrimaryKey { .. } => "DUPLICATE_PRIMARY_KEY",
        }
    }
}

/// One validation failure entry
///
/// `value` is the offending value rendered to JSON; `additional`
/// carries rule-specific context (the `match` rule stores the other
/// field's value there).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationFailure {
    /// Failure message code, one of [`messages`].
    pub message: String,
    /// The value that failed, rendered to JSON.
    pub value: Value,
    /// Rule-specific context, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional: Option<Value>,
}

impl ValidationFailure {
    /// Creates a failure entry without additional context.
    pub fn new(message: impl Into<String>, value: Value) -> Self {
        Self {
            message: message.into(),
            value,
            additional: None,
        }
    }

    /// Creates a failure entry carrying additional context.
    pub fn with_additional(message: impl Into<String>, value: Value, additional: Value) -> Self {
        Self {
            message: message.into(),
            value,
            additional: Some(additional),
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (value: {})", self.message, self.value)
    }
}

/// Aggregated validation error
///
/// Field-or-index key to the ordered list of failures collected for
/// that key. A validation scan never aborts early, so the map holds
/// every failure of the scan, including failures merged up from
/// nested records and record sets under re-keyed entries
/// (`"{field}_{nestedKey}"`, `"{index}_{nestedKey}"`).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationError {
    errors: BTreeMap<String, Vec<ValidationFailure>>,
}

impl ValidationError {
    /// Creates an empty error accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a failure under the given key.
    pub fn push(&mut self, key: impl Into<String>, failure: ValidationFailure) {
        self.errors.entry(key.into()).or_default().push(failure);
    }

    /// Merges another error map, re-keying every entry as
    /// `"{prefix}_{key}"`.
    pub fn merge_prefixed(&mut self, prefix: &str, other: ValidationError) {
        for (key, failures) in other.errors {
            let rekeyed = format!("{}_{}", prefix, key);
            self.errors.entry(rekeyed).or_default().extend(failures);
        }
    }

    /// True when no failure has been recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of keys carrying failures.
    pub fn key_count(&self) -> usize {
        self.errors.len()
    }

    /// The structured error map.
    pub fn errors(&self) -> &BTreeMap<String, Vec<ValidationFailure>> {
        &self.errors
    }

    /// Consumes the error, yielding the map.
    pub fn into_errors(self) -> BTreeMap<String, Vec<ValidationFailure>> {
        self.errors
    }

    /// Returns the stable error code string.
    pub fn code(&self) -> &'static str {
        "VALIDATION_FAILED"
    }

    /// Returns the severity level. Validation errors are recoverable.
    pub fn severity(&self) -> Severity {
        Severity::Reject
    }

    /// Resolves the accumulator: `Ok` when empty, `Err(self)` otherwise.
    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: validation failed for {} key(s)",
            self.severity(),
            self.code(),
            self.errors.len()
        )?;
        let mut keys = self.errors.keys();
        if let Some(first) = keys.next() {
            write!(f, " ({}", first)?;
            for key in keys {
                write!(f, ", {}", key)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}
