//! Schema-driven record modeling and validation
//!
//! # Design Principles
//!
//! - Schemas compile once and are immutable afterward; every
//!   configuration problem is fatal at compile time.
//! - Coercion is a fixed, deterministic table: the same raw input
//!   always maps to the same canonical value, and uncoercible input
//!   falls back to the field default instead of erroring.
//! - Validation is a full scan: every field and every rule runs, and
//!   nested failures are merged under re-keyed entries rather than
//!   hiding sibling failures.
//! - Records are shared by reference; record sets alias entries
//!   instead of cloning them.

mod coerce;
mod descriptor;
mod errors;
mod record;
mod record_set;
mod rules;
mod typedef;
mod value;

pub use descriptor::{FieldDescriptor, RuleDescriptor, TypeSpec};
pub use errors::{
    messages, ConfigError, ConfigResult, Severity, ValidationError, ValidationFailure,
};
pub use record::Record;
pub use record_set::{EntryId, RecordSet};
pub use rules::{CompiledRule, PredicateFn, RuleViolation};
pub use typedef::{
    CoerceFn, ColumnBinding, FieldType, GetterFn, ModelSchema, SchemaBuilder, SetterFn,
    TypeDefinition,
};
pub use value::{FieldValue, Input, SharedRecord};
