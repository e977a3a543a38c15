//! Validation-rule compiler and the builtin named-rule registry
//!
//! Rule descriptors are compiled once at schema-configuration time;
//! an unresolvable name or malformed parameter list is a fatal
//! `ConfigError`. The compiled rule is the closure actually invoked
//! by `Record::validate`.
//!
//! Registry semantics:
//! - The registry is a fixed, process-wide table; rules cannot be
//!   added or removed at runtime.
//! - `required` disables the default-value short-circuit.
//! - `match` compares against another field's current value on the
//!   same record.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use super::descriptor::RuleDescriptor;
use super::errors::{messages, ConfigError, ConfigResult, ValidationFailure};
use super::record::Record;
use super::value::FieldValue;

/// A validation predicate.
///
/// Returns `Ok(true)` to pass, `Ok(false)` to fail with the generic
/// custom-validation message, or a described [`RuleViolation`].
pub type PredicateFn = fn(&Record, &FieldValue, &[Value]) -> Result<bool, RuleViolation>;

/// A described validation failure raised by a predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleViolation {
    /// Failure message code.
    pub message: String,
    /// Rule-specific context, if any.
    pub additional: Option<Value>,
}

impl RuleViolation {
    /// Creates a violation without additional context.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            additional: None,
        }
    }

    /// Creates a violation carrying additional context.
    pub fn with_additional(message: impl Into<String>, additional: Value) -> Self {
        Self {
            message: message.into(),
            additional: Some(additional),
        }
    }
}

/// A compiled validation rule.
///
/// Captures the resolved predicate, its positional parameters, and
/// whether the rule bypasses the default-value short-circuit.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    name: Option<String>,
    predicate: PredicateFn,
    params: Vec<Value>,
    required: bool,
}

impl CompiledRule {
    /// Compiles a rule descriptor.
    ///
    /// Named rules resolve against the builtin registry; parameter
    /// shapes are checked here so misconfiguration surfaces at schema
    /// setup, not at first validation.
    pub fn compile(descriptor: &RuleDescriptor) -> ConfigResult<CompiledRule> {
        match descriptor {
            RuleDescriptor::Custom(predicate) => Ok(CompiledRule {
                name: None,
                predicate: *predicate,
                params: Vec::new(),
                required: false,
            }),
            RuleDescriptor::Named(name) => Self::compile_named(name, &[]),
            RuleDescriptor::NamedWithParams(name, params) => Self::compile_named(name, params),
        }
    }

    fn compile_named(name: &str, params: &[Value]) -> ConfigResult<CompiledRule> {
        let predicate =
            lookup(name).ok_or_else(|| ConfigError::UnknownRule(name.to_string()))?;
        check_params(name, params)?;
        Ok(CompiledRule {
            name: Some(name.to_string()),
            predicate,
            params: params.to_vec(),
            required: name == "required",
        })
    }

    /// The registry name, if this rule came from a named descriptor.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Runs the rule against a field value.
    ///
    /// A value equal to the field default passes automatically unless
    /// the rule is `required`.
    pub fn apply(
        &self,
        record: &Record,
        value: &FieldValue,
        default: &FieldValue,
    ) -> Result<(), ValidationFailure> {
        if !self.required && value == default {
            return Ok(());
        }
        match (self.predicate)(record, value, &self.params) {
            Ok(true) => Ok(()),
            Ok(false) => Err(ValidationFailure::new(
                messages::CUSTOM_VALIDATION_FAILED,
                value.data_value(),
            )),
            Err(violation) => Err(ValidationFailure {
                message: violation.message,
                value: value.data_value(),
                additional: violation.additional,
            }),
        }
    }
}

/// Resolves a rule name against the builtin registry.
fn lookup(name: &str) -> Option<PredicateFn> {
    match name {
        "required" => Some(rule_required),
        "email" => Some(rule_email),
        "min_length" => Some(rule_min_length),
        "max_length" => Some(rule_max_length),
        "match" => Some(rule_match),
        _ => None,
    }
}

/// Compile-time parameter checks per rule.
fn check_params(name: &str, params: &[Value]) -> ConfigResult<()> {
    match name {
        "min_length" | "max_length" => match params.first() {
            None => Err(ConfigError::MissingRuleParam {
                rule: name.to_string(),
                param: "length",
            }),
            Some(p) if p.as_u64().is_none() => {
                Err(ConfigError::MalformedRule(name.to_string()))
            }
            Some(_) => Ok(()),
        },
        "match" => match params.first() {
            None => Err(ConfigError::MissingRuleParam {
                rule: name.to_string(),
                param: "field",
            }),
            Some(p) if p.as_str().is_none() => {
                Err(ConfigError::MalformedRule(name.to_string()))
            }
            Some(_) => Ok(()),
        },
        _ => Ok(()),
    }
}

fn rule_required(_record: &Record, value: &FieldValue, _params: &[Value]) -> Result<bool, RuleViolation> {
    match value {
        FieldValue::Null => Err(RuleViolation::new(messages::VALUE_REQUIRED)),
        FieldValue::Str(s) if s.is_empty() => Err(RuleViolation::new(messages::VALUE_REQUIRED)),
        _ => Ok(true),
    }
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap())
}

fn rule_email(_record: &Record, value: &FieldValue, _params: &[Value]) -> Result<bool, RuleViolation> {
    match value {
        FieldValue::Str(s) if email_pattern().is_match(s) => Ok(true),
        _ => Err(RuleViolation::new(messages::VALUE_INVALID_EMAIL)),
    }
}

fn rule_min_length(_record: &Record, value: &FieldValue, params: &[Value]) -> Result<bool, RuleViolation> {
    let min = params.first().and_then(Value::as_u64).unwrap_or(0) as usize;
    match value {
        FieldValue::Str(s) if s.chars().count() >= min => Ok(true),
        _ => Err(RuleViolation::new(messages::VALUE_TOO_SHORT)),
    }
}

fn rule_max_length(_record: &Record, value: &FieldValue, params: &[Value]) -> Result<bool, RuleViolation> {
    let max = params.first().and_then(Value::as_u64).unwrap_or(0) as usize;
    match value {
        FieldValue::Str(s) if s.chars().count() <= max => Ok(true),
        _ => Err(RuleViolation::new(messages::VALUE_TOO_LONG)),
    }
}

/// Field-to-field comparison against the record's current state.
fn rule_match(record: &Record, value: &FieldValue, params: &[Value]) -> Result<bool, RuleViolation> {
    // Param shape was checked at compile time.
    let other_field = params.first().and_then(Value::as_str).unwrap_or_default();
    let other_value = record.get(other_field).unwrap_or(FieldValue::Null);
    if *value == other_value {
        Ok(true)
    } else {
        Err(RuleViolation::with_additional(
            messages::VALUES_NOT_MATCHING,
            other_value.data_value(),
        ))
    }
}
