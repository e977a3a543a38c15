//! Declarative field descriptors
//!
//! A schema is declared as a set of `FieldDescriptor`s; the compiler
//! (`SchemaBuilder::build`) normalizes them into immutable
//! `TypeDefinition`s. Descriptors carry raw JSON defaults and
//! unresolved rule names; nothing here is validated until compile
//! time.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::rules::PredicateFn;
use super::typedef::{CoerceFn, ColumnBinding, GetterFn, ModelSchema, SetterFn};

/// The declared type of a field, before compilation.
#[derive(Debug, Clone)]
pub enum TypeSpec {
    /// One of the fixed primitive type tags, parsed at compile time.
    Tag(String),
    /// A nested-schema reference.
    Model(Arc<ModelSchema>),
    /// A custom coercion function.
    Coerce(CoerceFn),
}

/// An unresolved validation-rule descriptor.
#[derive(Debug, Clone)]
pub enum RuleDescriptor {
    /// A name resolved against the builtin registry.
    Named(String),
    /// A registry name with positional parameters.
    NamedWithParams(String, Vec<Value>),
    /// A custom predicate.
    Custom(PredicateFn),
}

impl RuleDescriptor {
    /// Descriptor for a parameterless named rule.
    pub fn named(name: impl Into<String>) -> Self {
        RuleDescriptor::Named(name.into())
    }

    /// Descriptor for a named rule with positional parameters.
    pub fn with_params(name: impl Into<String>, params: Vec<Value>) -> Self {
        RuleDescriptor::NamedWithParams(name.into(), params)
    }

    /// Descriptor for a custom predicate.
    pub fn custom(predicate: PredicateFn) -> Self {
        RuleDescriptor::Custom(predicate)
    }
}

/// Declarative configuration of one field.
///
/// Defaults: null default value, column equal to the field name, not
/// a primary key, no rules, no enum members, empty settings, no
/// accessor overrides.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Declared type.
    pub kind: TypeSpec,
    /// Raw default value.
    pub value: Value,
    /// Persisted-column binding.
    pub column: ColumnBinding,
    /// Primary-key marking.
    pub primary_key: bool,
    /// Unresolved validation rules, in declaration order.
    pub validation: Vec<RuleDescriptor>,
    /// Allowed members (enum type only).
    pub allowed: Vec<Value>,
    /// Free-form per-field settings.
    pub settings: HashMap<String, Value>,
    /// Custom getter override.
    pub getter: Option<GetterFn>,
    /// Custom setter override.
    pub setter: Option<SetterFn>,
}

impl FieldDescriptor {
    /// Creates a descriptor with the given type and all defaults.
    pub fn new(kind: TypeSpec) -> Self {
        Self {
            kind,
            value: Value::Null,
            column: ColumnBinding::FieldName,
            primary_key: false,
            validation: Vec::new(),
            allowed: Vec::new(),
            settings: HashMap::new(),
            getter: None,
            setter: None,
        }
    }

    /// A field with a string type tag (resolved at compile time).
    pub fn tagged(tag: impl Into<String>) -> Self {
        Self::new(TypeSpec::Tag(tag.into()))
    }

    /// A `string` field.
    pub fn string() -> Self {
        Self::tagged("string")
    }

    /// An `integer` field.
    pub fn integer() -> Self {
        Self::tagged("integer")
    }

    /// A `float` field.
    pub fn float() -> Self {
        Self::tagged("float")
    }

    /// A `boolean` field.
    pub fn boolean() -> Self {
        Self::tagged("boolean")
    }

    /// A `date` field.
    pub fn date() -> Self {
        Self::tagged("date")
    }

    /// An `array` field.
    pub fn array() -> Self {
        Self::tagged("array")
    }

    /// An `object` field.
    pub fn object() -> Self {
        Self::tagged("object")
    }

    /// A `mixed` field (accepts anything verbatim).
    pub fn mixed() -> Self {
        Self::tagged("mixed")
    }

    /// An `enum` field restricted to the given members.
    pub fn enumeration(allowed: Vec<Value>) -> Self {
        let mut descriptor = Self::tagged("enum");
        descriptor.allowed = allowed;
        descriptor
    }

    /// A nested-schema field. Object input builds a nested record,
    /// array input a nested record set.
    pub fn model(schema: Arc<ModelSchema>) -> Self {
        Self::new(TypeSpec::Model(schema))
    }

    /// A field coerced by a custom function.
    pub fn custom(coerce: CoerceFn) -> Self {
        Self::new(TypeSpec::Coerce(coerce))
    }

    /// Sets the default value.
    pub fn default(mut self, value: Value) -> Self {
        self.value = value;
        self
    }

    /// Persists the field under an explicit column name.
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = ColumnBinding::Named(column.into());
        self
    }

    /// Excludes the field from persisted output.
    pub fn omit_column(mut self) -> Self {
        self.column = ColumnBinding::Omitted;
        self
    }

    /// Marks the field as the primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Appends one validation rule.
    pub fn rule(mut self, rule: RuleDescriptor) -> Self {
        self.validation.push(rule);
        self
    }

    /// Appends validation rules in declaration order.
    pub fn rules(mut self, rules: Vec<RuleDescriptor>) -> Self {
        self.validation.extend(rules);
        self
    }

    /// Stores a free-form setting.
    pub fn setting(mut self, key: impl Into<String>, value: Value) -> Self {
        self.settings.insert(key.into(), value);
        self
    }

    /// Installs a custom getter override.
    pub fn getter(mut self, getter: GetterFn) -> Self {
        self.getter = Some(getter);
        self
    }

    /// Installs a custom setter override.
    pub fn setter(mut self, setter: SetterFn) -> Self {
        self.setter = Some(setter);
        self
    }
}
