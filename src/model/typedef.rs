//! Compiled type definitions and schema compilation
//!
//! Compilation principles:
//! - Every configuration problem surfaces here, before any record
//!   exists: unknown type tags, unresolvable rule names, duplicate
//!   primary keys.
//! - A compiled schema is immutable and shared (`Arc`) by every
//!   record and record set bound to it.
//! - Accessor overrides are resolved into a per-field lookup table at
//!   compile time; nothing is probed by name at call time.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::coerce;
use super::descriptor::{FieldDescriptor, RuleDescriptor, TypeSpec};
use super::errors::{ConfigError, ConfigResult};
use super::record::Record;
use super::rules::CompiledRule;
use super::value::{FieldValue, Input};
use crate::observability::{Event, Logger, Severity};

/// Custom coercion function: maps raw input to a canonical value,
/// given the field default as fallback.
pub type CoerceFn = fn(&Input, &FieldValue) -> FieldValue;

/// Custom getter override: derives the returned value from the raw
/// stored value.
pub type GetterFn = fn(&Record, &FieldValue) -> FieldValue;

/// Custom setter override: invoked with the raw input and the field
/// default. Returning `None` stores the default; the override may
/// also write sibling fields through the record handle.
pub type SetterFn = fn(&mut Record, &Input, &FieldValue) -> Option<FieldValue>;

/// Supported field types after compilation.
#[derive(Debug, Clone)]
pub enum FieldType {
    /// UTF-8 string.
    String,
    /// 64-bit signed integer.
    Integer,
    /// 64-bit floating point.
    Float,
    /// Boolean.
    Boolean,
    /// Point in time (UTC).
    Date,
    /// JSON array, elements uncoerced.
    Array,
    /// JSON object, kept verbatim.
    Object,
    /// Member of a fixed set of allowed values.
    Enum,
    /// Anything, verbatim.
    Mixed,
    /// Nested schema: object input builds a record, array input a
    /// record set.
    Model(Arc<ModelSchema>),
    /// Custom coercion function.
    Custom(CoerceFn),
}

impl FieldType {
    /// Parses a primitive type tag.
    ///
    /// Unrecognized tags fail schema compilation; they are never
    /// deferred to first write.
    pub fn parse_tag(tag: &str) -> ConfigResult<FieldType> {
        match tag {
            "string" => Ok(FieldType::String),
            "integer" => Ok(FieldType::Integer),
            "float" => Ok(FieldType::Float),
            "boolean" => Ok(FieldType::Boolean),
            "date" => Ok(FieldType::Date),
            "array" => Ok(FieldType::Array),
            "object" => Ok(FieldType::Object),
            "enum" => Ok(FieldType::Enum),
            "mixed" => Ok(FieldType::Mixed),
            other => Err(ConfigError::UnknownTypeTag(other.to_string())),
        }
    }

    /// Returns the type name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Array => "array",
            FieldType::Object => "object",
            FieldType::Enum => "enum",
            FieldType::Mixed => "mixed",
            FieldType::Model(_) => "model",
            FieldType::Custom(_) => "custom",
        }
    }
}

/// How a field maps onto the persisted representation.
///
/// The three-way split keeps "persist under the field name" and
/// "exclude from persisted output" distinguishable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnBinding {
    /// Persist under the field's own name.
    FieldName,
    /// Persist under an explicit column name.
    Named(String),
    /// Exclude from persisted output.
    Omitted,
}

impl ColumnBinding {
    /// Resolves the persisted column name, `None` when omitted.
    pub fn resolve<'a>(&'a self, field: &'a str) -> Option<&'a str> {
        match self {
            ColumnBinding::FieldName => Some(field),
            ColumnBinding::Named(column) => Some(column),
            ColumnBinding::Omitted => None,
        }
    }
}

/// Compiled per-field configuration.
#[derive(Debug, Clone)]
pub struct TypeDefinition {
    field_type: FieldType,
    default_value: FieldValue,
    column: ColumnBinding,
    primary_key: bool,
    allowed_values: Vec<Value>,
    rules: Vec<CompiledRule>,
    settings: HashMap<String, Value>,
    getter: Option<GetterFn>,
    setter: Option<SetterFn>,
}

impl TypeDefinition {
    /// Normalizes a descriptor into a compiled definition.
    pub fn compile(descriptor: FieldDescriptor) -> ConfigResult<TypeDefinition> {
        let field_type = match descriptor.kind {
            TypeSpec::Tag(tag) => FieldType::parse_tag(&tag)?,
            TypeSpec::Model(schema) => FieldType::Model(schema),
            TypeSpec::Coerce(f) => FieldType::Custom(f),
        };

        let default_value = compile_default(&field_type, &descriptor.allowed, &descriptor.value);

        let mut definition = TypeDefinition {
            field_type,
            default_value,
            column: descriptor.column,
            primary_key: descriptor.primary_key,
            allowed_values: descriptor.allowed,
            rules: Vec::new(),
            settings: descriptor.settings,
            getter: descriptor.getter,
            setter: descriptor.setter,
        };
        definition.add_validation(&descriptor.validation)?;
        Ok(definition)
    }

    /// Compiles and appends validation rules in declaration order.
    ///
    /// Order affects only reporting order, never short-circuiting.
    pub fn add_validation(&mut self, rules: &[RuleDescriptor]) -> ConfigResult<()> {
        for descriptor in rules {
            self.rules.push(CompiledRule::compile(descriptor)?);
        }
        Ok(())
    }

    /// The compiled field type.
    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    /// The compiled default value.
    pub fn default_value(&self) -> &FieldValue {
        &self.default_value
    }

    /// The persisted-column binding.
    pub fn column(&self) -> &ColumnBinding {
        &self.column
    }

    /// True when this field is the schema's primary key.
    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    /// Allowed members (enum type only).
    pub fn allowed_values(&self) -> &[Value] {
        &self.allowed_values
    }

    /// Compiled validation rules, in declaration order.
    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// Looks up a free-form setting.
    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }

    /// All free-form settings.
    pub fn settings(&self) -> &HashMap<String, Value> {
        &self.settings
    }

    /// The custom getter override, if any.
    pub fn getter(&self) -> Option<GetterFn> {
        self.getter
    }

    /// The custom setter override, if any.
    pub fn setter(&self) -> Option<SetterFn> {
        self.setter
    }
}

/// Coerces the raw default through the field's own coercion table, so
/// that the stored default is already canonical.
fn compile_default(field_type: &FieldType, allowed: &[Value], raw: &Value) -> FieldValue {
    if raw.is_null() {
        return FieldValue::Null;
    }
    match field_type {
        FieldType::Model(_) => FieldValue::Null,
        FieldType::Custom(f) => f(&Input::Json(raw.clone()), &FieldValue::Null),
        primitive => coerce::coerce_json(primitive, allowed, raw).unwrap_or(FieldValue::Null),
    }
}

/// A compiled record schema: ordered field definitions plus the
/// lookup indexes derived from them.
#[derive(Debug)]
pub struct ModelSchema {
    name: String,
    fields: Vec<(String, TypeDefinition)>,
    index: HashMap<String, usize>,
    primary_key: Option<String>,
    column_index: HashMap<String, String>,
}

impl ModelSchema {
    /// Starts a schema declaration.
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// The record-kind name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up one field's definition.
    pub fn field(&self, name: &str) -> Option<&TypeDefinition> {
        self.index.get(name).map(|&i| &self.fields[i].1)
    }

    /// Iterates fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &TypeDefinition)> {
        self.fields.iter().map(|(name, def)| (name.as_str(), def))
    }

    /// Number of declared fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// True when the schema declares the field.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// The designated primary-key field, if any.
    pub fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    /// Maps a persisted column name back to its field name.
    pub fn field_for_column(&self, column: &str) -> Option<&str> {
        self.column_index.get(column).map(String::as_str)
    }
}

/// Collects field descriptors and compiles them into a shared schema.
pub struct SchemaBuilder {
    name: String,
    fields: Vec<(String, FieldDescriptor)>,
}

impl SchemaBuilder {
    /// Declares a field. Redeclaring a name replaces the earlier
    /// descriptor in place.
    pub fn field(mut self, name: impl Into<String>, descriptor: FieldDescriptor) -> Self {
        let name = name.into();
        if let Some(slot) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = descriptor;
        } else {
            self.fields.push((name, descriptor));
        }
        self
    }

    /// Compiles the declared fields into an immutable schema.
    pub fn build(self) -> ConfigResult<Arc<ModelSchema>> {
        let name = self.name;
        match Self::compile_fields(self.fields) {
            Ok((fields, index, primary_key, column_index)) => {
                let field_count = fields.len().to_string();
                Logger::log(
                    Severity::Info,
                    Event::SchemaCompiled,
                    &[("schema", name.as_str()), ("fields", &field_count)],
                );
                Ok(Arc::new(ModelSchema {
                    name,
                    fields,
                    index,
                    primary_key,
                    column_index,
                }))
            }
            Err(err) => {
                let reason = err.to_string();
                Logger::log_stderr(
                    Severity::Error,
                    Event::SchemaCompileFailed,
                    &[("schema", name.as_str()), ("error", &reason)],
                );
                Err(err)
            }
        }
    }

    #[allow(clippy::type_complexity)]
    fn compile_fields(
        descriptors: Vec<(String, FieldDescriptor)>,
    ) -> ConfigResult<(
        Vec<(String, TypeDefinition)>,
        HashMap<String, usize>,
        Option<String>,
        HashMap<String, String>,
    )> {
        let mut fields = Vec::with_capacity(descriptors.len());
        let mut index = HashMap::new();
        let mut primary_key: Option<String> = None;
        let mut column_index = HashMap::new();

        for (name, descriptor) in descriptors {
            let definition = TypeDefinition::compile(descriptor)?;

            if definition.is_primary_key() {
                if let Some(existing) = &primary_key {
                    return Err(ConfigError::DuplicatePrimaryKey {
                        existing: existing.clone(),
                        duplicate: name,
                    });
                }
                primary_key = Some(name.clone());
            }

            if let Some(column) = definition.column().resolve(&name) {
                column_index.insert(column.to_string(), name.clone());
            }

            index.insert(name.clone(), fields.len());
            fields.push((name, definition));
        }

        Ok((fields, index, primary_key, column_index))
    }
}
