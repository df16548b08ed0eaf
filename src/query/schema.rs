//! Declarative field schema for definition files.
//!
//! Each field declares its name, kind, whether it is required, an optional
//! default and an optional validator. A `Schema` is assembled with a
//! builder and resolves a parsed TOML table into typed `Fields`.

use std::collections::HashMap;
use std::fmt;

/// Value kinds a field may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Int,
    Bool,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::String => write!(f, "string"),
            FieldKind::Int => write!(f, "integer"),
            FieldKind::Bool => write!(f, "boolean"),
        }
    }
}

/// A resolved field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Int(i64),
    Bool(bool),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::String(_) => FieldKind::String,
            FieldValue::Int(_) => FieldKind::Int,
            FieldValue::Bool(_) => FieldKind::Bool,
        }
    }

    fn from_toml(kind: FieldKind, value: &toml::Value) -> Option<Self> {
        match (kind, value) {
            (FieldKind::String, toml::Value::String(s)) => Some(FieldValue::String(s.clone())),
            (FieldKind::Int, toml::Value::Integer(i)) => Some(FieldValue::Int(*i)),
            (FieldKind::Bool, toml::Value::Boolean(b)) => Some(FieldValue::Bool(*b)),
            _ => None,
        }
    }
}

/// Rejects a value with a human-readable reason.
pub type Validator = fn(&FieldValue) -> Result<(), String>;

#[derive(Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<FieldValue>,
    pub validator: Option<Validator>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("malformed definition: {0}")]
    Syntax(String),

    #[error("required key not found: {0}")]
    Missing(&'static str),

    #[error("key {field} must be a {expected}")]
    WrongType {
        field: &'static str,
        expected: FieldKind,
    },

    #[error("invalid value for key {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },

    #[error("no value or default for key: {0}")]
    NoDefault(&'static str),
}

/// An ordered set of field declarations.
#[derive(Clone)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

#[derive(Default)]
pub struct SchemaBuilder {
    fields: Vec<FieldSpec>,
}

impl SchemaBuilder {
    /// Declare a field that must be present.
    pub fn required(mut self, name: &'static str, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec {
            name,
            kind,
            required: true,
            default: None,
            validator: None,
        });
        self
    }

    /// Declare a field that falls back to `default` when absent.
    pub fn optional(mut self, name: &'static str, default: FieldValue) -> Self {
        self.fields.push(FieldSpec {
            name,
            kind: default.kind(),
            required: false,
            default: Some(default),
            validator: None,
        });
        self
    }

    /// Attach a validator to the most recently declared field.
    pub fn validate(mut self, validator: Validator) -> Self {
        if let Some(last) = self.fields.last_mut() {
            last.validator = Some(validator);
        }
        self
    }

    pub fn build(self) -> Schema {
        Schema {
            fields: self.fields,
        }
    }
}

/// Typed values produced by `Schema::resolve`.
#[derive(Debug, Clone)]
pub struct Fields {
    values: HashMap<&'static str, FieldValue>,
}

impl Fields {
    pub fn string(&self, name: &'static str) -> Result<&str, SchemaError> {
        match self.values.get(name) {
            Some(FieldValue::String(s)) => Ok(s.as_str()),
            Some(_) => Err(SchemaError::WrongType {
                field: name,
                expected: FieldKind::String,
            }),
            None => Err(SchemaError::Missing(name)),
        }
    }

    pub fn int(&self, name: &'static str) -> Result<i64, SchemaError> {
        match self.values.get(name) {
            Some(FieldValue::Int(i)) => Ok(*i),
            Some(_) => Err(SchemaError::WrongType {
                field: name,
                expected: FieldKind::Int,
            }),
            None => Err(SchemaError::Missing(name)),
        }
    }

    pub fn bool(&self, name: &'static str) -> Result<bool, SchemaError> {
        match self.values.get(name) {
            Some(FieldValue::Bool(b)) => Ok(*b),
            Some(_) => Err(SchemaError::WrongType {
                field: name,
                expected: FieldKind::Bool,
            }),
            None => Err(SchemaError::Missing(name)),
        }
    }
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Keys present in `table` that no field declares.
    pub fn unknown_keys<'a>(&self, table: &'a toml::Table) -> Vec<&'a str> {
        table
            .keys()
            .filter(|k| !self.fields.iter().any(|f| f.name == k.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Resolve every declared field from `table`, applying defaults and
    /// validators in declaration order.
    pub fn resolve(&self, table: &toml::Table) -> Result<Fields, SchemaError> {
        let mut values = HashMap::with_capacity(self.fields.len());

        for spec in &self.fields {
            let value = match table.get(spec.name) {
                Some(raw) => FieldValue::from_toml(spec.kind, raw).ok_or(SchemaError::WrongType {
                    field: spec.name,
                    expected: spec.kind,
                })?,
                None if spec.required => return Err(SchemaError::Missing(spec.name)),
                None => spec
                    .default
                    .clone()
                    .ok_or(SchemaError::NoDefault(spec.name))?,
            };

            if let Some(validator) = spec.validator {
                validator(&value).map_err(|message| SchemaError::Invalid {
                    field: spec.name,
                    message,
                })?;
            }

            values.insert(spec.name, value);
        }

        Ok(Fields { values })
    }
}
