//! Schema validation
//!
//! An optional contract a table checks on insert and update: a list of
//! required fields plus a declared type per field. Values are never coerced;
//! the first mismatch is reported with the field name and expected type.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::{LineDbError, Result};
use crate::record::Record;

/// Declared type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Int,
    Float,
    Bool,
    Array,
    Object,
    Null,
    /// Any JSON number
    Numeric,
    /// String, number or bool
    Scalar,
}

impl FieldType {
    /// Check a value against this type
    pub fn matches(self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Int => value.is_i64() || value.is_u64(),
            FieldType::Float => value.is_f64(),
            FieldType::Bool => value.is_boolean(),
            FieldType::Array => value.is_array(),
            FieldType::Object => value.is_object(),
            FieldType::Null => value.is_null(),
            FieldType::Numeric => value.is_number(),
            FieldType::Scalar => value.is_string() || value.is_number() || value.is_boolean(),
        }
    }

    fn name(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Bool => "bool",
            FieldType::Array => "array",
            FieldType::Object => "object",
            FieldType::Null => "null",
            FieldType::Numeric => "numeric",
            FieldType::Scalar => "scalar",
        }
    }
}

/// A field type plus its nullability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub ty: FieldType,
    pub nullable: bool,
}

impl FieldSpec {
    pub fn matches(&self, value: &Value) -> bool {
        (self.nullable && value.is_null()) || self.ty.matches(value)
    }
}

impl fmt::Display for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            write!(f, "?{}", self.ty.name())
        } else {
            f.write_str(self.ty.name())
        }
    }
}

/// Parses `"int"`, `"?string"`, ... A leading `?` marks the field nullable.
impl FromStr for FieldSpec {
    type Err = LineDbError;

    fn from_str(s: &str) -> Result<Self> {
        let (nullable, name) = match s.trim().strip_prefix('?') {
            Some(rest) => (true, rest),
            None => (false, s.trim()),
        };

        let ty = match name.to_ascii_lowercase().as_str() {
            "string" => FieldType::String,
            "int" | "integer" => FieldType::Int,
            "float" | "double" => FieldType::Float,
            "bool" | "boolean" => FieldType::Bool,
            "array" => FieldType::Array,
            "object" => FieldType::Object,
            "null" => FieldType::Null,
            "numeric" => FieldType::Numeric,
            "scalar" => FieldType::Scalar,
            other => {
                return Err(LineDbError::Config(format!(
                    "unknown field type '{}'",
                    other
                )))
            }
        };

        Ok(Self { ty, nullable })
    }
}

/// Validation contract for a table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    required: Vec<String>,
    fields: BTreeMap<String, FieldSpec>,
}

impl Schema {
    /// Build a schema from required field names and `field -> type string` pairs
    pub fn new<R, S, T>(required: R, field_types: impl IntoIterator<Item = (S, T)>) -> Result<Self>
    where
        R: IntoIterator,
        R::Item: Into<String>,
        S: Into<String>,
        T: AsRef<str>,
    {
        let mut fields: BTreeMap<String, FieldSpec> = BTreeMap::new();
        for (name, ty) in field_types {
            fields.insert(name.into(), ty.as_ref().parse::<FieldSpec>()?);
        }

        Ok(Self {
            required: required.into_iter().map(Into::into).collect(),
            fields,
        })
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    /// Validate a full record.
    ///
    /// Required fields must be present. Declared fields, when present, must
    /// match their type. Undeclared fields are accepted as-is.
    pub fn validate(&self, record: &Record) -> Result<()> {
        for name in &self.required {
            if !record.contains_key(name) {
                return Err(LineDbError::MissingField(name.clone()));
            }
        }

        for (name, spec) in &self.fields {
            if let Some(value) = record.get(name) {
                if !spec.matches(value) {
                    return Err(LineDbError::SchemaViolation {
                        field: name.clone(),
                        expected: spec.to_string(),
                        found: describe(value).to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
