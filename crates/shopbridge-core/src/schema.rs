//! Field schemas and schema discovery
//!
//! A [`Schema`] describes the shape of one entity from one data source. Schemas
//! are either declared by a connector or inferred from sample records with
//! [`discover_schema`].
//!
//! Discovery only looks at the first element of every array. Array-of-object
//! fields are recorded once as `array.object` at the array's path; the element
//! fields below it (`images[].src`) are walked but not kept.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::path;

/// Type of a field as seen by discovery or declared by a connector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FieldType {
    /// Text
    String,
    /// Any JSON number
    Number,
    /// Whole number (declared only; discovery reports `number`)
    Integer,
    /// true/false
    Boolean,
    /// Nested object
    Object,
    /// Explicit null
    Null,
    /// List, with the kind of its first element when known
    Array(Option<Box<FieldType>>),
}

impl FieldType {
    /// Infer the type of a JSON value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Boolean,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Object(_) => Self::Object,
            Value::Array(items) => Self::Array(items.first().map(|v| Box::new(Self::of(v)))),
        }
    }

    /// Whether this is any array type.
    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Number => f.write_str("number"),
            Self::Integer => f.write_str("integer"),
            Self::Boolean => f.write_str("boolean"),
            Self::Object => f.write_str("object"),
            Self::Null => f.write_str("null"),
            Self::Array(None) => f.write_str("array"),
            Self::Array(Some(inner)) => write!(f, "array.{inner}"),
        }
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(inner) = s.strip_prefix("array.") {
            return Ok(Self::Array(Some(Box::new(inner.parse()?))));
        }
        match s {
            "string" => Ok(Self::String),
            "number" | "float" | "double" => Ok(Self::Number),
            "integer" | "int" => Ok(Self::Integer),
            "boolean" | "bool" => Ok(Self::Boolean),
            "object" => Ok(Self::Object),
            "null" => Ok(Self::Null),
            "array" => Ok(Self::Array(None)),
            other => Err(format!("unknown field type '{other}'")),
        }
    }
}

impl TryFrom<String> for FieldType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FieldType> for String {
    fn from(value: FieldType) -> Self {
        value.to_string()
    }
}

/// One field of a schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Stable identifier (`<entity>.<path>` for discovered fields)
    pub id: String,

    /// Leaf key name
    pub name: String,

    /// Field type
    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Dotted path inside the record
    pub path: String,

    /// Example value from the last sample that contained the field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample: Option<Value>,

    /// Whether the field is expected on every record
    #[serde(default)]
    pub required: bool,
}

impl FieldDefinition {
    /// Declare a field at `path` with the given type.
    pub fn new(path: impl Into<String>, field_type: FieldType) -> Self {
        let path = path.into();
        let name = leaf_name(&path).to_string();
        Self {
            id: path.clone(),
            name,
            field_type,
            path,
            sample: None,
            required: false,
        }
    }
}

/// Shape of one entity from one data source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Entity name (e.g. `products`, `orders`)
    pub entity_name: String,

    /// Fields keyed by path
    #[serde(default)]
    pub fields: BTreeMap<String, FieldDefinition>,
}

impl Schema {
    /// Create an empty schema for an entity
    pub fn new(entity_name: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Add a field, replacing any field at the same path.
    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.insert(field.path.clone(), field);
        self
    }

    /// Look up a field by path
    pub fn field(&self, path: &str) -> Option<&FieldDefinition> {
        self.fields.get(path)
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the schema has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Infer a schema from sample records.
///
/// At most `max_samples` records are inspected (`0` inspects all of them).
/// Samples that are not objects are skipped. A field seen in any sample is
/// marked required; later samples overwrite the type and sample value of
/// earlier observations at the same path.
pub fn discover_schema(entity_name: &str, samples: &[Value], max_samples: usize) -> Schema {
    let limit = if max_samples == 0 {
        samples.len()
    } else {
        max_samples
    };

    let mut schema = Schema::new(entity_name);
    for (index, sample) in samples.iter().take(limit).enumerate() {
        match sample {
            Value::Object(map) => {
                for (key, value) in map {
                    walk(&mut schema, key, value);
                }
            }
            other => {
                tracing::debug!(
                    entity = entity_name,
                    index,
                    kind = path::kind(other),
                    "skipping non-object sample"
                );
            }
        }
    }

    tracing::debug!(entity = entity_name, fields = schema.len(), "schema discovered");
    schema
}

fn walk(schema: &mut Schema, field_path: &str, value: &Value) {
    match value {
        Value::Object(map) => {
            record(schema, field_path, FieldType::Object, value);
            for (key, child) in map {
                walk(schema, &path::join(field_path, key), child);
            }
        }
        Value::Array(items) => match items.first() {
            Some(first @ Value::Object(map)) => {
                record(
                    schema,
                    field_path,
                    FieldType::Array(Some(Box::new(FieldType::Object))),
                    first,
                );
                let element_path = format!("{field_path}[]");
                for (key, child) in map {
                    walk(schema, &path::join(&element_path, key), child);
                }
            }
            Some(first) => {
                record(
                    schema,
                    field_path,
                    FieldType::Array(Some(Box::new(FieldType::of(first)))),
                    value,
                );
            }
            None => record(schema, field_path, FieldType::Array(None), value),
        },
        scalar => record(schema, field_path, FieldType::of(scalar), scalar),
    }
}

fn record(schema: &mut Schema, field_path: &str, field_type: FieldType, sample: &Value) {
    // Element fields of arrays are not kept; only the aggregate array field is.
    if field_path.contains("[]") {
        return;
    }

    let sample = match sample {
        Value::Object(_) => None,
        other => Some(other.clone()),
    };
    let definition = FieldDefinition {
        id: format!("{}.{}", schema.entity_name, field_path),
        name: leaf_name(field_path).to_string(),
        field_type,
        path: field_path.to_string(),
        sample,
        required: true,
    };
    schema.fields.insert(field_path.to_string(), definition);
}

fn leaf_name(field_path: &str) -> &str {
    let leaf = field_path.rsplit('.').next().unwrap_or(field_path);
    leaf.trim_end_matches("[]")
}
