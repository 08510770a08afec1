//! Transformer definitions
//!
//! A transformer is the stored program that converts records of one source
//! shape into records of one target shape. It holds 1:1 field mappings and
//! computed functions; the engine in [`crate::interpreter`] executes it.
//!
//! # Built-in Functions
//!
//! - `concatenate` - join all arguments as text
//! - `uppercase` - upper-case the first argument
//! - `lowercase` - lower-case the first argument
//! - `trim` - strip surrounding whitespace from the first argument
//!
//! # Example
//!
//! ```yaml
//! id: shop_to_market
//! name: Shop products to marketplace listings
//! mappings:
//!   - source_field: title
//!     target_field: listing.name
//!   - source_field: vendor
//!     target_field: brand
//!     transform: uppercase
//! functions:
//!   - name: concatenate
//!     target_field: listing.description
//!     args: ["'Sold by '", vendor]
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// A declared source path → target path correspondence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Path read from the source record
    pub source_field: String,

    /// Path written in the output record
    pub target_field: String,

    /// Optional function applied to the mapped value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<String>,
}

impl FieldMapping {
    /// Plain 1:1 mapping
    pub fn new(source_field: impl Into<String>, target_field: impl Into<String>) -> Self {
        Self {
            source_field: source_field.into(),
            target_field: target_field.into(),
            transform: None,
        }
    }

    /// Apply a named function to the mapped value
    pub fn with_transform(mut self, name: impl Into<String>) -> Self {
        self.transform = Some(name.into());
        self
    }
}

/// A computed field derivation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    /// Function name (see [`FunctionKind`])
    pub name: String,

    /// Path written in the output record
    pub target_field: String,

    /// Arguments: `'quoted'` literals or source paths
    #[serde(default)]
    pub args: Vec<String>,
}

impl Function {
    /// Create a function definition
    pub fn new<I, S>(name: impl Into<String>, target_field: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            target_field: target_field.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// A complete transformation program between two shapes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transformer {
    /// Transformer identifier
    pub id: String,

    /// Human readable name
    #[serde(default)]
    pub name: String,

    /// 1:1 field mappings, applied first
    #[serde(default)]
    pub mappings: Vec<FieldMapping>,

    /// Computed fields, applied after all mappings
    #[serde(default)]
    pub functions: Vec<Function>,
}

impl Transformer {
    /// Create an empty transformer
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            ..Default::default()
        }
    }

    /// Add mappings
    pub fn with_mappings(mut self, mappings: impl IntoIterator<Item = FieldMapping>) -> Self {
        self.mappings.extend(mappings);
        self
    }

    /// Add functions
    pub fn with_functions(mut self, functions: impl IntoIterator<Item = Function>) -> Self {
        self.functions.extend(functions);
        self
    }

    /// Check every function name before running the transformer.
    pub fn validate(&self) -> Result<()> {
        for mapping in &self.mappings {
            if let Some(name) = &mapping.transform {
                FunctionKind::parse(name, &mapping.target_field)?;
            }
        }
        for function in &self.functions {
            FunctionKind::parse(&function.name, &function.target_field)?;
        }
        Ok(())
    }
}

/// The built-in functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// Join all arguments as text
    Concatenate,
    /// Upper-case the first argument
    Uppercase,
    /// Lower-case the first argument
    Lowercase,
    /// Trim the first argument
    Trim,
}

impl FunctionKind {
    /// Resolve a function name; `field` is the target path, used in the error.
    pub fn parse(name: &str, field: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "concatenate" | "concat" => Ok(Self::Concatenate),
            "uppercase" | "upper" => Ok(Self::Uppercase),
            "lowercase" | "lower" => Ok(Self::Lowercase),
            "trim" => Ok(Self::Trim),
            _ => Err(Error::UnknownFunction {
                name: name.to_string(),
                field: field.to_string(),
            }),
        }
    }

    /// Apply the function to resolved argument values.
    ///
    /// Missing arguments are passed as `Value::Null`.
    pub fn apply(self, args: &[Value]) -> Value {
        match self {
            Self::Concatenate => Value::String(args.iter().map(text).collect()),
            Self::Uppercase => map_text(args.first(), |s| s.to_uppercase()),
            Self::Lowercase => map_text(args.first(), |s| s.to_lowercase()),
            Self::Trim => map_text(args.first(), |s| s.trim().to_string()),
        }
    }
}

/// A parsed function argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionArg<'a> {
    /// Literal text (quotes removed)
    Literal(&'a str),
    /// Source field path
    Field(&'a str),
}

impl<'a> FunctionArg<'a> {
    /// Classify an argument: `'...'` is a literal, anything else a path.
    pub fn parse(raw: &'a str) -> Self {
        match raw
            .strip_prefix('\'')
            .and_then(|rest| rest.strip_suffix('\''))
        {
            Some(literal) => Self::Literal(literal),
            None => Self::Field(raw.trim()),
        }
    }
}

/// Text form of a value as functions see it: strings unquoted, null empty.
pub fn text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn map_text(value: Option<&Value>, f: impl Fn(&str) -> String) -> Value {
    match value {
        None | Some(Value::Null) => Value::Null,
        Some(v) => Value::String(f(&text(v))),
    }
}
