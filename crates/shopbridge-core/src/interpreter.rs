//! Transform interpreter
//!
//! Executes a [`Transformer`] against JSON records:
//!
//! 1. mappings copy values from source paths to target paths,
//! 2. functions compute values from literals and source paths,
//! 3. values are coerced to the target schema's declared types, when known.
//!
//! Mappings and functions only ever read the input record, never the output
//! being built. Missing source paths and blocked target writes are skipped
//! field by field; an unknown function name fails the whole record.

use serde_json::{Map, Value};

use crate::coerce::coerce;
use crate::error::{Error, Result};
use crate::path::{get_path, set_path};
use crate::schema::{FieldType, Schema};
use crate::transforms::{FunctionArg, FunctionKind, Transformer};

/// Applies one transformer, optionally coercing into a target schema
#[derive(Debug, Clone, Copy)]
pub struct TransformEngine<'a> {
    transformer: &'a Transformer,
    target: Option<&'a Schema>,
}

impl<'a> TransformEngine<'a> {
    /// Create an engine for a transformer
    pub fn new(transformer: &'a Transformer) -> Self {
        Self {
            transformer,
            target: None,
        }
    }

    /// Coerce produced values into the types declared by `schema`
    pub fn with_target_schema(mut self, schema: &'a Schema) -> Self {
        self.target = Some(schema);
        self
    }

    /// Transform a single record.
    pub fn transform(&self, record: &Value) -> Result<Value> {
        let mut output = Value::Object(Map::new());

        for mapping in &self.transformer.mappings {
            let Some(value) = get_path(record, &mapping.source_field) else {
                tracing::trace!(source = %mapping.source_field, "source path missing, mapping skipped");
                continue;
            };
            let value = match &mapping.transform {
                Some(name) => FunctionKind::parse(name, &mapping.target_field)?
                    .apply(std::slice::from_ref(value)),
                None => value.clone(),
            };
            write(&mut output, &mapping.target_field, value);
        }

        for function in &self.transformer.functions {
            let kind = FunctionKind::parse(&function.name, &function.target_field)?;
            let args: Vec<Value> = function
                .args
                .iter()
                .map(|raw| match FunctionArg::parse(raw) {
                    FunctionArg::Literal(text) => Value::String(text.to_string()),
                    FunctionArg::Field(path) => get_path(record, path).cloned().unwrap_or(Value::Null),
                })
                .collect();
            write(&mut output, &function.target_field, kind.apply(&args));
        }

        if let Some(schema) = self.target {
            coerce_into(&mut output, schema);
        }

        Ok(output)
    }

    /// Transform every record; the first failure aborts the batch.
    pub fn transform_all(&self, records: &[Value]) -> Result<Vec<Value>> {
        records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                self.transform(record).map_err(|e| Error::Transform {
                    field: e.field().unwrap_or("$").to_string(),
                    message: format!("record {index}: {e}"),
                })
            })
            .collect()
    }
}

/// Transform one record with a transformer and no target schema.
pub fn apply_transformer(transformer: &Transformer, record: &Value) -> Result<Value> {
    TransformEngine::new(transformer).transform(record)
}

fn write(output: &mut Value, target_field: &str, value: Value) {
    if let Err(e) = set_path(output, target_field, value) {
        tracing::warn!(field = target_field, error = %e, "skipping field write");
    }
}

fn coerce_into(output: &mut Value, schema: &Schema) {
    for field in schema.fields.values() {
        if field.field_type == FieldType::Object || field.path.contains('[') {
            continue;
        }
        let Some(current) = get_path(output, &field.path) else {
            continue;
        };
        let coerced = coerce(current.clone(), &field.field_type);
        if &coerced != current {
            write(output, &field.path, coerced);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDefinition, discover_schema};
    use crate::transforms::{FieldMapping, Function};
    use serde_json::json;

    fn jane() -> Value {
        json!({"first_name": "Jane", "last_name": "Doe"})
    }

    #[test]
    fn test_mappings_build_nested_output() {
        let transformer = Transformer::new("names").with_mappings([
            FieldMapping::new("first_name", "name.first"),
            FieldMapping::new("last_name", "name.last"),
        ]);
        let result = apply_transformer(&transformer, &jane()).unwrap();
        assert_eq!(result, json!({"name": {"first": "Jane", "last": "Doe"}}));
    }

    #[test]
    fn test_concatenate_reads_input_record() {
        let record = json!({"name": {"first": "Jane"}});
        let transformer = Transformer::new("greet").with_functions([Function::new(
            "concatenate",
            "greeting",
            ["'Hello, '", "name.first"],
        )]);
        let result = apply_transformer(&transformer, &record).unwrap();
        assert_eq!(result["greeting"], "Hello, Jane");
    }

    #[test]
    fn test_functions_never_read_output() {
        let transformer = Transformer::new("t")
            .with_mappings([FieldMapping::new("first_name", "name.first")])
            .with_functions([Function::new("uppercase", "shout", ["name.first"])]);
        let result = apply_transformer(&transformer, &jane()).unwrap();
        assert_eq!(result["name"]["first"], "Jane");
        assert_eq!(result["shout"], Value::Null);
    }

    #[test]
    fn test_empty_transformer_gives_empty_output() {
        let transformer = Transformer::new("empty");
        for input in [jane(), json!({}), json!([1, 2]), json!("text")] {
            assert_eq!(apply_transformer(&transformer, &input).unwrap(), json!({}));
        }
    }

    #[test]
    fn test_identity_mapping_is_idempotent() {
        let record = json!({
            "title": "Mug",
            "price": 9.5,
            "dimensions": {"height": 10, "width": 8},
            "images": [{"src": "a.jpg"}]
        });
        let schema = discover_schema("products", std::slice::from_ref(&record), 1);
        let transformer = Transformer::new("identity").with_mappings(
            schema
                .fields
                .values()
                .map(|f| FieldMapping::new(&f.path, &f.path)),
        );
        let result = apply_transformer(&transformer, &record).unwrap();
        assert_eq!(result, record);
    }

    #[test]
    fn test_missing_source_is_skipped() {
        let transformer = Transformer::new("t").with_mappings([
            FieldMapping::new("email", "contact.email"),
            FieldMapping::new("first_name", "contact.name"),
        ]);
        let result = apply_transformer(&transformer, &jane()).unwrap();
        assert_eq!(result, json!({"contact": {"name": "Jane"}}));
    }

    #[test]
    fn test_blocked_write_skips_only_that_field() {
        let transformer = Transformer::new("t").with_mappings([
            FieldMapping::new("first_name", "name"),
            FieldMapping::new("last_name", "name.last"),
            FieldMapping::new("last_name", "surname"),
        ]);
        let result = apply_transformer(&transformer, &jane()).unwrap();
        assert_eq!(result, json!({"name": "Jane", "surname": "Doe"}));
    }

    #[test]
    fn test_unknown_function_fails_record() {
        let transformer =
            Transformer::new("t").with_functions([Function::new("slugify", "slug", ["first_name"])]);
        let err = apply_transformer(&transformer, &jane()).unwrap_err();
        assert!(matches!(err, Error::UnknownFunction { .. }));
        assert_eq!(err.field(), Some("slug"));
    }

    #[test]
    fn test_mapping_transform_is_applied() {
        let transformer = Transformer::new("t")
            .with_mappings([FieldMapping::new("last_name", "surname").with_transform("uppercase")]);
        let result = apply_transformer(&transformer, &jane()).unwrap();
        assert_eq!(result["surname"], "DOE");

        let bad = Transformer::new("t")
            .with_mappings([FieldMapping::new("last_name", "surname").with_transform("rot13")]);
        assert!(apply_transformer(&bad, &jane()).is_err());
    }

    #[test]
    fn test_unresolved_function_argument_is_null() {
        let transformer = Transformer::new("t").with_functions([Function::new(
            "concatenate",
            "label",
            ["first_name", "' '", "middle_name", "'!'"],
        )]);
        let result = apply_transformer(&transformer, &jane()).unwrap();
        assert_eq!(result["label"], "Jane !");
    }

    #[test]
    fn test_coercion_into_target_schema() {
        let record = json!({
            "regular_price": "19.90",
            "stock": "12",
            "on_sale": "yes",
            "images": [{"id": 1, "src": "https://cdn/mug.jpg"}],
            "category": "kitchen",
            "weight": "heavy"
        });
        let transformer = Transformer::new("woo_to_market").with_mappings([
            FieldMapping::new("regular_price", "price"),
            FieldMapping::new("stock", "quantity"),
            FieldMapping::new("on_sale", "promoted"),
            FieldMapping::new("images", "image_url"),
            FieldMapping::new("category", "categories"),
            FieldMapping::new("weight", "weight_kg"),
        ]);
        let target = Schema::new("listing")
            .with_field(FieldDefinition::new("price", FieldType::Number))
            .with_field(FieldDefinition::new("quantity", FieldType::Integer))
            .with_field(FieldDefinition::new("promoted", FieldType::Boolean))
            .with_field(FieldDefinition::new("image_url", FieldType::String))
            .with_field(FieldDefinition::new(
                "categories",
                FieldType::Array(Some(Box::new(FieldType::String))),
            ))
            .with_field(FieldDefinition::new("weight_kg", FieldType::Number))
            .with_field(FieldDefinition::new("unmapped", FieldType::String));

        let result = TransformEngine::new(&transformer)
            .with_target_schema(&target)
            .transform(&record)
            .unwrap();

        assert_eq!(
            result,
            json!({
                "price": 19.9,
                "quantity": 12,
                "promoted": true,
                "image_url": "https://cdn/mug.jpg",
                "categories": ["kitchen"],
                "weight_kg": "heavy"
            })
        );
    }

    #[test]
    fn test_transform_all_reports_record_index() {
        let transformer =
            Transformer::new("t").with_functions([Function::new("explode", "x", ["a"])]);
        let records = vec![json!({"a": 1}), json!({"a": 2})];
        let err = TransformEngine::new(&transformer)
            .transform_all(&records)
            .unwrap_err();
        assert!(err.to_string().contains("record 0"));
        assert_eq!(err.field(), Some("x"));
    }
}
