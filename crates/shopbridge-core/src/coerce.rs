//! Target-type coercion
//!
//! Marketplace APIs are strict about field types while shop APIs tend to send
//! numbers as strings, booleans as `"yes"`, and images as lists of objects.
//! [`coerce`] adapts one value to a declared [`FieldType`]; values that cannot
//! be adapted are returned unchanged.

use serde_json::{Number, Value};

use crate::schema::FieldType;

/// Keys looked up, in order, when reducing a media list to a single URL
const MEDIA_KEYS: [&str; 4] = ["src", "url", "link", "href"];

/// Adapt `value` to `target`.
pub fn coerce(value: Value, target: &FieldType) -> Value {
    match target {
        FieldType::String => to_string(value),
        FieldType::Number | FieldType::Integer => to_number(value),
        FieldType::Boolean => to_boolean(value),
        FieldType::Array(_) => to_array(value),
        FieldType::Object | FieldType::Null => value,
    }
}

fn to_string(value: Value) -> Value {
    match value {
        Value::Number(n) => Value::String(n.to_string()),
        Value::Bool(b) => Value::String(b.to_string()),
        Value::Array(items) => match media_url(&items) {
            Some(url) => Value::String(url),
            None => Value::Array(items),
        },
        other => other,
    }
}

fn media_url(items: &[Value]) -> Option<String> {
    let first = items.iter().find_map(Value::as_object)?;
    MEDIA_KEYS
        .iter()
        .find_map(|key| first.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

fn to_number(value: Value) -> Value {
    let Value::String(s) = &value else {
        return value;
    };
    let trimmed = s.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Number(i.into());
    }
    match trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
        Some(n) => Value::Number(n),
        None => value,
    }
}

fn to_boolean(value: Value) -> Value {
    match value {
        Value::String(s) => {
            let s = s.trim();
            Value::Bool(
                s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("yes") || s == "1",
            )
        }
        Value::Number(n) => Value::Bool(n.as_f64().is_some_and(|f| f != 0.0)),
        other => other,
    }
}

fn to_array(value: Value) -> Value {
    match value {
        Value::Null | Value::Array(_) | Value::Object(_) => value,
        scalar => Value::Array(vec![scalar]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn array_of(inner: FieldType) -> FieldType {
        FieldType::Array(Some(Box::new(inner)))
    }

    #[rstest]
    #[case(json!(19.99), FieldType::String, json!("19.99"))]
    #[case(json!(7), FieldType::String, json!("7"))]
    #[case(json!(false), FieldType::String, json!("false"))]
    #[case(json!("already"), FieldType::String, json!("already"))]
    #[case(json!("42"), FieldType::Number, json!(42))]
    #[case(json!(" 12.5 "), FieldType::Number, json!(12.5))]
    #[case(json!("12"), FieldType::Integer, json!(12))]
    #[case(json!("n/a"), FieldType::Number, json!("n/a"))]
    #[case(json!("NaN"), FieldType::Number, json!("NaN"))]
    #[case(json!("YES"), FieldType::Boolean, json!(true))]
    #[case(json!("True"), FieldType::Boolean, json!(true))]
    #[case(json!("1"), FieldType::Boolean, json!(true))]
    #[case(json!("no"), FieldType::Boolean, json!(false))]
    #[case(json!(0), FieldType::Boolean, json!(false))]
    #[case(json!("red"), FieldType::Array(None), json!(["red"]))]
    #[case(json!(3), array_of(FieldType::Number), json!([3]))]
    #[case(json!(["a"]), FieldType::Array(None), json!(["a"]))]
    #[case(json!({"a": 1}), FieldType::Array(None), json!({"a": 1}))]
    #[case(Value::Null, FieldType::Array(None), Value::Null)]
    #[case(json!({"a": 1}), FieldType::Object, json!({"a": 1}))]
    fn test_coerce(#[case] input: Value, #[case] target: FieldType, #[case] expected: Value) {
        assert_eq!(coerce(input, &target), expected);
    }

    #[rstest]
    #[case(json!([{"src": "s.jpg", "url": "u.jpg"}]), json!("s.jpg"))]
    #[case(json!([{"url": "u.jpg", "href": "h.jpg"}]), json!("u.jpg"))]
    #[case(json!([{"link": "l.jpg"}, {"src": "second.jpg"}]), json!("l.jpg"))]
    #[case(json!([{"href": "h.jpg"}]), json!("h.jpg"))]
    #[case(json!([{"alt": "front"}]), json!([{"alt": "front"}]))]
    #[case(json!(["a", "b"]), json!(["a", "b"]))]
    fn test_media_list_to_string(#[case] input: Value, #[case] expected: Value) {
        assert_eq!(coerce(input, &FieldType::String), expected);
    }
}
