//! Nested field paths
//!
//! Paths address values inside a record:
//!
//! - `customer.name` - nested object keys
//! - `images[0].src` - explicit array index
//! - `images[].src` - first element of an array (the form schema discovery emits)

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// One step of a parsed path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Object key
    Key(String),
    /// Array index
    Index(usize),
    /// `[]`, the first array element
    First,
}

impl Segment {
    fn index(&self) -> Option<usize> {
        match self {
            Self::Index(i) => Some(*i),
            Self::First => Some(0),
            Self::Key(_) => None,
        }
    }
}

/// Parse a dotted/bracketed path into segments.
///
/// Malformed bracket content (e.g. `a[x]`) is treated as part of the key.
pub fn parse(path: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    for part in path.split('.').filter(|p| !p.is_empty()) {
        let (key, mut rest) = match part.find('[') {
            Some(pos) => part.split_at(pos),
            None => (part, ""),
        };
        let mut brackets = Vec::new();
        let mut malformed = false;
        while let Some(stripped) = rest.strip_prefix('[') {
            let Some(end) = stripped.find(']') else {
                malformed = true;
                break;
            };
            let inner = &stripped[..end];
            if inner.is_empty() {
                brackets.push(Segment::First);
            } else if let Ok(i) = inner.parse::<usize>() {
                brackets.push(Segment::Index(i));
            } else {
                malformed = true;
                break;
            }
            rest = &stripped[end + 1..];
        }
        if malformed || !rest.is_empty() {
            segments.push(Segment::Key(part.to_string()));
            continue;
        }
        if !key.is_empty() {
            segments.push(Segment::Key(key.to_string()));
        }
        segments.extend(brackets);
    }
    segments
}

/// Join a parent path and a child key with `.`.
pub fn join(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

/// Resolve `path` inside `value`.
///
/// Returns `None` when any step is missing or lands on a value of the wrong kind.
pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let segments = parse(path);
    if segments.is_empty() {
        return None;
    }
    segments
        .iter()
        .try_fold(value, |current, segment| match segment {
            Segment::Key(key) => current.as_object()?.get(key),
            other => current.as_array()?.get(other.index()?),
        })
}

/// Write `new_value` at `path` inside `target`, creating intermediate objects.
///
/// Fails when an existing intermediate value is neither an object nor null,
/// or when an array step points past the end of an existing array.
pub fn set_path(target: &mut Value, path: &str, new_value: Value) -> Result<()> {
    let segments = parse(path);
    if segments.is_empty() {
        return Err(Error::Path {
            path: path.to_string(),
            message: "empty path".to_string(),
        });
    }
    set_in(target, &segments, new_value, path)
}

fn set_in(current: &mut Value, segments: &[Segment], new_value: Value, path: &str) -> Result<()> {
    let Some((segment, rest)) = segments.split_first() else {
        *current = new_value;
        return Ok(());
    };

    match segment {
        Segment::Key(key) => {
            if current.is_null() {
                *current = Value::Object(Map::new());
            }
            let found = kind(current);
            let Value::Object(map) = current else {
                return Err(Error::Path {
                    path: path.to_string(),
                    message: format!("cannot set key '{key}' on a {found} value"),
                });
            };
            if rest.is_empty() {
                map.insert(key.clone(), new_value);
                return Ok(());
            }
            let child = map.entry(key.clone()).or_insert(Value::Null);
            set_in(child, rest, new_value, path)
        }
        other => {
            let index = other.index().unwrap_or_default();
            let found = kind(current);
            let Value::Array(items) = current else {
                return Err(Error::Path {
                    path: path.to_string(),
                    message: format!("cannot index into a {found} value"),
                });
            };
            let len = items.len();
            let slot = items.get_mut(index).ok_or_else(|| Error::Path {
                path: path.to_string(),
                message: format!("index {index} out of range for array of length {len}"),
            })?;
            set_in(slot, rest, new_value, path)
        }
    }
}

/// Short name of a value's kind, for error messages.
pub fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
