//! Dotted-path access into arbitrary JSON payloads.
//!
//! Finance APIs return loosely shaped documents, so widgets address values by
//! field paths such as `meta.price` instead of by typed structs.

use serde_json::{Map, Value};

/// Resolves a dotted `path` against `value`.
///
/// Each segment indexes into an object by key, or into an array by position.
/// Returns `None` as soon as an intermediate value is absent or `null`.
pub fn resolve<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    if current.is_null() { None } else { Some(current) }
}

/// Lists every leaf path reachable from `value`, in property order.
///
/// Nested objects are walked, while scalars and arrays are leaves. Anything
/// that is not an object has no paths.
pub fn discover_paths(value: &Value) -> Vec<String> {
    let mut paths = Vec::new();
    if let Value::Object(map) = value {
        collect_paths(map, "", &mut paths);
    }
    paths
}

fn collect_paths(map: &Map<String, Value>, prefix: &str, paths: &mut Vec<String>) {
    for (key, child) in map {
        let path = join_path(prefix, key);
        match child {
            Value::Object(nested) => collect_paths(nested, &path, paths),
            _ => paths.push(path),
        }
    }
}

/// Flattens nested objects into a single map keyed by dotted path.
pub fn flatten(value: &Value) -> Map<String, Value> {
    let mut flat = Map::new();
    if let Value::Object(map) = value {
        flatten_into(map, "", &mut flat);
    }
    flat
}

fn flatten_into(map: &Map<String, Value>, prefix: &str, flat: &mut Map<String, Value>) {
    for (key, child) in map {
        let path = join_path(prefix, key);
        match child {
            Value::Object(nested) => flatten_into(nested, &path, flat),
            leaf => {
                flat.insert(path, leaf.clone());
            }
        }
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Renders a resolved value the way a browser would stringify it.
///
/// Absent values render as `null`, integral numbers drop the fraction, arrays
/// join their elements with commas and objects collapse to `[object Object]`.
pub fn to_plain_string(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "null".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (_, Some(u), _) => u.to_string(),
            (_, _, Some(f)) => number_to_string(f),
            _ => n.to_string(),
        },
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => to_plain_string(Some(other)),
            })
            .collect::<Vec<_>>()
            .join(","),
        Some(Value::Object(_)) => "[object Object]".to_string(),
    }
}

pub(crate) fn number_to_string(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

/// Interprets a resolved value as a number.
///
/// Numbers and numeric strings (surrounding whitespace allowed) parse; `null`,
/// blank strings and anything else do not.
pub fn numeric_value(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
        }
        _ => None,
    }
}
