pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::{Map, Value};

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// The `result` member of an envelope, or the value itself.
pub fn result_of(value: &Value) -> &Value {
    value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value)
}

/// Flatten nested objects into dotted keys. Defined metrics collapse to
/// their value, undefined ones to `undefined (<reason>)`. Arrays of
/// objects are left whole for the caller to tabulate.
pub fn flatten(prefix: &str, value: &Value, out: &mut Vec<(String, Value)>) {
    match value {
        Value::Object(map) => {
            if let Some(collapsed) = collapse_metric(map) {
                match collapsed {
                    Ok(inner) => flatten(prefix, inner, out),
                    Err(reason) => out.push((prefix.to_string(), Value::String(reason))),
                }
                return;
            }
            for (key, val) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&path, val, out);
            }
        }
        _ => out.push((prefix.to_string(), value.clone())),
    }
}

fn collapse_metric(map: &Map<String, Value>) -> Option<Result<&Value, String>> {
    if map.len() != 2 {
        return None;
    }
    let status = map.get("status")?.as_str()?;
    let inner = map.get("value")?;
    match status {
        "defined" => Some(Ok(inner)),
        "undefined" => Some(Err(format!(
            "undefined ({})",
            inner.as_str().unwrap_or("unknown").replace('_', " ")
        ))),
        _ => None,
    }
}

/// Arrays whose elements are all objects, by dotted path.
pub fn row_sets(flat: &[(String, Value)]) -> Vec<(&str, &[Value])> {
    flat.iter()
        .filter_map(|(key, val)| match val {
            Value::Array(rows) if !rows.is_empty() && rows.iter().all(Value::is_object) => {
                Some((key.as_str(), rows.as_slice()))
            }
            _ => None,
        })
        .collect()
}

pub fn format_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(arr) => arr.iter().map(format_scalar).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
