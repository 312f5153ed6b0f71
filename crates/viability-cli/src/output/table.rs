use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::{flatten, format_scalar, result_of, row_sets};

/// Scalar fields as a Field/Value table, then one table per row set.
pub fn print_table(value: &Value) {
    let result = result_of(value);
    let mut flat = Vec::new();
    flatten("", result, &mut flat);

    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in &flat {
        if is_row_set(val) {
            continue;
        }
        builder.push_record([key.as_str(), format_scalar(val).as_str()]);
    }
    println!("{}", Table::from(builder));

    for (name, rows) in row_sets(&flat) {
        println!("\n{name}:");
        print_rows(rows);
    }

    if let Some(envelope) = value.as_object() {
        if let Some(Value::Array(warnings)) = envelope.get("warnings") {
            if !warnings.is_empty() {
                println!("\nWarnings:");
                for w in warnings.iter().filter_map(Value::as_str) {
                    println!("  - {w}");
                }
            }
        }
        if let Some(Value::String(meth)) = envelope.get("methodology") {
            println!("\nMethodology: {meth}");
        }
    }
}

fn is_row_set(value: &Value) -> bool {
    matches!(value, Value::Array(rows) if !rows.is_empty() && rows.iter().all(Value::is_object))
}

fn print_rows(rows: &[Value]) {
    let flat_rows: Vec<Vec<(String, Value)>> = rows
        .iter()
        .map(|row| {
            let mut flat = Vec::new();
            flatten("", row, &mut flat);
            flat
        })
        .collect();

    let Some(first) = flat_rows.first() else {
        return;
    };
    let headers: Vec<String> = first.iter().map(|(k, _)| k.clone()).collect();

    let mut builder = Builder::default();
    builder.push_record(headers.clone());
    for row in &flat_rows {
        let cells: Vec<String> = headers
            .iter()
            .map(|h| {
                row.iter()
                    .find(|(k, _)| k == h)
                    .map(|(_, v)| format_scalar(v))
                    .unwrap_or_default()
            })
            .collect();
        builder.push_record(cells);
    }
    println!("{}", Table::from(builder));
}
