use serde_json::Value;
use std::io;

use super::{flatten, format_scalar, result_of, row_sets};

/// Write output as CSV to stdout.
///
/// Results with a year-by-year series (or any other list of records) are
/// written as one row per record; everything else as field,value pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let mut flat = Vec::new();
    flatten("", result_of(value), &mut flat);

    let written = match primary_rows(&flat) {
        Some(rows) => write_rows(&mut wtr, rows),
        None => write_fields(&mut wtr, &flat),
    }
    .and_then(|_| wtr.flush().map_err(csv::Error::from));

    if let Err(e) = written {
        tracing::error!(error = %e, "failed to write CSV output");
    }
}

/// Cash-flow entries win over any other record list.
fn primary_rows(flat: &[(String, Value)]) -> Option<&[Value]> {
    let sets = row_sets(flat);
    sets.iter()
        .find(|(name, _)| name.ends_with("entries"))
        .or_else(|| sets.first())
        .map(|(_, rows)| *rows)
}

fn write_fields(
    wtr: &mut csv::Writer<io::StdoutLock<'_>>,
    flat: &[(String, Value)],
) -> Result<(), csv::Error> {
    wtr.write_record(["field", "value"])?;
    for (key, val) in flat {
        wtr.write_record([key.as_str(), format_scalar(val).as_str()])?;
    }
    Ok(())
}

fn write_rows(wtr: &mut csv::Writer<io::StdoutLock<'_>>, rows: &[Value]) -> Result<(), csv::Error> {
    let flat_rows: Vec<Vec<(String, Value)>> = rows
        .iter()
        .map(|row| {
            let mut flat = Vec::new();
            flatten("", row, &mut flat);
            flat
        })
        .collect();
    let Some(first) = flat_rows.first() else {
        return Ok(());
    };

    let headers: Vec<&str> = first.iter().map(|(k, _)| k.as_str()).collect();
    wtr.write_record(&headers)?;
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
        wtr.write_record(&cells)?;
    }
    Ok(())
}
