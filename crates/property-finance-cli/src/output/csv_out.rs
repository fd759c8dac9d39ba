use serde_json::Value;
use std::io;

use super::{cell, flatten, SERIES_KEYS};

/// Write output as CSV to stdout.
///
/// When the result carries a row series (yearly projection, scenarios,
/// tier breakdown) that series is written with one row per entry;
/// otherwise the flattened result is written as `field,value` pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let series = result.as_object().and_then(|map| {
        SERIES_KEYS
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_array))
    });

    match series {
        Some(rows) => write_rows(&mut wtr, rows),
        None => {
            let mut fields = Vec::new();
            flatten("", result, &mut fields);
            let _ = wtr.write_record(["field", "value"]);
            for (key, val) in &fields {
                let _ = wtr.write_record([key.as_str(), &cell(val)]);
            }
        }
    }

    let _ = wtr.flush();
}

fn write_rows(wtr: &mut csv::Writer<io::StdoutLock<'_>>, rows: &[Value]) {
    let flattened: Vec<Vec<(String, Value)>> = rows
        .iter()
        .map(|row| {
            let mut fields = Vec::new();
            flatten("", row, &mut fields);
            // Per-age histories do not fit a single row.
            fields.retain(|(_, v)| !v.is_array());
            fields
        })
        .collect();

    let Some(first) = flattened.first() else {
        return;
    };
    let headers: Vec<&str> = first.iter().map(|(k, _)| k.as_str()).collect();
    let _ = wtr.write_record(&headers);

    for fields in &flattened {
        let record: Vec<String> = headers
            .iter()
            .map(|h| {
                fields
                    .iter()
                    .find(|(k, _)| k == h)
                    .map(|(_, v)| cell(v))
                    .unwrap_or_default()
            })
            .collect();
        let _ = wtr.write_record(&record);
    }
}
