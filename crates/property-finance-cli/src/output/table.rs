use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::{cell, flatten, SERIES_KEYS};

/// Format output as tables: the scalar summary first, then one table per
/// row series in the result.
pub fn print_table(value: &Value) {
    let Some(envelope) = value.as_object() else {
        println!("{}", value);
        return;
    };
    let result = envelope.get("result").unwrap_or(value);

    let mut summary = Vec::new();
    flatten("", result, &mut summary);
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in summary.iter().filter(|(_, v)| !v.is_array()) {
        builder.push_record([key.as_str(), &cell(val)]);
    }
    println!("{}", Table::from(builder));

    if let Some(map) = result.as_object() {
        for key in SERIES_KEYS {
            if let Some(Value::Array(rows)) = map.get(key) {
                println!("\n{key}:");
                print_rows(rows);
            }
        }
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
    if let Some(version) = envelope
        .get("metadata")
        .and_then(|m| m.get("schedule_version"))
        .and_then(Value::as_str)
    {
        println!("Schedule: {}", version);
    }
}

fn print_rows(rows: &[Value]) {
    if rows.is_empty() {
        println!("(empty)");
        return;
    }

    let flattened: Vec<Vec<(String, Value)>> = rows
        .iter()
        .map(|row| {
            let mut fields = Vec::new();
            flatten("", row, &mut fields);
            fields.retain(|(_, v)| !v.is_array());
            fields
        })
        .collect();

    let headers: Vec<String> = flattened[0].iter().map(|(k, _)| k.clone()).collect();
    let mut builder = Builder::default();
    builder.push_record(headers.clone());
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
        builder.push_record(record);
    }
    println!("{}", Table::from(builder));
}
