use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{json, result_body, row_sets, scalar_fields};

/// Format output as tables: one Field/Value table for the scalar results,
/// then one table per row set (yearly benefits, outcomes, streams).
pub fn print_table(value: &Value) {
    match result_body(value) {
        Value::Object(map) => print_object(map),
        Value::Array(arr) => print_array_table(arr),
        other => println!("{}", other),
    }

    if let Value::Object(envelope) = value {
        print_envelope_notes(envelope);
    }
}

fn print_object(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in scalar_fields(map) {
        builder.push_record([key, &format_value(val)]);
    }
    println!("{}", Table::from(builder));

    for (name, rows) in row_sets(map) {
        println!("\n{}:", name);
        print_array_table(rows);
    }
}

fn print_envelope_notes(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        // Nested row sets (an outcome's stream) are too wide for a cell
        let headers: Vec<String> = first
            .iter()
            .filter(|(_, v)| !v.is_array())
            .map(|(k, _)| k.clone())
            .collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(map) => format_tagged(map).unwrap_or_else(|| json::compact(value)),
    }
}

/// Render `{"kind": "extrapolated", "years": 5}` as `extrapolated (5 years)`.
fn format_tagged(map: &Map<String, Value>) -> Option<String> {
    let kind = map.get("kind")?.as_str()?;
    Some(match map.get("years").and_then(Value::as_u64) {
        Some(years) => format!("{} ({} years)", kind, years),
        None => kind.to_string(),
    })
}
