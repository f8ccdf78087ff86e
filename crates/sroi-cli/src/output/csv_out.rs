use serde_json::{Map, Value};
use std::io;

use super::{json, result_body, row_sets, scalar_fields};

type StdoutWriter<'a> = csv::Writer<io::StdoutLock<'a>>;

/// Write output as CSV to stdout.
///
/// Results that carry a per-year series (`yearly`, `stream`) are written as
/// that series, ready for charting; a sensitivity matrix is written as a grid;
/// anything else as two-column field/value rows.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match result_body(value) {
        Value::Object(map) => {
            if let Some(rows) = series(map) {
                write_array_csv(&mut wtr, rows);
            } else if map.contains_key("matrix") {
                write_matrix_csv(&mut wtr, map);
            } else {
                let _ = wtr.write_record(["field", "value"]);
                for (key, val) in scalar_fields(map) {
                    let _ = wtr.write_record([key, &format_csv_value(val)]);
                }
            }
        }
        Value::Array(arr) => write_array_csv(&mut wtr, arr),
        other => {
            let _ = wtr.write_record([&format_csv_value(other)]);
        }
    }

    let _ = wtr.flush();
}

fn series(map: &Map<String, Value>) -> Option<&Vec<Value>> {
    row_sets(map)
        .into_iter()
        .find(|(name, _)| matches!(*name, "yearly" | "stream"))
        .map(|(_, rows)| rows)
}

fn write_matrix_csv(wtr: &mut StdoutWriter<'_>, map: &Map<String, Value>) {
    let label = |key: &str| {
        map.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let columns = map
        .get("variable_2_values")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let row_values = map
        .get("variable_1_values")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut header = vec![format!("{} \\ {}", label("variable_1_name"), label("variable_2_name"))];
    header.extend(columns.iter().map(format_csv_value));
    let _ = wtr.write_record(&header);

    if let Some(Value::Array(matrix)) = map.get("matrix") {
        for (row_value, row) in row_values.iter().zip(matrix) {
            let mut record = vec![format_csv_value(row_value)];
            if let Value::Array(cells) = row {
                record.extend(cells.iter().map(format_csv_value));
            }
            let _ = wtr.write_record(&record);
        }
    }
}

fn write_array_csv(wtr: &mut StdoutWriter<'_>, arr: &[Value]) {
    if arr.is_empty() {
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first
            .iter()
            .filter(|(_, v)| !v.is_array())
            .map(|(k, _)| k.as_str())
            .collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => json::compact(value),
    }
}
