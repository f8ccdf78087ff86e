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

/// The computation result inside the output envelope, or the value itself.
pub(crate) fn result_body(value: &Value) -> &Value {
    value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value)
}

/// Fields that hold arrays of objects (`yearly`, `outcomes`, `stream`, ...).
pub(crate) fn row_sets(map: &Map<String, Value>) -> Vec<(&str, &Vec<Value>)> {
    map.iter()
        .filter_map(|(k, v)| match v {
            Value::Array(items) if items.first().map_or(false, Value::is_object) => {
                Some((k.as_str(), items))
            }
            _ => None,
        })
        .collect()
}

/// Scalar-ish fields, i.e. everything that is not a row set.
pub(crate) fn scalar_fields(map: &Map<String, Value>) -> Vec<(&str, &Value)> {
    map.iter()
        .filter(|(_, v)| !matches!(v, Value::Array(items) if items.first().map_or(false, Value::is_object)))
        .map(|(k, v)| (k.as_str(), v))
        .collect()
}
