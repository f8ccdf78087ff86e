use serde_json::Value;

use super::{json, result_body};

/// Print just the headline number of the output.
///
/// Looks for well-known result fields in order of priority, then falls back
/// to the first field in the result object.
pub fn print_minimal(value: &Value) {
    let result_obj = result_body(value);

    let priority_keys = [
        "sroi_ratio",
        "average_sroi",
        "base_case_value",
        "present_value",
        "total_benefit_pv",
    ];

    if let Value::Object(map) = result_obj {
        for key in &priority_keys {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    println!("{}", format_minimal(val));
                    return;
                }
            }
        }

        // A completed project nests its figures one level down
        if let Some(Value::Object(project)) = map.get("project") {
            if let Some(ratio) = project.get("sroi_ratio") {
                println!("{}", format_minimal(ratio));
                return;
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    println!("{}", format_minimal(result_obj));
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => json::compact(value),
    }
}
