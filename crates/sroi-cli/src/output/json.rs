use serde_json::Value;

/// Pretty-print JSON to stdout.
pub fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("JSON serialization error: {}", e),
    }
}

/// Single-line JSON, used when a nested value has to fit in one cell.
pub fn compact(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}
