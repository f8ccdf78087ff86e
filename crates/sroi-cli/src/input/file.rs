use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

/// Read a JSON file and deserialise into a typed struct.
pub fn read_json<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    tracing::debug!(path = %canonical.display(), bytes = contents.len(), "read input file");
    let value: T = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?;
    Ok(value)
}

/// Resolve the path against the working directory and check it is a file.
fn resolve_path(path: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.exists() {
        return Err(format!("File not found: {}", canonical.display()).into());
    }

    if !canonical.is_file() {
        return Err(format!("Not a file: {}", canonical.display()).into());
    }

    Ok(canonical)
}
