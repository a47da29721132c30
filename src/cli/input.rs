//! Input file readers.

use crate::{Error, Result};
use serde_json::Value;
use std::path::Path;

fn read_json(path: &Path) -> Result<Value> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        Error::InvalidInput(format!("cannot read {}: {e}", path.display()))
    })?;
    serde_json::from_str(&contents)
        .map_err(|e| Error::InvalidInput(format!("{} is not valid JSON: {e}", path.display())))
}

/// Returns the array itself, or the array under `key` in an object.
fn array_field(value: Value, key: &str) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(mut object) => match object.remove(key) {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        },
        _ => None,
    }
}

/// Reads notes from a JSON file.
///
/// Accepts either an array of strings or `{"notes": [...]}`.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the file cannot be read, is not JSON,
/// or contains something other than strings.
pub fn read_notes(path: &Path) -> Result<Vec<String>> {
    let items = array_field(read_json(path)?, "notes").ok_or_else(|| {
        Error::InvalidInput(format!(
            "{}: expected an array of notes or {{\"notes\": [...]}}",
            path.display()
        ))
    })?;

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::String(note) => Ok(note),
            _ => Err(Error::InvalidInput(format!(
                "{}: note {index} is not a string",
                path.display()
            ))),
        })
        .collect()
}

/// Reads raw extraction results from a JSON file.
///
/// Accepts either an array or `{"extractions": [...]}`. Items are returned
/// unvalidated; malformed items are skipped later, one note at a time.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the file cannot be read, is not JSON,
/// or holds no array.
pub fn read_extractions(path: &Path) -> Result<Vec<Value>> {
    array_field(read_json(path)?, "extractions").ok_or_else(|| {
        Error::InvalidInput(format!(
            "{}: expected an array of extractions or {{\"extractions\": [...]}}",
            path.display()
        ))
    })
}
