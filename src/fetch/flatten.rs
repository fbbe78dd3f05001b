//! Turns decoded JSON records into table rows.
//!
//! Nested objects are flattened into dotted column names
//! (`{"a": {"b": 1}}` becomes column `a.b`). Strings and numbers keep their
//! type, `null` becomes missing, and booleans and arrays are kept as their
//! JSON text.

use super::Record;
use crate::analyser::logic::table::{Table, Value};
use crate::error::Result;
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// Flattens one record into `(column, value)` pairs.
pub fn flatten_record(record: &Record) -> Vec<(String, Value)> {
    let mut out = Vec::with_capacity(record.len());
    for (key, value) in record {
        flatten_into(key.clone(), value, &mut out);
    }
    out
}

fn flatten_into(path: String, value: &JsonValue, out: &mut Vec<(String, Value)>) {
    match value {
        JsonValue::Object(fields) => {
            for (key, nested) in fields {
                flatten_into(format!("{path}.{key}"), nested, out);
            }
        }
        JsonValue::Null => out.push((path, Value::Missing)),
        JsonValue::String(s) => out.push((path, Value::Text(s.clone()))),
        JsonValue::Number(n) => {
            let cell = n.as_f64().map_or_else(|| Value::Text(n.to_string()), Value::Number);
            out.push((path, cell));
        }
        JsonValue::Bool(_) | JsonValue::Array(_) => out.push((path, Value::Text(value.to_string()))),
    }
}

/// Builds a table from one page of records. The columns are the union of
/// every record's flattened keys in order of first appearance; a record
/// lacking a column gets a missing value there.
///
/// # Errors
///
/// Only fails if the assembled columns are inconsistent, which the
/// construction rules out.
pub fn page_to_table(records: &[Record]) -> Result<Table> {
    let rows: Vec<Vec<(String, Value)>> = records.iter().map(flatten_record).collect();

    let mut header: Vec<String> = Vec::new();
    let mut position: HashMap<String, usize> = HashMap::new();
    for (name, _) in rows.iter().flatten() {
        position.entry(name.clone()).or_insert_with(|| {
            header.push(name.clone());
            header.len() - 1
        });
    }

    let dense = rows
        .into_iter()
        .map(|row| {
            let mut cells = vec![Value::Missing; header.len()];
            for (name, value) in row {
                if let Some(cell) = position.get(&name).and_then(|&i| cells.get_mut(i)) {
                    *cell = value;
                }
            }
            cells
        })
        .collect();

    Table::from_rows(&header, dense)
}
