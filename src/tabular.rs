//! Page decoding
//!
//! Turns a raw page body into an ordered sequence of rows, each an ordered
//! mapping of attribute name to raw string value.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{RegisterError, Result};

/// One decoded row
pub type Row = IndexMap<String, String>;

/// Payload format of a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageFormat {
    #[default]
    Tsv,
    Json,
}

impl PageFormat {
    /// Suffix appended to resource paths
    pub fn extension(&self) -> &'static str {
        match self {
            PageFormat::Tsv => "tsv",
            PageFormat::Json => "json",
        }
    }

    /// Decode a page body in this format
    pub fn parse(&self, body: &str) -> Result<Vec<Row>> {
        match self {
            PageFormat::Tsv => parse_tsv(body),
            PageFormat::Json => parse_json(body),
        }
    }
}

/// Decode a tab-separated page with a header line
///
/// Short lines are padded with empty values; lines with more cells than
/// the header are rejected.
pub fn parse_tsv(body: &str) -> Result<Vec<Row>> {
    let mut lines = body.lines().map(|line| line.trim_end_matches('\r'));
    let header: Vec<&str> = match lines.next() {
        Some(line) if !line.is_empty() => line.split('\t').collect(),
        _ => return Ok(Vec::new()),
    };

    let mut rows = Vec::new();
    for (number, line) in lines.enumerate() {
        if line.is_empty() {
            continue;
        }
        let cells: Vec<&str> = line.split('\t').collect();
        if cells.len() > header.len() {
            return Err(RegisterError::Tsv(format!(
                "line {} has {} cells, header has {}",
                number + 2,
                cells.len(),
                header.len()
            )));
        }
        let row = header
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), cells.get(i).copied().unwrap_or("").to_string()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// Decode a JSON page
///
/// Accepts an array of entries or an object keyed by record key. Nested
/// objects (`entry`, `item`) are flattened into the row.
pub fn parse_json(body: &str) -> Result<Vec<Row>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let value: Value = serde_json::from_str(body)?;
    let rows: Vec<Row> = match value {
        Value::Array(entries) => entries.iter().filter_map(Value::as_object).map(flatten).collect(),
        Value::Object(map) if !map.is_empty() && map.values().all(Value::is_object) => {
            map.values().filter_map(Value::as_object).map(flatten).collect()
        }
        Value::Object(map) => vec![flatten(&map)],
        _ => Vec::new(),
    };
    Ok(rows)
}

fn flatten(object: &Map<String, Value>) -> Row {
    let mut row = Row::new();
    flatten_into(object, &mut row);
    row
}

fn flatten_into(object: &Map<String, Value>, row: &mut Row) {
    for (name, value) in object {
        match value {
            Value::Null => {}
            Value::Object(nested) => flatten_into(nested, row),
            Value::Array(items) if items.iter().all(Value::is_object) && !items.is_empty() => {
                for item in items.iter().filter_map(Value::as_object) {
                    flatten_into(item, row);
                }
            }
            Value::Array(items) => {
                let joined = items.iter().map(scalar).collect::<Vec<_>>().join(";");
                row.insert(name.clone(), joined);
            }
            other => {
                row.insert(name.clone(), scalar(other));
            }
        }
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
