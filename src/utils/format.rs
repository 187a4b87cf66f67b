//! Output formatting utilities
//!
//! Renders environment values as YAML, JSON, or a two-column table.

use crate::error::{EnvDictError, Result};
use serde_yaml::Value;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Padding, Style},
    Table, Tabled,
};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, clap::ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
    Table,
}

/// One row of a key/value table
#[derive(Debug, Clone, Tabled)]
pub struct EntryRow {
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

impl EntryRow {
    pub fn new<K: Into<String>, V: Into<String>>(key: K, value: V) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Render a value in the requested format
pub fn format_value(value: &Value, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Yaml => match value {
            Value::String(s) => Ok(s.clone()),
            other => serde_yaml::to_string(other)
                .map(|s| s.trim_end().to_string())
                .map_err(|e| EnvDictError::serialization(e.to_string())),
        },
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Table => Ok(format_table(&flatten_rows(value))),
    }
}

/// Render rows as a rounded table
pub fn format_table(rows: &[EntryRow]) -> String {
    if rows.is_empty() {
        return "No data to display".to_string();
    }

    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .with(Padding::new(1, 1, 0, 0));
    table.to_string()
}

/// Flatten nested mappings into dotted-key rows; sequences stay inline
pub fn flatten_rows(value: &Value) -> Vec<EntryRow> {
    let mut rows = Vec::new();
    match value {
        Value::Mapping(_) => collect_rows(value, String::new(), &mut rows),
        other => rows.push(EntryRow::new("", scalar_text(other))),
    }
    rows
}

fn collect_rows(value: &Value, prefix: String, rows: &mut Vec<EntryRow>) {
    match value {
        Value::Mapping(map) => {
            for (k, v) in map {
                let key = match k {
                    Value::String(s) => s.clone(),
                    other => scalar_text(other),
                };
                let path = if prefix.is_empty() {
                    key
                } else {
                    format!("{}.{}", prefix, key)
                };
                collect_rows(v, path, rows);
            }
        }
        other => rows.push(EntryRow::new(prefix, scalar_text(other))),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_flatten_rows() {
        let rows = flatten_rows(&parse("a:\n  b: 1\n  c: [1, 2]\nd: x\n"));
        let keys: Vec<&str> = rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["a.b", "a.c", "d"]);
        assert_eq!(rows[0].value, "1");
        assert_eq!(rows[2].value, "x");
    }

    #[test]
    fn test_format_string_as_yaml_is_raw() {
        let value = Value::String("alice/data".to_string());
        assert_eq!(format_value(&value, OutputFormat::Yaml).unwrap(), "alice/data");
    }

    #[test]
    fn test_format_json() {
        let rendered = format_value(&parse("a: 1\n"), OutputFormat::Json).unwrap();
        let back: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(back["a"], 1);
    }

    #[test]
    fn test_format_table_contains_keys() {
        let rendered = format_value(&parse("a:\n  b: 1\n"), OutputFormat::Table).unwrap();
        assert!(rendered.contains("a.b"));
        assert!(rendered.contains("Key"));
    }

    #[test]
    fn test_empty_table() {
        assert_eq!(format_table(&[]), "No data to display");
    }
}
