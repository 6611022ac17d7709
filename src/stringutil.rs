// Copyright (C) 2025 Nuwaira
// All Rights Reserved.
//
// NOTICE: All information contained herein is, and remains
// the property of Nuwaira.
// The intellectual and technical concepts contained
// herein are proprietary to Nuwaira
// and are protected by trade secret or copyright law.
// Dissemination of this information or reproduction of this material
// is strictly forbidden unless prior written permission is obtained
// from Nuwaira.

use serde_json::{Map, Value};

/// Quote a MySQL identifier with backticks, doubling any embedded backtick.
/// For example, given "order items" it returns "`order items`".
/// Only call this on names already checked against the live table list.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Render one JSON cell the way the markdown tables show it.
pub fn cell_text(value: &Value) -> String {
    let text = match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    escape_cell(&text)
}

/// Keep a cell on one line and stop `|` from splitting it.
pub fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
}

/// Markdown table: header, `---` separator row, then one line per row.
pub fn markdown_table(columns: &[String], rows: &[Map<String, Value>]) -> String {
    let mut out = String::new();
    if columns.is_empty() {
        return "(no rows)\n".to_string();
    }
    let header: Vec<String> = columns.iter().map(|c| escape_cell(c)).collect();
    out.push_str(&format!("| {} |\n", header.join(" | ")));
    out.push_str(&format!("| {} |\n", vec!["---"; columns.len()].join(" | ")));
    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|c| row.get(c).map_or_else(|| "NULL".to_string(), cell_text))
            .collect();
        out.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    out
}
