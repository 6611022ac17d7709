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

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use serde::{Deserializer, Serialize};
use serde_json::{Map, Number, Value};
use sqlx::mysql::MySqlRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

/// Accept a number written either as an integer or as a numeric string,
/// eg: `port = 3306` and `port = "3306"` both work in the config file.
pub fn deserialize_number_lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64> + FromStr,
{
    use serde::de::{self, Unexpected, Visitor};

    struct NumberVisitor<T>(PhantomData<T>);

    impl<'de, T> Visitor<'de> for NumberVisitor<T>
    where
        T: TryFrom<u64> + FromStr,
    {
        type Value = T;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a non-negative integer or a numeric string")
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            T::try_from(value).map_err(|_| E::invalid_value(Unexpected::Unsigned(value), &self))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if value < 0 {
                return Err(E::invalid_value(Unexpected::Signed(value), &self));
            }
            self.visit_u64(value as u64)
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            value
                .trim()
                .parse::<T>()
                .map_err(|_| E::invalid_value(Unexpected::Str(value), &self))
        }
    }

    deserializer.deserialize_any(NumberVisitor(PhantomData))
}

/// Result of one statement: column names in driver order plus the rows,
/// each row keyed by column name in the same order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
    pub row_count: usize,
    /// Set when the row cap stopped the fetch early.
    pub truncated: bool,
}

impl RowSet {
    /// Append a row. The first row fixes the column names from its own
    /// metadata, so the keys always match what the server actually returned.
    pub fn push(&mut self, row: &MySqlRow) {
        if self.columns.is_empty() {
            self.columns = column_names(row);
        }
        self.rows.push(row_to_json(&self.columns, row));
        self.row_count = self.rows.len();
    }

    /// Name the columns of a result that returned no row. Rows that were read
    /// keep their own names.
    pub fn label_if_empty<I>(&mut self, names: I)
    where
        I: IntoIterator<Item = String>,
    {
        if self.columns.is_empty() {
            self.columns = dedupe_names(names);
        }
    }
}

/// Column names of a row. Repeated names (eg: `SELECT a.id, b.id`) get a
/// numeric suffix so every key in the row mapping stays unique.
pub fn column_names(row: &MySqlRow) -> Vec<String> {
    dedupe_names(row.columns().iter().map(|c| c.name().to_string()))
}

pub fn dedupe_names<I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut out: Vec<String> = Vec::new();
    for name in names {
        let mut candidate = name.clone();
        let mut n = 2;
        while out.contains(&candidate) {
            candidate = format!("{}_{}", name, n);
            n += 1;
        }
        out.push(candidate);
    }
    out
}

pub fn row_to_json(columns: &[String], row: &MySqlRow) -> Map<String, Value> {
    let mut map = Map::with_capacity(columns.len());
    for (idx, name) in columns.iter().enumerate() {
        map.insert(name.clone(), column_value(row, idx));
    }
    map
}

/// How a MySQL column type is rendered in JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    Null,
    Signed,
    Unsigned,
    Float,
    Binary,
    Text,
}

pub fn json_kind(type_name: &str) -> JsonKind {
    let upper = type_name.to_ascii_uppercase();
    match upper.as_str() {
        "NULL" => JsonKind::Null,
        "BOOLEAN" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            JsonKind::Signed
        }
        "FLOAT" | "DOUBLE" => JsonKind::Float,
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT"
        | "GEOMETRY" => JsonKind::Binary,
        // DECIMAL stays text to keep its exact digits
        s if s.ends_with(" UNSIGNED") => match json_kind(s.trim_end_matches(" UNSIGNED")) {
            JsonKind::Signed => JsonKind::Unsigned,
            other => other,
        },
        _ => JsonKind::Text,
    }
}

pub fn column_value(row: &MySqlRow, idx: usize) -> Value {
    match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(_) => {}
        Err(_) => return Value::Null,
    }

    let type_name = row.columns()[idx].type_info().name();
    match json_kind(type_name) {
        JsonKind::Null => Value::Null,
        JsonKind::Signed => row
            .try_get_unchecked::<i64, _>(idx)
            .map(Value::from)
            .unwrap_or_else(|_| text_value(row, idx)),
        JsonKind::Unsigned => row
            .try_get_unchecked::<u64, _>(idx)
            .map(Value::from)
            .unwrap_or_else(|_| text_value(row, idx)),
        JsonKind::Float => row
            .try_get_unchecked::<f64, _>(idx)
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| text_value(row, idx)),
        JsonKind::Binary => bytes_value(row, idx),
        JsonKind::Text => text_value(row, idx),
    }
}

fn text_value(row: &MySqlRow, idx: usize) -> Value {
    match row.try_get_unchecked::<String, _>(idx) {
        Ok(s) => Value::String(s),
        Err(_) => bytes_value(row, idx),
    }
}

fn bytes_value(row: &MySqlRow, idx: usize) -> Value {
    match row.try_get_unchecked::<Vec<u8>, _>(idx) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(s) => Value::String(s),
            Err(e) => Value::String(format!("<binary {} bytes>", e.as_bytes().len())),
        },
        Err(_) => Value::Null,
    }
}

/// Read a text cell no matter how the server typed it. information_schema and
/// SHOW output come back as VARBINARY on some MySQL 8 builds.
pub fn text_at(row: &MySqlRow, idx: usize) -> Option<String> {
    match column_value(row, idx) {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}
