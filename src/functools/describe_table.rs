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

use futures::TryStreamExt;
use serde::Serialize;
use sqlx::Executor;

use crate::config::Config;
use crate::dbpool::DbPool;
use crate::error::{DbError, DbResult};
use crate::functools::list_tables;
use crate::serdeutil::{text_at, RowSet};
use crate::stringutil::{escape_cell, markdown_table, quote_identifier};

const COLUMNS_SQL: &str = "SELECT COLUMN_NAME, COLUMN_TYPE, IS_NULLABLE, COLUMN_KEY, \
     COLUMN_DEFAULT, EXTRA FROM information_schema.COLUMNS \
     WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? ORDER BY ORDINAL_POSITION";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ColumnInfo {
    pub field: String,
    #[serde(rename = "type")]
    pub column_type: String,
    pub nullable: bool,
    pub key: String,
    pub default: Option<String>,
    pub extra: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableDescription {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    pub create_statement: String,
    pub sample: RowSet,
}

/// Schema, create statement and a few sample rows of one table.
///
/// `name` is checked against the live table list before anything touches
/// the table itself; an unknown name fails without being sent to the server.
pub async fn describe_table(config: &Config, pool: &DbPool, name: &str) -> DbResult<TableDescription> {
    let tables = list_tables(config, pool).await?;
    let name = tables
        .into_iter()
        .find(|t| t == name)
        .ok_or_else(|| DbError::UnknownTable(name.to_string()))?;

    tracing::info!(table = %name, "describing table");
    let timeout = config.query_timeout();
    let quoted = quote_identifier(&name);
    let mut conn = pool.acquire().await?;

    let outcome = tokio::time::timeout(
        timeout,
        sqlx::query(COLUMNS_SQL)
            .bind(pool.database())
            .bind(&name)
            .fetch_all(&mut *conn),
    )
    .await;
    let columns = conn
        .settle(outcome, timeout)?
        .iter()
        .map(|row| ColumnInfo {
            field: text_at(row, 0).unwrap_or_default(),
            column_type: text_at(row, 1).unwrap_or_default(),
            nullable: text_at(row, 2).map_or(false, |v| v.eq_ignore_ascii_case("YES")),
            key: text_at(row, 3).unwrap_or_default(),
            default: text_at(row, 4),
            extra: text_at(row, 5).unwrap_or_default(),
        })
        .collect::<Vec<_>>();

    let show_create = format!("SHOW CREATE TABLE {}", quoted);
    let outcome = tokio::time::timeout(timeout, conn.fetch_one(sqlx::raw_sql(&show_create))).await;
    let create_statement = text_at(&conn.settle(outcome, timeout)?, 1).unwrap_or_default();

    let select_sample = format!("SELECT * FROM {} LIMIT {}", quoted, config.sample_rows);
    let outcome = tokio::time::timeout(timeout, async {
        let mut sample = RowSet::default();
        let mut rows = sqlx::raw_sql(&select_sample).fetch(&mut *conn);
        while let Some(row) = rows.try_next().await? {
            sample.push(&row);
        }
        Ok::<_, sqlx::Error>(sample)
    })
    .await;
    let mut sample = conn.settle(outcome, timeout)?;
    sample.label_if_empty(columns.iter().map(|c| c.field.clone()));

    tracing::debug!(
        table = %name,
        columns = columns.len(),
        sample_rows = sample.row_count,
        "table described"
    );
    Ok(TableDescription {
        name,
        columns,
        create_statement,
        sample,
    })
}

impl TableDescription {
    /// Markdown document with the columns, the create statement and the sample rows.
    pub fn to_markdown(&self) -> String {
        let mut out = format!("## Table: {}\n\n", self.name);
        out.push_str("### Columns:\n\n");
        out.push_str("| Field | Type | Null | Key | Default | Extra |\n");
        out.push_str("|-------|------|------|-----|---------|-------|\n");
        for c in &self.columns {
            out.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} |\n",
                escape_cell(&c.field),
                escape_cell(&c.column_type),
                if c.nullable { "YES" } else { "NO" },
                escape_cell(&c.key),
                c.default.as_deref().map_or_else(|| "NULL".to_string(), escape_cell),
                escape_cell(&c.extra),
            ));
        }
        out.push_str(&format!(
            "\n### Create Table SQL:\n\n```sql\n{}\n```\n",
            self.create_statement
        ));
        out.push_str("\n### Sample Data:\n\n");
        out.push_str(&markdown_table(&self.sample.columns, &self.sample.rows));
        out
    }
}
