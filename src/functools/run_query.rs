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

use std::time::Duration;

use futures::TryStreamExt;
use rmcp::{model::*, schemars, ErrorData as McpError};
use serde::Deserialize;
use sqlx::mysql::MySqlConnection;

use crate::config::Config;
use crate::dbpool::DbPool;
use crate::error::{DbError, DbResult};
use crate::serdeutil::RowSet;
use crate::sqlguard;
use crate::stringutil::markdown_table;

type McpResult = Result<CallToolResult, McpError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `{ columns, rows, row_count, truncated }` with rows keyed by column name
    #[default]
    Json,
    /// A markdown table
    Markdown,
}

/// Validate and run one read-only statement.
///
/// Rejected statements never reach the pool. Accepted ones run on a detached
/// task, so if the caller goes away mid-request the statement still finishes
/// and its connection is released.
pub async fn run_query(config: &Config, pool: &DbPool, sql: &str) -> DbResult<RowSet> {
    let stmt = sqlguard::validate(sql)?;
    tracing::info!(kind = %stmt.kind, sql = %stmt.sql, "executing query");

    let pool = pool.clone();
    let max_rows = config.max_rows;
    let timeout = config.query_timeout();
    let task = tokio::spawn(async move { execute(&pool, &stmt.sql, max_rows, timeout).await });

    let set = task
        .await
        .map_err(|e| DbError::QueryExecution(format!("query task failed: {}", e)))??;
    tracing::debug!(rows = set.row_count, truncated = set.truncated, "query finished");
    Ok(set)
}

async fn execute(pool: &DbPool, sql: &str, max_rows: usize, timeout: Duration) -> DbResult<RowSet> {
    let mut conn = pool.acquire().await?;
    let outcome = tokio::time::timeout(timeout, fetch_capped(&mut conn, sql, max_rows)).await;
    let set = conn.settle(outcome, timeout)?;
    if set.truncated {
        // rows past the cap are still pending on the wire
        conn.discard();
    }
    Ok(set)
}

/// Stream rows until the result ends or `max_rows` have been collected.
async fn fetch_capped(
    conn: &mut MySqlConnection,
    sql: &str,
    max_rows: usize,
) -> Result<RowSet, sqlx::Error> {
    let mut set = RowSet::default();
    let mut rows = sqlx::raw_sql(sql).fetch(conn);
    while let Some(row) = rows.try_next().await? {
        if set.row_count >= max_rows {
            set.truncated = true;
            break;
        }
        set.push(&row);
    }
    Ok(set)
}

/// The `query` tool: run the statement and render the rows, or hand the
/// client a structured error.
pub async fn query(config: &Config, pool: &DbPool, sql: &str, format: OutputFormat) -> McpResult {
    if sql.trim().is_empty() {
        mcp_return_err!(DbError::WriteStatementRejected(
            "SQL query is required".to_string()
        ));
    }

    let set = match run_query(config, pool, sql).await {
        Ok(set) => set,
        Err(e) => {
            if e.is_transient() {
                tracing::warn!(kind = e.kind(), error = %e, "query failed, retry later");
            } else {
                tracing::error!(kind = e.kind(), error = %e, "query failed");
            }
            mcp_return_err!(e);
        }
    };

    match format {
        OutputFormat::Json => {
            let text = serde_json::to_string_pretty(&set)
                .map_err(|e| McpError::new(ErrorCode::INTERNAL_ERROR, format!("{}", e), None))?;
            mcp_return!(text)
        }
        OutputFormat::Markdown => {
            let mut text = markdown_table(&set.columns, &set.rows);
            if set.truncated {
                text.push_str(&format!("\n(truncated to {} rows)\n", set.row_count));
            }
            mcp_return!(text)
        }
    }
}
