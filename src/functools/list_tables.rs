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

use crate::config::Config;
use crate::dbpool::DbPool;
use crate::error::DbResult;
use crate::serdeutil::text_at;

const LIST_TABLES_SQL: &str = "SELECT TABLE_NAME FROM information_schema.TABLES \
     WHERE TABLE_SCHEMA = ? ORDER BY TABLE_NAME";

/// Names of the tables (and views) in the configured database, sorted by name.
pub async fn list_tables(config: &Config, pool: &DbPool) -> DbResult<Vec<String>> {
    tracing::info!(database = %pool.database(), "listing tables");
    let timeout = config.query_timeout();
    let mut conn = pool.acquire().await?;

    let outcome = tokio::time::timeout(
        timeout,
        sqlx::query(LIST_TABLES_SQL)
            .bind(pool.database())
            .fetch_all(&mut *conn),
    )
    .await;
    let rows = conn.settle(outcome, timeout)?;

    // server collation decides ORDER BY, so sort again for a stable order
    let mut tables: Vec<String> = rows.iter().filter_map(|row| text_at(row, 0)).collect();
    tables.sort();
    tables.dedup();
    tracing::debug!(count = tables.len(), "tables listed");
    Ok(tables)
}
