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

//! Tests against a real MySQL server.
//! Run with: MYSQL_USER=... MYSQL_PASSWORD=... MYSQL_DB=... cargo test -- --ignored

use std::collections::HashSet;
use std::time::Duration;

use mysql_mcp::config::Config;
use mysql_mcp::dbpool::DbPool;
use mysql_mcp::error::DbError;
use mysql_mcp::functools::{describe_table, list_tables, run_query};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

async fn live_setup(pool_size: u32) -> (Config, DbPool) {
    dotenv::dotenv().ok();
    let mut config = Config::default();
    config
        .apply_env(|key| std::env::var(key).ok())
        .expect("valid MYSQL_* environment");
    config.pool_size = pool_size;
    config.acquire_timeout_secs = 1;
    config.validate().expect("MYSQL_USER, MYSQL_PASSWORD and MYSQL_DB required");
    let pool = DbPool::connect(&config).await.expect("pool creation failed");
    (config, pool)
}

/// Connections go back to the pool on a background task, so give the
/// pool a moment before reading its counters.
async fn settled_borrowed(pool: &DbPool) -> usize {
    for _ in 0..20 {
        if pool.stats().borrowed() == 0 {
            return 0;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    pool.stats().borrowed()
}

#[cfg(test)]
mod live_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires database"]
    async fn test_select_one() {
        let (config, pool) = live_setup(2).await;
        let set = assert_ok!(run_query(&config, &pool, "SELECT 1").await);
        assert_eq!(set.columns, vec!["1"]);
        assert_eq!(set.rows.len(), 1);
        assert_eq!(json!(set.rows[0]), json!({"1": 1}));
        assert!(!set.truncated);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn test_column_order_preserved() {
        let (config, pool) = live_setup(2).await;
        let set = assert_ok!(
            run_query(&config, &pool, "SELECT 'x' AS zeta, 2 AS alpha, NULL AS mid").await
        );
        let keys: Vec<&String> = set.rows[0].keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert_eq!(set.rows[0]["mid"], serde_json::Value::Null);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn test_row_cap_truncates() {
        let (mut config, pool) = live_setup(2).await;
        config.max_rows = 2;
        let sql = "SELECT 1 AS n UNION ALL SELECT 2 UNION ALL SELECT 3";
        let set = assert_ok!(run_query(&config, &pool, sql).await);
        assert_eq!(set.row_count, 2);
        assert!(set.truncated);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn test_truncated_query_releases_connection() {
        let (mut config, pool) = live_setup(2).await;
        config.max_rows = 1;
        let sql = "SELECT 1 AS n UNION ALL SELECT 2 UNION ALL SELECT 3";
        let set = assert_ok!(run_query(&config, &pool, sql).await);
        assert!(set.truncated);
        assert_eq!(settled_borrowed(&pool).await, 0);
        // the discarded connection is replaced on demand
        assert_ok!(run_query(&config, &pool, "SELECT 1").await);
        assert_eq!(settled_borrowed(&pool).await, 0);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn test_no_connection_leak() {
        let (config, pool) = live_setup(3).await;
        assert_eq!(settled_borrowed(&pool).await, 0);

        assert_ok!(run_query(&config, &pool, "SELECT 1").await);
        assert_eq!(settled_borrowed(&pool).await, 0);

        let err = assert_err!(run_query(&config, &pool, "SELECT * FROM no_such_table_xyz").await);
        assert_eq!(err.kind(), "QueryExecutionError");
        assert_eq!(settled_borrowed(&pool).await, 0);

        assert_err!(run_query(&config, &pool, "DELETE FROM users").await);
        assert_eq!(settled_borrowed(&pool).await, 0);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn test_list_tables_is_stable() {
        let (config, pool) = live_setup(2).await;
        let first: HashSet<String> = assert_ok!(list_tables(&config, &pool).await)
            .into_iter()
            .collect();
        let second: HashSet<String> = assert_ok!(list_tables(&config, &pool).await)
            .into_iter()
            .collect();
        assert_eq!(first, second);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn test_describe_unknown_table() {
        let (config, pool) = live_setup(2).await;
        let err = assert_err!(describe_table(&config, &pool, "x`; DROP TABLE users; --").await);
        assert!(matches!(err, DbError::UnknownTable(_)));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn test_describe_known_table() {
        let (config, pool) = live_setup(2).await;
        let tables = assert_ok!(list_tables(&config, &pool).await);
        let Some(name) = tables.first() else {
            return;
        };
        let desc = assert_ok!(describe_table(&config, &pool, name).await);
        assert_eq!(&desc.name, name);
        assert!(!desc.columns.is_empty());
        assert!(desc.create_statement.to_uppercase().starts_with("CREATE"));
        assert!(desc.sample.row_count <= config.sample_rows);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn test_single_connection_never_deadlocks() {
        let (config, pool) = live_setup(1).await;
        let a = run_query(&config, &pool, "SELECT SLEEP(2) AS slept");
        let b = run_query(&config, &pool, "SELECT SLEEP(2) AS slept");
        let (ra, rb) = tokio::time::timeout(Duration::from_secs(15), async { tokio::join!(a, b) })
            .await
            .expect("concurrent queries must not hang");

        // acquire timeout is 1s, so one of the two waits too long
        let outcomes = [ra, rb];
        assert!(outcomes.iter().any(|r| r.is_ok()));
        for r in &outcomes {
            if let Err(e) = r {
                assert!(matches!(e, DbError::PoolExhausted { .. }), "{:?}", e);
            }
        }
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn test_query_timeout() {
        let (mut config, pool) = live_setup(2).await;
        config.query_timeout_secs = 1;
        let err = assert_err!(run_query(&config, &pool, "SELECT SLEEP(5)").await);
        assert!(matches!(err, DbError::QueryTimeout { timeout_secs: 1 }));
        // the abandoned connection is replaced, the pool keeps serving
        assert_ok!(run_query(&config, &pool, "SELECT 1").await);
    }

    /// INVISIBLE columns need MySQL 8.0.23 or later and a user allowed to
    /// create tables.
    #[tokio::test]
    #[ignore = "requires database"]
    async fn test_sample_skips_invisible_columns() {
        let (config, pool) = live_setup(2).await;
        {
            let mut conn = assert_ok!(pool.acquire().await);
            sqlx::raw_sql("DROP TABLE IF EXISTS sample_invisible_cols")
                .execute(&mut *conn)
                .await
                .expect("drop table");
            sqlx::raw_sql("CREATE TABLE sample_invisible_cols (a INT, b INT INVISIBLE, c INT)")
                .execute(&mut *conn)
                .await
                .expect("create table");
            sqlx::raw_sql("INSERT INTO sample_invisible_cols (a, b, c) VALUES (1, 2, 3)")
                .execute(&mut *conn)
                .await
                .expect("insert row");
        }

        let desc = describe_table(&config, &pool, "sample_invisible_cols").await;

        let mut conn = assert_ok!(pool.acquire().await);
        sqlx::raw_sql("DROP TABLE sample_invisible_cols")
            .execute(&mut *conn)
            .await
            .expect("drop table");

        let desc = assert_ok!(desc);
        assert_eq!(desc.columns.len(), 3);
        assert_eq!(desc.sample.columns, vec!["a", "c"]);
        assert_eq!(json!(desc.sample.rows[0]), json!({"a": 1, "c": 3}));
    }
}
