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

//! Connection manager: one explicitly owned MySQL pool, lent out one
//! connection at a time through a scoped guard.

use std::ops::{Deref, DerefMut};
use std::time::Duration;

use serde::Serialize;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlPool, MySqlPoolOptions};
use sqlx::pool::PoolConnection;
use sqlx::MySql;
use tokio::time::error::Elapsed;

use crate::config::Config;
use crate::error::{DbError, DbResult};

#[derive(Clone, Debug)]
pub struct DbPool {
    pool: MySqlPool,
    database: String,
    acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Open connections, idle or lent out.
    pub size: u32,
    pub idle: usize,
    pub max: u32,
}

impl PoolStats {
    pub fn borrowed(&self) -> usize {
        (self.size as usize).saturating_sub(self.idle)
    }
}

pub fn connect_options(config: &Config) -> MySqlConnectOptions {
    let mut opts = MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .database(config.database_name());
    if let Some(user) = &config.user {
        opts = opts.username(user);
    }
    if let Some(password) = &config.password {
        opts = opts.password(password);
    }
    opts
}

fn pool_options(config: &Config) -> MySqlPoolOptions {
    MySqlPoolOptions::new()
        .max_connections(config.pool_size)
        .acquire_timeout(config.acquire_timeout())
        .test_before_acquire(true)
}

impl DbPool {
    /// Open the pool and make sure at least one connection works.
    pub async fn connect(config: &Config) -> DbResult<Self> {
        let pool = pool_options(config)
            .min_connections(1)
            .connect_with(connect_options(config))
            .await
            .map_err(|e| {
                DbError::Configuration(format!(
                    "cannot connect to mysql://{}@{}:{}/{}: {}",
                    config.user.as_deref().unwrap_or_default(),
                    config.host,
                    config.port,
                    config.database_name(),
                    e
                ))
            })?;
        tracing::info!(
            host = %config.host,
            port = config.port,
            database = %config.database_name(),
            max_connections = config.pool_size,
            "connection pool ready"
        );
        Ok(Self::from_pool(pool, config))
    }

    /// Build the pool without dialing the server; connections open on first use.
    pub fn connect_lazy(config: &Config) -> Self {
        let pool = pool_options(config)
            .min_connections(0)
            .connect_lazy_with(connect_options(config));
        Self::from_pool(pool, config)
    }

    fn from_pool(pool: MySqlPool, config: &Config) -> Self {
        Self {
            pool,
            database: config.database_name().to_string(),
            acquire_timeout_secs: config.acquire_timeout_secs,
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Borrow a connection, waiting up to the acquire timeout. The connection
    /// goes back to the pool when the returned guard is dropped.
    pub async fn acquire(&self) -> DbResult<PooledConn> {
        let inner = self.pool.acquire().await.map_err(|e| {
            let err = DbError::from_driver(e, self.acquire_timeout_secs);
            tracing::warn!(error = %err, "failed to acquire connection");
            err
        })?;
        tracing::trace!(stats = ?self.stats(), "connection acquired");
        Ok(PooledConn {
            inner,
            acquire_timeout_secs: self.acquire_timeout_secs,
        })
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
            max: self.pool.options().get_max_connections(),
        }
    }

    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("connection pool closed");
    }
}

/// A borrowed connection. Dropping it releases the connection; after
/// [`PooledConn::discard`] the connection is closed instead and the pool
/// opens a fresh one when needed.
pub struct PooledConn {
    inner: PoolConnection<MySql>,
    acquire_timeout_secs: u64,
}

impl PooledConn {
    pub fn discard(&mut self) {
        self.inner.close_on_drop();
    }

    /// Turn the outcome of a statement bounded by `timeout` into a result.
    /// A failed or abandoned statement leaves the connection in an unknown
    /// state (open transaction, unread rows), so it is discarded.
    pub fn settle<T>(
        &mut self,
        outcome: Result<Result<T, sqlx::Error>, Elapsed>,
        timeout: Duration,
    ) -> DbResult<T> {
        let result = outcome_result(outcome, timeout, self.acquire_timeout_secs);
        if result.is_err() {
            self.discard();
        }
        result
    }
}

/// Map a statement bounded by `timeout` to its result: the elapsed case is a
/// `QueryTimeout`, driver failures go through [`DbError::from_driver`].
fn outcome_result<T>(
    outcome: Result<Result<T, sqlx::Error>, Elapsed>,
    timeout: Duration,
    acquire_timeout_secs: u64,
) -> DbResult<T> {
    match outcome {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(DbError::from_driver(e, acquire_timeout_secs)),
        Err(_) => Err(DbError::QueryTimeout {
            timeout_secs: timeout.as_secs(),
        }),
    }
}

impl Deref for PooledConn {
    type Target = MySqlConnection;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for PooledConn {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}
