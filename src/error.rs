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

//! Error taxonomy shared by the pool, the catalog queries and the query tool.

use rmcp::ErrorData as McpError;
use serde_json::json;
use thiserror::Error;

pub type DbResult<T> = std::result::Result<T, DbError>;

#[derive(Error, Debug)]
pub enum DbError {
    /// Missing or invalid settings. Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No pooled connection became available within the acquire timeout.
    #[error("connection pool exhausted: no connection available after {timeout_secs}s")]
    PoolExhausted { timeout_secs: u64 },

    #[error("unknown table '{0}'")]
    UnknownTable(String),

    /// The statement was refused by the read-only guard and never executed.
    #[error("statement rejected: {0}")]
    WriteStatementRejected(String),

    #[error("query failed: {0}")]
    QueryExecution(String),

    #[error("query exceeded the {timeout_secs}s timeout")]
    QueryTimeout { timeout_secs: u64 },

    #[error("invalid resource uri '{0}'")]
    InvalidResourceUri(String),
}

impl DbError {
    /// Stable, machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            DbError::Configuration(_) => "ConfigurationError",
            DbError::PoolExhausted { .. } => "PoolExhausted",
            DbError::UnknownTable(_) => "UnknownTable",
            DbError::WriteStatementRejected(_) => "WriteStatementRejected",
            DbError::QueryExecution(_) => "QueryExecutionError",
            DbError::QueryTimeout { .. } => "QueryTimeout",
            DbError::InvalidResourceUri(_) => "InvalidResourceUri",
        }
    }

    /// Worth retrying later without changing the request.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DbError::PoolExhausted { .. } | DbError::QueryTimeout { .. }
        )
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "error": self.kind(),
            "message": self.to_string(),
        })
    }

    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }

    /// Wrap a driver error, keeping the database's own message.
    pub fn from_driver(err: sqlx::Error, acquire_timeout_secs: u64) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted {
                timeout_secs: acquire_timeout_secs,
            },
            sqlx::Error::Database(db_err) => DbError::QueryExecution(db_err.message().to_string()),
            other => DbError::QueryExecution(other.to_string()),
        }
    }
}

impl From<DbError> for McpError {
    fn from(err: DbError) -> Self {
        let data = Some(err.to_json());
        match err {
            DbError::UnknownTable(_) | DbError::InvalidResourceUri(_) => {
                McpError::resource_not_found(err.to_string(), data)
            }
            DbError::WriteStatementRejected(_) => McpError::invalid_params(err.to_string(), data),
            _ => McpError::internal_error(err.to_string(), data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinguishable() {
        let errors = vec![
            DbError::Configuration("x".into()),
            DbError::PoolExhausted { timeout_secs: 1 },
            DbError::UnknownTable("x".into()),
            DbError::WriteStatementRejected("x".into()),
            DbError::QueryExecution("x".into()),
            DbError::QueryTimeout { timeout_secs: 1 },
            DbError::InvalidResourceUri("x".into()),
        ];
        let mut kinds: Vec<_> = errors.iter().map(|e| e.kind()).collect();
        kinds.sort();
        kinds.dedup();
        assert_eq!(kinds.len(), errors.len());
    }

    #[test]
    fn json_body_carries_kind_and_message() {
        let err = DbError::UnknownTable("users".into());
        let v = err.to_json();
        assert_eq!(v["error"], "UnknownTable");
        assert_eq!(v["message"], "unknown table 'users'");
    }

    #[test]
    fn pool_timeout_maps_to_exhausted() {
        let err = DbError::from_driver(sqlx::Error::PoolTimedOut, 7);
        assert!(matches!(err, DbError::PoolExhausted { timeout_secs: 7 }));
        assert!(err.is_transient());
    }

    #[test]
    fn other_driver_errors_keep_message() {
        let err = DbError::from_driver(sqlx::Error::RowNotFound, 7);
        assert_eq!(err.kind(), "QueryExecutionError");
        assert!(err.to_string().contains("no rows returned"));
    }
}
