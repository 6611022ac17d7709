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

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{DbError, DbResult};
use crate::serdeutil::deserialize_number_lenient;

pub const DEFAULT_CONFIG_FILE: &str = "mysql-mcp.conf";

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port", deserialize_with = "deserialize_number_lenient")]
    pub port: u16,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default, alias = "db")]
    pub database: Option<String>,

    #[serde(default = "default_pool_size", deserialize_with = "deserialize_number_lenient")]
    pub pool_size: u32,

    /// Seconds to wait for a free pooled connection.
    #[serde(
        default = "default_timeout_secs",
        deserialize_with = "deserialize_number_lenient"
    )]
    pub acquire_timeout_secs: u64,

    #[serde(
        default = "default_timeout_secs",
        deserialize_with = "deserialize_number_lenient"
    )]
    pub query_timeout_secs: u64,

    /// Upper bound on rows returned by one `query` call.
    #[serde(default = "default_max_rows", deserialize_with = "deserialize_number_lenient")]
    pub max_rows: usize,

    /// Rows shown in a table resource.
    #[serde(
        default = "default_sample_rows",
        deserialize_with = "deserialize_number_lenient"
    )]
    pub sample_rows: usize,

    #[serde(default)]
    pub log_file: Option<String>,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    3306
}

fn default_pool_size() -> u32 {
    10
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_rows() -> usize {
    1000
}

fn default_sample_rows() -> usize {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            user: None,
            password: None,
            database: None,
            pool_size: default_pool_size(),
            acquire_timeout_secs: default_timeout_secs(),
            query_timeout_secs: default_timeout_secs(),
            max_rows: default_max_rows(),
            sample_rows: default_sample_rows(),
            log_file: None,
        }
    }
}

impl Config {
    pub fn from_toml_str(toml_str: &str) -> Result<Config, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Read the config file when it exists, overlay `MYSQL_*` environment
    /// variables, then validate.
    pub fn load(file_path: &str) -> DbResult<Config> {
        let mut config = if Path::new(file_path).exists() {
            let content = std::fs::read_to_string(file_path).map_err(|e| {
                DbError::Configuration(format!("cannot read {}: {}", file_path, e))
            })?;
            Self::from_toml_str(&content).map_err(|e| {
                DbError::Configuration(format!("cannot parse {}: {}", file_path, e))
            })?
        } else {
            Config::default()
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay values from an environment lookup. Empty values count as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> DbResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("MYSQL_HOST") {
            self.host = v;
        }
        if let Some(v) = get("MYSQL_PORT") {
            self.port = parse_env("MYSQL_PORT", &v)?;
        }
        if let Some(v) = get("MYSQL_USER") {
            self.user = Some(v);
        }
        if let Some(v) = get("MYSQL_PASSWORD") {
            self.password = Some(v);
        }
        if let Some(v) = get("MYSQL_DB") {
            self.database = Some(v);
        }
        if let Some(v) = get("MYSQL_POOL_SIZE") {
            self.pool_size = parse_env("MYSQL_POOL_SIZE", &v)?;
        }
        if let Some(v) = get("MYSQL_ACQUIRE_TIMEOUT_SECS") {
            self.acquire_timeout_secs = parse_env("MYSQL_ACQUIRE_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("MYSQL_QUERY_TIMEOUT_SECS") {
            self.query_timeout_secs = parse_env("MYSQL_QUERY_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("MYSQL_MAX_ROWS") {
            self.max_rows = parse_env("MYSQL_MAX_ROWS", &v)?;
        }
        if let Some(v) = get("MYSQL_SAMPLE_ROWS") {
            self.sample_rows = parse_env("MYSQL_SAMPLE_ROWS", &v)?;
        }
        if let Some(v) = get("MYSQL_LOG_FILE") {
            self.log_file = Some(v);
        }
        Ok(())
    }

    pub fn validate(&self) -> DbResult<()> {
        let mut missing = Vec::new();
        if is_blank(&self.user) {
            missing.push("MYSQL_USER");
        }
        if is_blank(&self.password) {
            missing.push("MYSQL_PASSWORD");
        }
        if is_blank(&self.database) {
            missing.push("MYSQL_DB");
        }
        if !missing.is_empty() {
            return Err(DbError::Configuration(format!(
                "missing required database configuration: {}",
                missing.join(", ")
            )));
        }
        if self.host.trim().is_empty() {
            return Err(DbError::Configuration("host must not be empty".into()));
        }
        if self.pool_size == 0 {
            return Err(DbError::Configuration("pool size must be at least 1".into()));
        }
        if self.acquire_timeout_secs == 0 || self.query_timeout_secs == 0 {
            return Err(DbError::Configuration("timeouts must be at least 1 second".into()));
        }
        if self.max_rows == 0 {
            return Err(DbError::Configuration("max rows must be at least 1".into()));
        }
        Ok(())
    }

    pub fn database_name(&self) -> &str {
        self.database.as_deref().unwrap_or_default()
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

fn is_blank(v: &Option<String>) -> bool {
    v.as_deref().map_or(true, |s| s.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> DbResult<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| DbError::Configuration(format!("{} has invalid value '{}'", key, value)))
}
