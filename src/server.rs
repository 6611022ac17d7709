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

use std::fs::OpenOptions;
use std::sync::Mutex;

use crate::config::Config;
use crate::dbpool::DbPool;
use crate::error::{DbError, DbResult};
use crate::functools::{self, OutputFormat};
use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::*,
    schemars,
    service::RequestContext,
    tool, tool_handler, tool_router,
    transport::stdio,
    ErrorData as McpError, RoleServer, ServerHandler, ServiceExt,
};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

pub const URI_SCHEME: &str = "mysql://";
pub const SCHEMA_PATH: &str = "schema";

// -----------------------------
// Args / DTOs
// -----------------------------

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct QueryArgs {
    /// SQL query to execute. Only SELECT, SHOW, DESCRIBE and EXPLAIN are allowed.
    pub sql: String,

    /// Output format: `json` (default) or `markdown`
    #[serde(default)]
    pub format: Option<OutputFormat>,
}

// -----------------------------
// Resource URIs
// -----------------------------

pub fn table_resource_uri(table: &str) -> String {
    format!("{}{}/{}", URI_SCHEME, table, SCHEMA_PATH)
}

/// Extract the table name from `mysql://{table}/schema`.
pub fn parse_table_uri(uri: &str) -> DbResult<String> {
    let invalid = || DbError::InvalidResourceUri(uri.to_string());
    let rest = uri.strip_prefix(URI_SCHEME).ok_or_else(invalid)?;
    let parts: Vec<&str> = rest.split('/').collect();
    match parts.as_slice() {
        [table, path] if !table.is_empty() && *path == SCHEMA_PATH => Ok(table.to_string()),
        _ => Err(invalid()),
    }
}

// -----------------------------
// Server impl
// -----------------------------

#[derive(Clone)]
pub struct DatabaseExplorer {
    tool_router: ToolRouter<DatabaseExplorer>,
    config: Config,
    pool: DbPool,
}

#[tool_router]
impl DatabaseExplorer {
    pub fn new(config: Config, pool: DbPool) -> Self {
        Self {
            tool_router: Self::tool_router(),
            config,
            pool,
        }
    }

    fn create_table_resource(&self, table: &str) -> Resource {
        let mut raw = RawResource::new(table_resource_uri(table), format!("Table: {}", table));
        raw.description = Some(format!(
            "Table schema, create statement and sample data: {}",
            table
        ));
        raw.mime_type = Some("application/json".to_string());
        raw.no_annotation()
    }

    // -------------------------
    // Tools
    // -------------------------

    /// query: run one read-only SQL statement
    #[tool(
        description = "Run a read-only SQL query (SELECT, SHOW, DESCRIBE or EXPLAIN). One statement per call. Returns rows as column-name to value mappings.",
        annotations(read_only_hint = true, destructive_hint = false)
    )]
    async fn query(
        &self,
        Parameters(args): Parameters<QueryArgs>,
    ) -> Result<CallToolResult, McpError> {
        functools::query(
            &self.config,
            &self.pool,
            &args.sql,
            args.format.unwrap_or_default(),
        )
        .await
    }
}

// -----------------------------
// ServerHandler impl
// -----------------------------

#[tool_handler]
impl ServerHandler for DatabaseExplorer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_resources()
                .enable_tools()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(format!(
                "MySQL explorer for database '{}'. Resources: one per table at mysql://{{table}}/schema (columns, create statement, sample rows). Tool: query {{ sql, format? }} runs a single read-only statement.",
                self.pool.database()
            )),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let tables = functools::list_tables(&self.config, &self.pool)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "failed to list resources"))?;
        Ok(ListResourcesResult {
            resources: tables
                .iter()
                .map(|t| self.create_table_resource(t))
                .collect(),
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        ReadResourceRequestParam { uri }: ReadResourceRequestParam,
        _: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        tracing::info!(%uri, "reading resource");
        let table = parse_table_uri(&uri)?;
        let desc = functools::describe_table(&self.config, &self.pool, &table)
            .await
            .inspect_err(|e| tracing::error!(%uri, error = %e, "failed to read resource"))?;
        let text = serde_json::to_string_pretty(&desc)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, uri)],
        })
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParam>,
        _: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, McpError> {
        Ok(ListResourceTemplatesResult {
            next_cursor: None,
            resource_templates: Vec::new(),
        })
    }
}

// -----------------------------
// Logging
// -----------------------------

/// stdout carries the protocol, so logs go to stderr or to `log_file`.
pub fn init_tracing(config: &Config) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_ansi(false);

    let installed = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder.with_writer(Mutex::new(file)).try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    if let Err(e) = installed {
        eprintln!("tracing already initialized: {}", e);
    }
    Ok(())
}

// -----------------------------
// Main: run over stdio
// -----------------------------

pub async fn run(config: Config) -> anyhow::Result<()> {
    init_tracing(&config)?;

    let pool = DbPool::connect(&config)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "cannot open connection pool"))?;

    tracing::info!("Starting MCP server");

    let service = DatabaseExplorer::new(config, pool.clone())
        .serve(stdio())
        .await
        .inspect_err(|e| {
            tracing::error!("serving error: {:?}", e);
        })?;

    let quit_reason = service.waiting().await;
    pool.close().await;
    quit_reason?;

    Ok(())
}
