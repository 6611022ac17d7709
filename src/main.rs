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

use clap::{Parser, Subcommand};
use std::process::exit;

use mysql_mcp::config::{Config, DEFAULT_CONFIG_FILE};
use mysql_mcp::dbpool::DbPool;
use mysql_mcp::{functools, server};

#[derive(Parser, Debug)]
#[command(name = "mysql-mcp")]
#[command(about = "MCP server exposing MySQL schema metadata and read-only queries")]
#[command(author, version, long_about=None)]
struct Args {
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: String,

    #[command(subcommand)]
    command: CommandEnum,
}

/// Enum of subcommands
#[derive(Subcommand, Debug)]
enum CommandEnum {
    /// Run the MCP server over stdio
    Run,
    /// Connect to the database and list its tables.
    Check {
        #[arg(short, long, help = "Also print the description of this table")]
        describe: Option<String>,
    },
    /// Print version info
    Version,
}

fn load_config(path: &str) -> Config {
    Config::load(path).unwrap_or_else(|err| {
        eprintln!("Error loading configuration ({}): {}", path, err);
        exit(1);
    })
}

async fn check(config: Config, describe: Option<String>) -> anyhow::Result<()> {
    let pool = DbPool::connect(&config).await?;
    let tables = functools::list_tables(&config, &pool).await?;
    println!(
        "Connected to {}:{}/{} ({} tables)",
        config.host,
        config.port,
        pool.database(),
        tables.len()
    );
    for table in &tables {
        println!("  - {}", table);
    }
    if let Some(name) = describe {
        let desc = functools::describe_table(&config, &pool, &name).await?;
        println!("\n{}", desc.to_markdown());
    }
    pool.close().await;
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let args = Args::parse();

    let result = match args.command {
        CommandEnum::Run => server::run(load_config(&args.config)).await,
        CommandEnum::Check { describe } => check(load_config(&args.config), describe).await,
        CommandEnum::Version => {
            println!("Version {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        exit(1);
    }
}
