use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};
use clap::Parser;

use company_connector::config::{AppConfig, ServerConfig};
use company_connector::init::init_tracing;
use company_connector::web;

#[derive(Parser)]
#[command(name = "company-connector")]
#[command(about = "REST connector exposing read-only SELECT access to the company schema")]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "BIND_HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Schema every query must reference
    #[arg(long, env = "QUERY_SCHEMA", default_value = sql_policy::DEFAULT_SCHEMA)]
    schema: String,

    /// Maximum pooled database connections
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 5)]
    max_connections: u32,

    /// Server-side statement timeout in seconds
    #[arg(long, env = "DB_STATEMENT_TIMEOUT_SECS")]
    statement_timeout_secs: Option<u64>,

    /// API key placeholder (not enforced)
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let cli = Cli::parse();

    let server = ServerConfig {
        bind_addr: SocketAddr::new(cli.host, cli.port),
        schema: cli.schema,
        max_connections: cli.max_connections,
        statement_timeout_secs: cli.statement_timeout_secs,
        api_key: cli.api_key,
    };

    let config = AppConfig::load(server).context("Failed to resolve database configuration")?;

    tracing::info!(
        db = ?config.db,
        api_key_configured = config.server.api_key.is_some(),
        "Configuration loaded"
    );

    web::serve(&config).await
}
