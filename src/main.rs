//! netmapper: topology discovery server.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "netmapper", about = "SNMP/LLDP network topology mapper")]
struct Cli {
    /// Configuration directory
    #[arg(short, long)]
    config: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// SQLite database file (overrides config)
    #[arg(short, long)]
    database: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();

    let mut config =
        netmapper::config::load_config(cli.config.as_deref().map(std::path::Path::new))?;
    if let Some(port) = cli.port {
        config.listen_port = port;
    }
    if let Some(database) = cli.database {
        config.database.path = database;
    }
    let config = Arc::new(config);

    let db = netmapper::db::DbPool::new(&config.database).await?;
    db.ping().await?;
    netmapper::db::run_migrations(db.get_pool()).await?;

    tracing::info!(
        "Netmapper {} starting on port {}",
        netmapper::VERSION,
        config.listen_port
    );

    netmapper::web::start_web_server(config, db.pool).await
}
