//! Web server module - Actix-web based HTTP control surface.
//!
//! The thin collaborator over the crawler and graph store: map CRUD,
//! scan start/stop, scan logs, and graph reads, all as JSON.

pub mod api;

use actix_web::{web, App, HttpServer};
use anyhow::Result;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;
use tracing_actix_web::TracingLogger;

use crate::config::NetmapConfig;
use crate::db::GraphStore;
use crate::scan::ScanRegistry;

/// Application state shared across all web handlers.
pub struct AppState {
    pub pool: SqlitePool,
    pub store: Arc<GraphStore>,
    pub registry: Arc<ScanRegistry>,
    pub config: Arc<NetmapConfig>,
}

impl AppState {
    pub fn new(config: Arc<NetmapConfig>, pool: SqlitePool) -> Self {
        Self {
            store: Arc::new(GraphStore::new(pool.clone())),
            registry: Arc::new(ScanRegistry::new()),
            pool,
            config,
        }
    }
}

/// Start the web server. Returns when the server shuts down normally.
pub async fn start_web_server(config: Arc<NetmapConfig>, pool: SqlitePool) -> Result<()> {
    let bind_addr = format!("0.0.0.0:{}", config.listen_port);
    info!("Starting netmapper web server on {}", bind_addr);

    let app_state = web::Data::new(AppState::new(config, pool));

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(TracingLogger::default())
            .configure(api::configure)
    })
    .bind(&bind_addr)?
    .run()
    .await?;

    Ok(())
}
