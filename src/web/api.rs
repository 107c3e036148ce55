//! JSON API endpoints.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;

use super::AppState;
use crate::db;
use crate::scan::crawler;
use crate::scan::ScanState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/maps", web::get().to(list_maps))
        .route("/api/maps", web::post().to(create_map))
        .route("/api/maps/{id}", web::put().to(edit_map))
        .route("/api/maps/{id}", web::delete().to(remove_map))
        .route("/api/maps/{id}/rescan", web::post().to(rescan_map))
        .route("/scan", web::post().to(start_scan))
        .route("/scan/stop", web::post().to(stop_scan))
        .route("/api/devices", web::get().to(get_graph))
        .route("/api/logs", web::get().to(get_logs));
}

fn default_map_id() -> i64 {
    1
}

#[derive(Deserialize)]
struct MapBody {
    name: Option<String>,
    network: Option<String>,
    community: Option<String>,
}

#[derive(Deserialize)]
struct ScanRequest {
    network: Option<String>,
    community: Option<String>,
    #[serde(default = "default_map_id")]
    map_id: i64,
}

#[derive(Deserialize)]
struct StopRequest {
    #[serde(default = "default_map_id")]
    map_id: i64,
}

#[derive(Deserialize)]
struct MapQuery {
    #[serde(default = "default_map_id")]
    map_id: i64,
}

async fn list_maps(state: web::Data<AppState>) -> HttpResponse {
    match db::list_maps(&state.pool).await {
        Ok(maps) => HttpResponse::Ok().json(maps),
        Err(e) => {
            error!("Failed to list maps: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({"error": "Internal server error"}))
        }
    }
}

async fn create_map(state: web::Data<AppState>, body: web::Json<MapBody>) -> HttpResponse {
    let Some(name) = body.name.as_deref().filter(|n| !n.is_empty()) else {
        return HttpResponse::BadRequest().json(serde_json::json!({"error": "Name required"}));
    };

    match db::create_map(&state.pool, name).await {
        Ok(id) => {
            if body.network.is_some() || body.community.is_some() {
                if let Err(e) = db::update_map(
                    &state.pool,
                    id,
                    name,
                    body.network.as_deref(),
                    body.community.as_deref(),
                )
                .await
                {
                    error!(map_id = id, "Failed to save scan settings: {}", e);
                }
            }
            HttpResponse::Ok().json(serde_json::json!({"id": id, "name": name}))
        }
        Err(e) => {
            error!("Failed to create map: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({"error": "Internal server error"}))
        }
    }
}

async fn edit_map(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<MapBody>,
) -> HttpResponse {
    let map_id = path.into_inner();
    let Some(name) = body.name.as_deref().filter(|n| !n.is_empty()) else {
        return HttpResponse::BadRequest().json(serde_json::json!({"error": "Name required"}));
    };

    match db::update_map(
        &state.pool,
        map_id,
        name,
        body.network.as_deref(),
        body.community.as_deref(),
    )
    .await
    {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({"status": "updated"})),
        Err(e) => {
            error!(map_id, "Failed to update map: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({"error": "Internal server error"}))
        }
    }
}

async fn remove_map(state: web::Data<AppState>, path: web::Path<i64>) -> HttpResponse {
    let map_id = path.into_inner();
    match db::delete_map(&state.pool, map_id).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({"status": "deleted"})),
        Err(e) => {
            error!(map_id, "Failed to delete map: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({"error": "Internal server error"}))
        }
    }
}

async fn start_scan(state: web::Data<AppState>, body: web::Json<ScanRequest>) -> HttpResponse {
    let network = body.network.as_deref().filter(|n| !n.is_empty());
    let community = body.community.as_deref().filter(|c| !c.is_empty());
    let (Some(network), Some(community)) = (network, community) else {
        return HttpResponse::BadRequest()
            .json(serde_json::json!({"error": "Missing network or community"}));
    };
    let map_id = body.map_id;

    let scan = match state.registry.begin(map_id) {
        Ok(scan) => scan,
        Err(e) => return HttpResponse::Conflict().json(serde_json::json!({"error": e.to_string()})),
    };

    // Save settings to the map record for future rescans.
    match db::find_map(&state.pool, map_id).await {
        Ok(Some(map)) => {
            if let Err(e) =
                db::update_map(&state.pool, map_id, &map.name, Some(network), Some(community)).await
            {
                error!(map_id, "Failed to save scan settings: {}", e);
            }
        }
        Ok(None) => {}
        Err(e) => error!(map_id, "Failed to look up map: {}", e),
    }

    scan.log(format!("Starting scan for {network} on Map {map_id}"));
    launch_scan(&state, scan, map_id, network.to_string(), community.to_string());

    HttpResponse::Ok().json(serde_json::json!({
        "status": "Scan started",
        "message": format!("Scanning {network} with community {community}")
    }))
}

async fn stop_scan(state: web::Data<AppState>, body: web::Json<StopRequest>) -> HttpResponse {
    if state.registry.request_stop(body.map_id) {
        HttpResponse::Ok().json(serde_json::json!({
            "status": "Stopping",
            "message": "Scan stop requested."
        }))
    } else {
        HttpResponse::BadRequest()
            .json(serde_json::json!({"error": "No active scan for this map"}))
    }
}

async fn rescan_map(state: web::Data<AppState>, path: web::Path<i64>) -> HttpResponse {
    let map_id = path.into_inner();

    let map = match db::find_map(&state.pool, map_id).await {
        Ok(map) => map,
        Err(e) => {
            error!(map_id, "Failed to look up map: {}", e);
            return HttpResponse::InternalServerError()
                .json(serde_json::json!({"error": "Internal server error"}));
        }
    };
    let settings = map.and_then(|m| {
        let network = m.network.filter(|n| !n.is_empty())?;
        let community = m.community.filter(|c| !c.is_empty())?;
        Some((network, community))
    });
    let Some((network, community)) = settings else {
        return HttpResponse::BadRequest()
            .json(serde_json::json!({"error": "Map has no saved scan settings"}));
    };

    let scan = match state.registry.begin(map_id) {
        Ok(scan) => scan,
        Err(e) => return HttpResponse::Conflict().json(serde_json::json!({"error": e.to_string()})),
    };

    scan.log(format!("Rescanning {network} on Map {map_id}"));
    launch_scan(&state, scan, map_id, network, community);

    HttpResponse::Ok().json(serde_json::json!({"status": "Rescan started"}))
}

async fn get_graph(state: web::Data<AppState>, query: web::Query<MapQuery>) -> HttpResponse {
    let devices = state
        .store
        .devices_by_map(query.map_id)
        .await
        .unwrap_or_default();
    let links = state
        .store
        .links_by_map(query.map_id)
        .await
        .unwrap_or_default();
    HttpResponse::Ok().json(serde_json::json!({"nodes": devices, "edges": links}))
}

async fn get_logs(state: web::Data<AppState>, query: web::Query<MapQuery>) -> HttpResponse {
    let (logs, active) = state.registry.logs(query.map_id);
    HttpResponse::Ok().json(serde_json::json!({"logs": logs, "active": active}))
}

fn launch_scan(
    state: &AppState,
    scan: Arc<ScanState>,
    map_id: i64,
    network: String,
    community: String,
) {
    let store = state.store.clone();
    let config = state.config.clone();
    tokio::spawn(crawler::run_scan(
        store, scan, config, map_id, network, community,
    ));
}
