//! Integration tests for the graph store and schema bootstrap.

use netmapper::config::DatabaseConfig;
use netmapper::db::{self, DbPool, GraphStore, LinkUpsert};
use netmapper::models::DeviceType;
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;

struct TestStore {
    // Held so the database file outlives the pool.
    _dir: TempDir,
    pool: SqlitePool,
    store: Arc<GraphStore>,
    map_id: i64,
}

async fn setup() -> TestStore {
    let dir = TempDir::new().expect("tempdir");
    let config = DatabaseConfig {
        path: dir.path().join("test.db").to_string_lossy().into_owned(),
    };
    let db = DbPool::new(&config).await.expect("open db");
    db::run_migrations(db.get_pool()).await.expect("migrate");
    let map_id = db::create_map(db.get_pool(), "test").await.expect("map");
    TestStore {
        _dir: dir,
        store: Arc::new(GraphStore::new(db.pool.clone())),
        pool: db.pool,
        map_id,
    }
}

fn link(source_ip: &str, target_ip: &str) -> LinkUpsert {
    LinkUpsert {
        source_ip: source_ip.to_string(),
        target_ip: target_ip.to_string(),
        protocol: "LLDP".to_string(),
        source_port: String::new(),
        target_port: String::new(),
        speed: String::new(),
        status: String::new(),
        source_vlan: String::new(),
        target_vlan: String::new(),
        source_is_root: false,
        target_is_root: false,
    }
}

// ==================== Device Merge Semantics ====================

#[tokio::test]
async fn test_device_upsert_inserts_and_overwrites() {
    let t = setup().await;
    t.store
        .upsert_device(t.map_id, "10.0.0.1", "sw-1", "first", "1.3.6.1", DeviceType::Router)
        .await
        .unwrap();
    t.store
        .upsert_device(t.map_id, "10.0.0.1", "sw-1b", "second", "1.3.6.2", DeviceType::Router)
        .await
        .unwrap();

    let devices = t.store.devices_by_map(t.map_id).await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].sys_name.as_deref(), Some("sw-1b"));
    assert_eq!(devices[0].sys_descr.as_deref(), Some("second"));
}

#[tokio::test]
async fn test_unknown_sysname_never_clears_identity() {
    let t = setup().await;
    t.store
        .upsert_device(t.map_id, "10.0.0.1", "sw-1", "descr", "1.3.6.1", DeviceType::Router)
        .await
        .unwrap();
    t.store
        .upsert_device(t.map_id, "10.0.0.1", "Unknown", "stub", "Unknown", DeviceType::Router)
        .await
        .unwrap();
    t.store
        .upsert_device(t.map_id, "10.0.0.1", "", "stub", "", DeviceType::Router)
        .await
        .unwrap();

    let devices = t.store.devices_by_map(t.map_id).await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].sys_name.as_deref(), Some("sw-1"));
    assert_eq!(devices[0].sys_descr.as_deref(), Some("descr"));
    assert_eq!(devices[0].sys_object_id.as_deref(), Some("1.3.6.1"));
}

#[tokio::test]
async fn test_default_type_never_downgrades_classification() {
    let t = setup().await;
    t.store
        .upsert_device(t.map_id, "10.0.0.2", "ap-1", "d", "o", DeviceType::AccessPoint)
        .await
        .unwrap();
    // A later probe of the same host writes the default type.
    t.store
        .upsert_device(t.map_id, "10.0.0.2", "ap-1", "d", "o", DeviceType::Router)
        .await
        .unwrap();

    let devices = t.store.devices_by_map(t.map_id).await.unwrap();
    assert_eq!(devices[0].device_type.as_deref(), Some("access_point"));
}

#[tokio::test]
async fn test_specific_type_overwrites_previous() {
    let t = setup().await;
    t.store
        .upsert_device(t.map_id, "10.0.0.3", "x", "d", "o", DeviceType::Switch)
        .await
        .unwrap();
    t.store
        .upsert_device(t.map_id, "10.0.0.3", "x", "d", "o", DeviceType::Server)
        .await
        .unwrap();

    let devices = t.store.devices_by_map(t.map_id).await.unwrap();
    assert_eq!(devices[0].device_type.as_deref(), Some("server"));
}

// ==================== Link Canonicalization & Merge ====================

#[tokio::test]
async fn test_link_stored_canonically_from_either_direction() {
    let t = setup().await;

    let mut forward = link("10.0.0.2", "10.0.0.1");
    forward.source_port = "Gi0/2".to_string();
    forward.target_port = "Gi0/1".to_string();
    t.store.upsert_link(t.map_id, forward).await.unwrap();

    let links = t.store.links_by_map(t.map_id).await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].source_ip, "10.0.0.1");
    assert_eq!(links[0].target_ip, "10.0.0.2");
    assert_eq!(links[0].source_port.as_deref(), Some("Gi0/1"));
    assert_eq!(links[0].target_port.as_deref(), Some("Gi0/2"));
}

#[tokio::test]
async fn test_link_single_row_for_both_directions() {
    let t = setup().await;
    t.store
        .upsert_link(t.map_id, link("10.0.0.1", "10.0.0.2"))
        .await
        .unwrap();
    t.store
        .upsert_link(t.map_id, link("10.0.0.2", "10.0.0.1"))
        .await
        .unwrap();

    let links = t.store.links_by_map(t.map_id).await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].source_ip, "10.0.0.1");
}

#[tokio::test]
async fn test_link_merge_keeps_informative_fields() {
    let t = setup().await;

    let mut first = link("10.0.0.1", "10.0.0.2");
    first.source_port = "Gi0/1".to_string();
    first.speed = "1.0 Gbps".to_string();
    first.status = "Up".to_string();
    first.source_vlan = "U:10".to_string();
    first.source_is_root = true;
    t.store.upsert_link(t.map_id, first).await.unwrap();

    // A later observation with nothing to say must not erase the fields;
    // the root flags always track the latest write.
    let mut second = link("10.0.0.1", "10.0.0.2");
    second.source_port = "Unknown".to_string();
    second.status = "Unknown".to_string();
    t.store.upsert_link(t.map_id, second).await.unwrap();

    let links = t.store.links_by_map(t.map_id).await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].source_port.as_deref(), Some("Gi0/1"));
    assert_eq!(links[0].speed.as_deref(), Some("1.0 Gbps"));
    assert_eq!(links[0].status.as_deref(), Some("Up"));
    assert_eq!(links[0].source_vlan.as_deref(), Some("U:10"));
    assert!(!links[0].source_is_root);
}

#[tokio::test]
async fn test_link_mirrored_write_fills_remote_side() {
    let t = setup().await;

    // Probe of 10.0.0.1 knows only its own port attributes.
    let mut from_a = link("10.0.0.1", "10.0.0.2");
    from_a.source_port = "Gi0/1".to_string();
    from_a.source_vlan = "U:10".to_string();
    t.store.upsert_link(t.map_id, from_a).await.unwrap();

    // Probe of 10.0.0.2 later mirrors in its local attributes.
    let mut from_b = link("10.0.0.2", "10.0.0.1");
    from_b.source_port = "Gi0/2".to_string();
    from_b.source_vlan = "U:20".to_string();
    t.store.upsert_link(t.map_id, from_b).await.unwrap();

    let links = t.store.links_by_map(t.map_id).await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].source_port.as_deref(), Some("Gi0/1"));
    assert_eq!(links[0].target_port.as_deref(), Some("Gi0/2"));
    assert_eq!(links[0].source_vlan.as_deref(), Some("U:10"));
    assert_eq!(links[0].target_vlan.as_deref(), Some("U:20"));
}

#[tokio::test]
async fn test_concurrent_link_writes_converge_to_one_row() {
    let t = setup().await;

    let mut from_a = link("10.0.0.1", "10.0.0.2");
    from_a.source_port = "Gi0/1".to_string();
    let mut from_b = link("10.0.0.2", "10.0.0.1");
    from_b.source_port = "Gi0/2".to_string();

    let store_a = t.store.clone();
    let store_b = t.store.clone();
    let map_id = t.map_id;
    let (ra, rb) = tokio::join!(
        store_a.upsert_link(map_id, from_a),
        store_b.upsert_link(map_id, from_b),
    );
    ra.unwrap();
    rb.unwrap();

    let links = t.store.links_by_map(t.map_id).await.unwrap();
    assert_eq!(links.len(), 1);
    // The union of both observations survives regardless of write order.
    assert_eq!(links[0].source_port.as_deref(), Some("Gi0/1"));
    assert_eq!(links[0].target_port.as_deref(), Some("Gi0/2"));
}

// ==================== Map CRUD & Cascade ====================

#[tokio::test]
async fn test_delete_map_cascades() {
    let t = setup().await;
    t.store
        .upsert_device(t.map_id, "10.0.0.1", "sw", "d", "o", DeviceType::Router)
        .await
        .unwrap();
    t.store
        .upsert_link(t.map_id, link("10.0.0.1", "10.0.0.2"))
        .await
        .unwrap();

    db::delete_map(&t.pool, t.map_id).await.unwrap();

    assert!(db::find_map(&t.pool, t.map_id).await.unwrap().is_none());
    assert!(t.store.devices_by_map(t.map_id).await.unwrap().is_empty());
    assert!(t.store.links_by_map(t.map_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_map_saves_settings_only_when_both_given() {
    let t = setup().await;
    db::update_map(&t.pool, t.map_id, "renamed", Some("10.0.0.0/24"), Some("public"))
        .await
        .unwrap();
    let map = db::find_map(&t.pool, t.map_id).await.unwrap().unwrap();
    assert_eq!(map.name, "renamed");
    assert_eq!(map.network.as_deref(), Some("10.0.0.0/24"));
    assert_eq!(map.community.as_deref(), Some("public"));

    // Name-only update leaves the saved settings alone.
    db::update_map(&t.pool, t.map_id, "renamed-again", None, None)
        .await
        .unwrap();
    let map = db::find_map(&t.pool, t.map_id).await.unwrap().unwrap();
    assert_eq!(map.name, "renamed-again");
    assert_eq!(map.network.as_deref(), Some("10.0.0.0/24"));
}

// ==================== Schema Bootstrap ====================

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let t = setup().await;
    db::run_migrations(&t.pool).await.unwrap();
    db::run_migrations(&t.pool).await.unwrap();
    assert!(db::list_maps(&t.pool).await.is_ok());
}

#[tokio::test]
async fn test_migrations_extend_legacy_schema() {
    let dir = TempDir::new().expect("tempdir");
    let config = DatabaseConfig {
        path: dir.path().join("legacy.db").to_string_lossy().into_owned(),
    };
    let db = DbPool::new(&config).await.expect("open db");

    // A first-release schema: no saved scan settings, no link attributes.
    sqlx::query(
        "CREATE TABLE maps (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(db.get_pool())
    .await
    .unwrap();
    sqlx::query(
        "CREATE TABLE links (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source_ip TEXT,
            target_ip TEXT,
            source_port TEXT,
            target_port TEXT,
            protocol TEXT
        )",
    )
    .execute(db.get_pool())
    .await
    .unwrap();

    db::run_migrations(db.get_pool()).await.unwrap();

    // The upgraded schema accepts current-shape writes.
    let map_id = db::create_map(db.get_pool(), "upgraded").await.unwrap();
    db::update_map(db.get_pool(), map_id, "upgraded", Some("10.0.0.0/30"), Some("public"))
        .await
        .unwrap();
    let store = GraphStore::new(db.pool.clone());
    store
        .upsert_link(map_id, link("10.0.0.1", "10.0.0.2"))
        .await
        .unwrap();
    assert_eq!(store.links_by_map(map_id).await.unwrap().len(), 1);
}
