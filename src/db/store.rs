//! Graph store - per-map device and link persistence.
//!
//! Devices merge on (map_id, ip) in a single conflict-handling statement.
//! Links are undirected: the writer canonicalizes endpoint order, then a
//! store-wide mutex serializes the lookup-then-write so two workers
//! converging on the same edge cannot race the read-modify-write.

use anyhow::Result;
use sqlx::SqlitePool;
use tokio::sync::Mutex;

use crate::models::{Device, DeviceType, Link};

/// Fields of one link observation, as seen from the probed side.
#[derive(Debug, Clone)]
pub struct LinkUpsert {
    pub source_ip: String,
    pub target_ip: String,
    pub protocol: String,
    pub source_port: String,
    pub target_port: String,
    pub speed: String,
    pub status: String,
    pub source_vlan: String,
    pub target_vlan: String,
    pub source_is_root: bool,
    pub target_is_root: bool,
}

impl LinkUpsert {
    /// Normalize direction so the smaller address (string compare) is the
    /// source; per-endpoint fields swap in lockstep.
    pub fn canonicalized(self) -> LinkUpsert {
        if self.source_ip <= self.target_ip {
            return self;
        }
        LinkUpsert {
            source_ip: self.target_ip,
            target_ip: self.source_ip,
            source_port: self.target_port,
            target_port: self.source_port,
            source_vlan: self.target_vlan,
            target_vlan: self.source_vlan,
            source_is_root: self.target_is_root,
            target_is_root: self.source_is_root,
            protocol: self.protocol,
            speed: self.speed,
            status: self.status,
        }
    }
}

/// Per-map graph of devices and links.
#[derive(Debug)]
pub struct GraphStore {
    pool: SqlitePool,
    write_lock: Mutex<()>,
}

impl GraphStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_lock: Mutex::new(()),
        }
    }

    /// Insert or merge a device row.
    ///
    /// An empty or "Unknown" sysName marks a stub write (the host was named
    /// by a neighbor, not probed): identity fields are preserved and only
    /// last_seen is refreshed. The device type never downgrades to the
    /// default "router" once a more specific classification is stored.
    pub async fn upsert_device(
        &self,
        map_id: i64,
        ip: &str,
        sys_name: &str,
        sys_descr: &str,
        sys_object_id: &str,
        device_type: DeviceType,
    ) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let sql = if !sys_name.is_empty() && sys_name != "Unknown" {
            r#"INSERT INTO devices (ip, map_id, sysName, sysDescr, sysObjectID, last_seen, device_type)
               VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP, ?)
               ON CONFLICT(ip, map_id) DO UPDATE SET
                   sysName = excluded.sysName,
                   sysDescr = excluded.sysDescr,
                   sysObjectID = excluded.sysObjectID,
                   last_seen = CURRENT_TIMESTAMP,
                   device_type = CASE WHEN excluded.device_type != 'router'
                                      THEN excluded.device_type
                                      ELSE devices.device_type END"#
        } else {
            r#"INSERT INTO devices (ip, map_id, sysName, sysDescr, sysObjectID, last_seen, device_type)
               VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP, ?)
               ON CONFLICT(ip, map_id) DO UPDATE SET
                   last_seen = CURRENT_TIMESTAMP,
                   device_type = CASE WHEN excluded.device_type != 'router'
                                      THEN excluded.device_type
                                      ELSE devices.device_type END"#
        };

        sqlx::query(sql)
            .bind(ip)
            .bind(map_id)
            .bind(sys_name)
            .bind(sys_descr)
            .bind(sys_object_id)
            .bind(device_type.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Insert or merge a link row.
    ///
    /// On merge, a field is overwritten only when the incoming value is
    /// non-empty and not "Unknown"; the two is-root flags always take the
    /// latest observation.
    pub async fn upsert_link(&self, map_id: i64, link: LinkUpsert) -> Result<()> {
        let link = link.canonicalized();

        let _guard = self.write_lock.lock().await;

        let existing = sqlx::query_as::<_, Link>(
            "SELECT * FROM links WHERE map_id = ? AND source_ip = ? AND target_ip = ?",
        )
        .bind(map_id)
        .bind(&link.source_ip)
        .bind(&link.target_ip)
        .fetch_optional(&self.pool)
        .await?;

        match existing {
            Some(row) => {
                sqlx::query(
                    r#"UPDATE links SET
                           source_port = ?, target_port = ?, speed = ?, status = ?,
                           source_vlan = ?, target_vlan = ?,
                           source_is_root = ?, target_is_root = ?
                       WHERE id = ?"#,
                )
                .bind(merge_field(&link.source_port, row.source_port))
                .bind(merge_field(&link.target_port, row.target_port))
                .bind(merge_field(&link.speed, row.speed))
                .bind(merge_field(&link.status, row.status))
                .bind(merge_field(&link.source_vlan, row.source_vlan))
                .bind(merge_field(&link.target_vlan, row.target_vlan))
                .bind(link.source_is_root)
                .bind(link.target_is_root)
                .bind(row.id)
                .execute(&self.pool)
                .await?;
            }
            None => {
                sqlx::query(
                    r#"INSERT INTO links
                           (map_id, source_ip, target_ip, protocol, source_port, target_port,
                            speed, status, source_vlan, target_vlan, source_is_root, target_is_root)
                       VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
                )
                .bind(map_id)
                .bind(&link.source_ip)
                .bind(&link.target_ip)
                .bind(&link.protocol)
                .bind(&link.source_port)
                .bind(&link.target_port)
                .bind(&link.speed)
                .bind(&link.status)
                .bind(&link.source_vlan)
                .bind(&link.target_vlan)
                .bind(link.source_is_root)
                .bind(link.target_is_root)
                .execute(&self.pool)
                .await?;
            }
        }

        Ok(())
    }

    /// All device rows on a map.
    pub async fn devices_by_map(&self, map_id: i64) -> Result<Vec<Device>> {
        let devices = sqlx::query_as::<_, Device>("SELECT * FROM devices WHERE map_id = ?")
            .bind(map_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(devices)
    }

    /// All link rows on a map.
    pub async fn links_by_map(&self, map_id: i64) -> Result<Vec<Link>> {
        let links = sqlx::query_as::<_, Link>("SELECT * FROM links WHERE map_id = ?")
            .bind(map_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(links)
    }
}

/// Keep the stored value unless the incoming one carries information.
fn merge_field(incoming: &str, existing: Option<String>) -> Option<String> {
    if !incoming.is_empty() && incoming != "Unknown" {
        Some(incoming.to_string())
    } else {
        existing
    }
}
