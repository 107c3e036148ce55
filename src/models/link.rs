//! Link model - an undirected edge between two devices.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A discovered adjacency between two devices on a map.
///
/// Direction is canonicalized at write time: `source_ip` is always the
/// smaller of the two endpoint addresses by string compare, and the
/// per-endpoint columns (port, vlan, is_root) follow the swap. Exactly one
/// row exists per (map_id, source_ip, target_ip).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Link {
    pub id: i64,
    pub map_id: i64,
    pub source_ip: String,
    pub target_ip: String,
    pub source_port: Option<String>,
    pub target_port: Option<String>,
    pub protocol: Option<String>,
    pub speed: Option<String>,
    pub status: Option<String>,
    pub source_vlan: Option<String>,
    pub target_vlan: Option<String>,
    pub source_is_root: bool,
    pub target_is_root: bool,
}
