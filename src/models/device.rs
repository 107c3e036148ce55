//! Device model - a host discovered on a map.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// A network device discovered by probing or named by a neighbor's LLDP
/// advertisement. At most one row exists per (map, ip).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Device {
    pub ip: String,
    pub map_id: i64,
    #[sqlx(rename = "sysName")]
    #[serde(rename = "sysName")]
    pub sys_name: Option<String>,
    #[sqlx(rename = "sysDescr")]
    #[serde(rename = "sysDescr")]
    pub sys_descr: Option<String>,
    #[sqlx(rename = "sysObjectID")]
    #[serde(rename = "sysObjectID")]
    pub sys_object_id: Option<String>,
    pub device_type: Option<String>,
    pub last_seen: Option<NaiveDateTime>,
}

/// Functional classification derived from LLDP capability advertisements.
///
/// `Router` is the default; the store never lets a default-typed write
/// downgrade a previously learned classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    Router,
    Switch,
    AccessPoint,
    Server,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Router => "router",
            DeviceType::Switch => "switch",
            DeviceType::AccessPoint => "access_point",
            DeviceType::Server => "server",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
