//! Configuration settings structures.
//!
//! These structs represent the netmapper configuration tree, matching the
//! keys in config.yml.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level netmapper configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetmapConfig {
    /// Port the HTTP control surface listens on.
    pub listen_port: u16,

    pub database: DatabaseConfig,
    pub snmp: SnmpSettings,
    pub scan: ScanSettings,
}

impl Default for NetmapConfig {
    fn default() -> Self {
        Self {
            listen_port: crate::DEFAULT_WEB_PORT,
            database: DatabaseConfig::default(),
            snmp: SnmpSettings::default(),
            scan: ScanSettings::default(),
        }
    }
}

impl NetmapConfig {
    /// Apply environment variable overrides for deployment knobs.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("NETMAPPER_PORT") {
            if let Ok(port) = port.parse() {
                self.listen_port = port;
            }
        }
        if let Ok(path) = std::env::var("NETMAPPER_DB") {
            self.database.path = path;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "network_map.db".into(),
        }
    }
}

/// Per-call SNMP timeouts and retry counts.
///
/// Timeouts are per attempt, not per call: a call with retries=2 may take
/// up to three times the configured timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnmpSettings {
    /// UDP port SNMP agents listen on.
    pub port: u16,

    /// System-group GETs used to resolve the working community.
    pub system_timeout_ms: u64,
    pub system_retries: u32,

    /// Table walks (LLDP columns, VLAN egress ports).
    pub walk_timeout_ms: u64,
    pub walk_retries: u32,

    /// Per-interface detail GETs (name, speed, status).
    pub detail_timeout_ms: u64,
    pub detail_retries: u32,

    /// VLAN membership and spanning-tree lookups.
    pub vlan_timeout_ms: u64,
    pub vlan_retries: u32,
}

impl Default for SnmpSettings {
    fn default() -> Self {
        Self {
            port: 161,
            system_timeout_ms: 1_500,
            system_retries: 1,
            walk_timeout_ms: 3_000,
            walk_retries: 2,
            detail_timeout_ms: 3_000,
            detail_retries: 2,
            vlan_timeout_ms: 2_000,
            vlan_retries: 1,
        }
    }
}

impl SnmpSettings {
    pub fn system_timeout(&self) -> Duration {
        Duration::from_millis(self.system_timeout_ms)
    }

    pub fn walk_timeout(&self) -> Duration {
        Duration::from_millis(self.walk_timeout_ms)
    }

    pub fn detail_timeout(&self) -> Duration {
        Duration::from_millis(self.detail_timeout_ms)
    }

    pub fn vlan_timeout(&self) -> Duration {
        Duration::from_millis(self.vlan_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Upper bound on concurrent probes per scan.
    pub max_workers: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self { max_workers: 50 }
    }
}
