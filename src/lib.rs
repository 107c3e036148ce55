//! Netmapper - Network Topology Mapper
//!
//! Discovers the topology of an IP network by probing hosts with SNMP v2c,
//! following LLDP neighbor advertisements transitively, and recording a
//! per-map graph of devices and links annotated with port, speed, status,
//! VLAN, and spanning-tree attributes.

pub mod config;
pub mod db;
pub mod models;
pub mod scan;
pub mod snmp;
pub mod web;

/// Application version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default web server port.
pub const DEFAULT_WEB_PORT: u16 = 5050;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yml";
