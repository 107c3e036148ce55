//! Per-host probe.
//!
//! Resolves a working community from the candidate list, reads the system
//! group, assembles LLDP neighbors by composite-index correlation, and
//! annotates each adjacency with the local port's name, speed, status,
//! VLAN descriptor, and spanning-tree role. Everything past the system
//! GETs degrades on failure; the device record is emitted regardless.

use std::net::IpAddr;

use tracing::{debug, warn};

use crate::config::SnmpSettings;
use crate::models::DeviceType;
use crate::snmp::{decode, oids, SnmpClient, SnmpValue};

/// Identity of a probed host.
#[derive(Debug, Clone)]
pub struct DeviceFacts {
    pub ip: String,
    pub sys_name: String,
    pub sys_descr: String,
    pub sys_object_id: String,
}

/// One adjacency as seen from the probed side.
#[derive(Debug, Clone)]
pub struct NeighborFacts {
    pub ip: String,
    pub sys_name: String,
    pub local_port: String,
    pub remote_port: String,
    pub device_type: DeviceType,
    pub speed: String,
    pub status: String,
    pub vlan: String,
    pub is_root_port: bool,
}

#[derive(Debug)]
pub struct ProbeReport {
    pub device: DeviceFacts,
    pub neighbors: Vec<NeighborFacts>,
}

/// Probe a host, trying each candidate community in order. Returns None
/// when no community yields the system group.
pub async fn probe_host(
    ip: IpAddr,
    communities: &[String],
    snmp: &SnmpSettings,
) -> Option<ProbeReport> {
    let (client, device) = resolve_community(ip, communities, snmp).await?;

    let capabilities = walk_or_empty(&client, oids::LLDP_REM_SYS_CAP_ENABLED, snmp).await;
    let port_ids = walk_or_empty(&client, oids::LLDP_REM_PORT_ID, snmp).await;
    let sys_names = walk_or_empty(&client, oids::LLDP_REM_SYS_NAME, snmp).await;
    let mgmt_addrs = walk_or_empty(&client, oids::LLDP_REM_MAN_ADDR_IF_ID, snmp).await;

    let rows = decode::correlate_neighbors(&port_ids, &sys_names, &capabilities, &mgmt_addrs);

    let stp_root = stp_root_ifindex(&client, snmp).await;

    let mut neighbors = Vec::with_capacity(rows.len());
    for row in rows {
        let local_port = interface_name(&client, row.local_port_num, snmp).await;
        let speed = interface_speed(&client, row.local_port_num, snmp).await;
        let status = interface_status(&client, row.local_port_num, snmp).await;
        let vlan = port_vlan_descriptor(&client, row.local_port_num, snmp).await;
        let is_root_port = stp_root == Some(i64::from(row.local_port_num));

        neighbors.push(NeighborFacts {
            ip: row.ip,
            sys_name: row.sys_name,
            local_port,
            remote_port: row.remote_port,
            device_type: row.device_type,
            speed,
            status,
            vlan,
            is_root_port,
        });
    }

    Some(ProbeReport { device, neighbors })
}

/// First community whose system GETs answer is pinned for the rest of the
/// probe.
async fn resolve_community(
    ip: IpAddr,
    communities: &[String],
    snmp: &SnmpSettings,
) -> Option<(SnmpClient, DeviceFacts)> {
    let system_oids = [
        oids::SYS_NAME.to_vec(),
        oids::SYS_DESCR.to_vec(),
        oids::SYS_OBJECT_ID.to_vec(),
    ];

    for community in communities {
        let client = SnmpClient::new(ip, snmp.port, community);
        match client
            .get_many(&system_oids, snmp.system_timeout(), snmp.system_retries)
            .await
        {
            Ok(values) if values.len() == system_oids.len() => {
                let device = DeviceFacts {
                    ip: ip.to_string(),
                    sys_name: values[0].printable(),
                    sys_descr: values[1].printable(),
                    sys_object_id: values[2].printable(),
                };
                return Some((client, device));
            }
            Ok(_) => {
                warn!(%ip, %community, "short system response");
            }
            Err(e) => {
                debug!(%ip, %community, error = %e, "community candidate failed");
            }
        }
    }
    None
}

async fn walk_or_empty(
    client: &SnmpClient,
    base: &[u32],
    snmp: &SnmpSettings,
) -> Vec<(Vec<u32>, SnmpValue)> {
    match client.walk(base, snmp.walk_timeout(), snmp.walk_retries).await {
        Ok(rows) => rows,
        Err(e) => {
            warn!(oid = %oids::oid_to_string(base), error = %e, "table walk failed");
            Vec::new()
        }
    }
}

/// ifName, falling back to ifDescr, then to the decimal index.
async fn interface_name(client: &SnmpClient, index: u32, snmp: &SnmpSettings) -> String {
    for base in [oids::IF_NAME, oids::IF_DESCR] {
        let oid = oids::with_index(base, index);
        if let Ok(value) = client
            .get(&oid, snmp.detail_timeout(), snmp.detail_retries)
            .await
        {
            if value.is_present() {
                let text = value.printable();
                if !text.is_empty() {
                    return text;
                }
            }
        }
    }
    index.to_string()
}

/// ifHighSpeed (Mbps), falling back to ifSpeed (bps); empty when neither
/// reports a positive rate.
async fn interface_speed(client: &SnmpClient, index: u32, snmp: &SnmpSettings) -> String {
    let oid = oids::with_index(oids::IF_HIGH_SPEED, index);
    if let Ok(value) = client
        .get(&oid, snmp.detail_timeout(), snmp.detail_retries)
        .await
    {
        if let Some(text) = value.as_int().and_then(decode::format_high_speed) {
            return text;
        }
    }

    let oid = oids::with_index(oids::IF_SPEED, index);
    if let Ok(value) = client
        .get(&oid, snmp.detail_timeout(), snmp.detail_retries)
        .await
    {
        if let Some(bps) = value.as_int() {
            return decode::format_speed_bps(bps);
        }
    }

    String::new()
}

async fn interface_status(client: &SnmpClient, index: u32, snmp: &SnmpSettings) -> String {
    let oid = oids::with_index(oids::IF_OPER_STATUS, index);
    let status = client
        .get(&oid, snmp.detail_timeout(), snmp.detail_retries)
        .await
        .ok()
        .and_then(|value| value.as_int());
    decode::oper_status_label(status).to_string()
}

/// Untagged PVID (Cisco vmVlan, then dot1qPvid) plus the tagged set from
/// the Q-BRIDGE egress-port bitmasks.
async fn port_vlan_descriptor(client: &SnmpClient, index: u32, snmp: &SnmpSettings) -> String {
    let mut untagged = get_positive_int(client, oids::VM_VLAN, index, snmp).await;
    if untagged.is_none() {
        untagged = get_positive_int(client, oids::DOT1Q_PVID, index, snmp).await;
    }

    let egress = client
        .walk(
            oids::DOT1Q_VLAN_STATIC_EGRESS_PORTS,
            snmp.vlan_timeout(),
            snmp.vlan_retries,
        )
        .await
        .unwrap_or_default();
    let tagged = decode::tagged_vlans(&egress, index, untagged);

    decode::vlan_descriptor(untagged, &tagged)
}

async fn get_positive_int(
    client: &SnmpClient,
    base: &[u32],
    index: u32,
    snmp: &SnmpSettings,
) -> Option<i64> {
    let oid = oids::with_index(base, index);
    client
        .get(&oid, snmp.vlan_timeout(), snmp.vlan_retries)
        .await
        .ok()
        .and_then(|value| value.as_int())
        .filter(|v| *v > 0)
}

/// The ifIndex of the port toward the spanning-tree root, or None when
/// this device is the root (or runs no STP). The bridge-port index is
/// returned untranslated when the base-port table does not resolve it.
async fn stp_root_ifindex(client: &SnmpClient, snmp: &SnmpSettings) -> Option<i64> {
    let bridge_port = client
        .get(oids::DOT1D_STP_ROOT_PORT, snmp.vlan_timeout(), snmp.vlan_retries)
        .await
        .ok()?
        .as_int()?;
    if bridge_port <= 0 {
        return None;
    }

    let oid = oids::with_index(oids::DOT1D_BASE_PORT_IFINDEX, bridge_port as u32);
    match client
        .get(&oid, snmp.vlan_timeout(), snmp.vlan_retries)
        .await
    {
        Ok(value) => value.as_int().or(Some(bridge_port)),
        Err(_) => Some(bridge_port),
    }
}
