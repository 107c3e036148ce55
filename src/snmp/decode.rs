//! Pure decoders for the MIB subtrees the mapper walks.
//!
//! LLDP remote-table rows live under
//! `1.0.8802.1.1.2.1.4.1.1.<col>.<timeMark>.<localPortNum>.<remoteIndex>`;
//! columns are correlated by the (localPortNum, remoteIndex) pair at OID
//! suffix positions 12 and 13. The management-address table additionally
//! carries the address itself in the OID suffix.

use std::collections::HashMap;

use super::client::SnmpValue;
use crate::models::DeviceType;

/// Functional roles advertised in the LLDP capability bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Bridge,
    WlanAp,
    Router,
    Station,
}

/// A neighbor row assembled from the walked LLDP columns.
#[derive(Debug, Clone)]
pub struct LldpNeighbor {
    pub local_port_num: u32,
    pub remote_index: u32,
    /// IPv4 management address decoded from the OID suffix.
    pub ip: String,
    pub sys_name: String,
    pub remote_port: String,
    pub capabilities: Vec<Capability>,
    pub device_type: DeviceType,
}

/// Parse (localPortNum, remoteIndex) from an LLDP remote-table OID.
pub fn lldp_row_index(oid: &[u32]) -> Option<(u32, u32)> {
    if oid.len() >= 14 {
        Some((oid[12], oid[13]))
    } else {
        None
    }
}

/// Parse the management-address OID suffix into (localPortNum,
/// remoteIndex, address). Only IPv4 rows (subtype 1, length 4) qualify.
pub fn parse_mgmt_addr(oid: &[u32]) -> Option<(u32, u32, String)> {
    if oid.len() < 16 {
        return None;
    }
    let local_port = oid[12];
    let remote_index = oid[13];
    let subtype = oid[14];
    let addr_len = oid[15];
    if subtype != 1 || addr_len != 4 || oid.len() < 20 {
        return None;
    }
    let ip = format!("{}.{}.{}.{}", oid[16], oid[17], oid[18], oid[19]);
    Some((local_port, remote_index, ip))
}

/// Decode the capability bitmap. A hex-rendered value exposes the common
/// roles in its first byte; a textual value falls back to substring scan.
pub fn decode_capabilities(value: &SnmpValue) -> Vec<Capability> {
    let text = value.printable();
    let lower = text.trim().to_lowercase();
    let mut caps = Vec::new();

    if lower.starts_with("0x") {
        let hex = &lower[2..];
        if let Some(first_byte) = hex.get(..2) {
            if let Ok(byte) = u8::from_str_radix(first_byte, 16) {
                if byte & 0x20 != 0 {
                    caps.push(Capability::Bridge);
                }
                if byte & 0x10 != 0 {
                    caps.push(Capability::WlanAp);
                }
                if byte & 0x08 != 0 {
                    caps.push(Capability::Router);
                }
                if byte & 0x01 != 0 {
                    caps.push(Capability::Station);
                }
            }
        }
    } else {
        if lower.contains("wlan") || lower.contains("accesspoint") {
            caps.push(Capability::WlanAp);
        }
        if lower.contains("router") {
            caps.push(Capability::Router);
        }
        if lower.contains("bridge") {
            caps.push(Capability::Bridge);
        }
        if lower.contains("station") {
            caps.push(Capability::Station);
        }
    }

    caps
}

/// Classification precedence: WLAN AP, then Bridge, then a Station that is
/// not also a Router; anything else is a router.
pub fn device_type_for(caps: &[Capability]) -> DeviceType {
    if caps.contains(&Capability::WlanAp) {
        DeviceType::AccessPoint
    } else if caps.contains(&Capability::Bridge) {
        DeviceType::Switch
    } else if caps.contains(&Capability::Station) && !caps.contains(&Capability::Router) {
        DeviceType::Server
    } else {
        DeviceType::Router
    }
}

/// Correlate the walked LLDP columns into neighbor rows.
///
/// Only rows with an IPv4 management address become neighbors; a missing
/// port-id or sysName column degrades that field to "Unknown".
pub fn correlate_neighbors(
    port_ids: &[(Vec<u32>, SnmpValue)],
    sys_names: &[(Vec<u32>, SnmpValue)],
    capabilities: &[(Vec<u32>, SnmpValue)],
    mgmt_addrs: &[(Vec<u32>, SnmpValue)],
) -> Vec<LldpNeighbor> {
    let mut ports: HashMap<(u32, u32), String> = HashMap::new();
    for (oid, value) in port_ids {
        if let Some(key) = lldp_row_index(oid) {
            ports.insert(key, value.printable());
        }
    }

    let mut names: HashMap<(u32, u32), String> = HashMap::new();
    for (oid, value) in sys_names {
        if let Some(key) = lldp_row_index(oid) {
            names.insert(key, value.printable());
        }
    }

    let mut caps: HashMap<(u32, u32), Vec<Capability>> = HashMap::new();
    for (oid, value) in capabilities {
        if let Some(key) = lldp_row_index(oid) {
            caps.insert(key, decode_capabilities(value));
        }
    }

    let mut neighbors = Vec::new();
    for (oid, _) in mgmt_addrs {
        let Some((local_port, remote_index, ip)) = parse_mgmt_addr(oid) else {
            continue;
        };
        let key = (local_port, remote_index);
        let capabilities = caps.get(&key).cloned().unwrap_or_default();
        neighbors.push(LldpNeighbor {
            local_port_num: local_port,
            remote_index,
            ip,
            sys_name: names
                .get(&key)
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string()),
            remote_port: ports
                .get(&key)
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string()),
            device_type: device_type_for(&capabilities),
            capabilities,
        });
    }
    neighbors
}

/// Format ifHighSpeed (Mbps); None when the counter is zero.
pub fn format_high_speed(mbps: i64) -> Option<String> {
    if mbps <= 0 {
        return None;
    }
    Some(if mbps >= 1000 {
        format!("{} Gbps", fmt_real(mbps as f64 / 1000.0))
    } else {
        format!("{mbps} Mbps")
    })
}

/// Format ifSpeed (bps); empty when zero.
pub fn format_speed_bps(bps: i64) -> String {
    if bps >= 1_000_000_000 {
        format!("{} Gbps", fmt_real(bps as f64 / 1e9))
    } else if bps >= 1_000_000 {
        format!("{} Mbps", fmt_real(bps as f64 / 1e6))
    } else if bps > 0 {
        format!("{bps} bps")
    } else {
        String::new()
    }
}

/// Real quotients keep at least one decimal: 10 -> "10.0", 2.5 -> "2.5".
fn fmt_real(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

/// ifOperStatus label; an absent instance reads "Unknown".
pub fn oper_status_label(status: Option<i64>) -> &'static str {
    match status {
        Some(1) => "Up",
        Some(2) => "Down",
        Some(5) => "Dormant",
        Some(_) => "Other",
        None => "Unknown",
    }
}

/// Big-endian port bitmask test: port P (1-based) is present iff byte
/// (P-1)/8 has bit 7-((P-1)%8) set.
pub fn port_in_bitmask(mask: &[u8], port: u32) -> bool {
    if port == 0 {
        return false;
    }
    let byte_idx = ((port - 1) / 8) as usize;
    let bit_idx = 7 - ((port - 1) % 8);
    mask.get(byte_idx).is_some_and(|b| b & (1 << bit_idx) != 0)
}

/// VLAN ids whose egress-port bitmask includes `port`, excluding the PVID.
/// The VLAN id is the last element of each walked OID.
pub fn tagged_vlans(
    egress_rows: &[(Vec<u32>, SnmpValue)],
    port: u32,
    untagged: Option<i64>,
) -> Vec<i64> {
    let mut tagged = Vec::new();
    for (oid, value) in egress_rows {
        let Some(vlan_id) = oid.last().map(|v| i64::from(*v)) else {
            continue;
        };
        if Some(vlan_id) == untagged {
            continue;
        }
        if let Some(mask) = value.as_octets() {
            if port_in_bitmask(mask, port) {
                tagged.push(vlan_id);
            }
        }
    }
    tagged
}

/// "U:<pvid>" and/or "T:<sorted,dedup,comma-joined>" joined with ", ";
/// empty when the port carries neither.
pub fn vlan_descriptor(untagged: Option<i64>, tagged: &[i64]) -> String {
    let mut parts = Vec::new();
    if let Some(pvid) = untagged {
        parts.push(format!("U:{pvid}"));
    }
    if !tagged.is_empty() {
        let mut ids = tagged.to_vec();
        ids.sort_unstable();
        ids.dedup();
        let joined = ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        parts.push(format!("T:{joined}"));
    }
    parts.join(", ")
}
