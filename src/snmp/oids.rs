//! Standard SNMP OID definitions used by the mapper.

// System MIB (RFC 1213) - scalar instances
pub const SYS_DESCR: &[u32] = &[1, 3, 6, 1, 2, 1, 1, 1, 0];
pub const SYS_OBJECT_ID: &[u32] = &[1, 3, 6, 1, 2, 1, 1, 2, 0];
pub const SYS_NAME: &[u32] = &[1, 3, 6, 1, 2, 1, 1, 5, 0];

// Interfaces MIB (IF-MIB) - indexed by ifIndex
pub const IF_DESCR: &[u32] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 2];
pub const IF_SPEED: &[u32] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 5];
pub const IF_OPER_STATUS: &[u32] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 8];

// ifXTable (IF-MIB)
pub const IF_NAME: &[u32] = &[1, 3, 6, 1, 2, 1, 31, 1, 1, 1, 1];
pub const IF_HIGH_SPEED: &[u32] = &[1, 3, 6, 1, 2, 1, 31, 1, 1, 1, 15];

// LLDP MIB (IEEE 802.1AB) - remote systems table columns, rows indexed by
// (timeMark, localPortNum, remoteIndex)
pub const LLDP_REM_PORT_ID: &[u32] = &[1, 0, 8802, 1, 1, 2, 1, 4, 1, 1, 7];
pub const LLDP_REM_SYS_NAME: &[u32] = &[1, 0, 8802, 1, 1, 2, 1, 4, 1, 1, 9];
pub const LLDP_REM_SYS_CAP_ENABLED: &[u32] = &[1, 0, 8802, 1, 1, 2, 1, 4, 1, 1, 12];

// LLDP remote management address table; the address itself is encoded in
// the OID suffix (subtype, length, then the address octets)
pub const LLDP_REM_MAN_ADDR_IF_ID: &[u32] = &[1, 0, 8802, 1, 1, 2, 1, 4, 2, 1, 3];

// CISCO-VLAN-MEMBERSHIP-MIB - access port VLAN, indexed by ifIndex
pub const VM_VLAN: &[u32] = &[1, 3, 6, 1, 4, 1, 9, 9, 68, 1, 2, 2, 1, 2];

// Q-BRIDGE-MIB (IEEE 802.1Q)
pub const DOT1Q_PVID: &[u32] = &[1, 3, 6, 1, 2, 1, 17, 7, 1, 4, 5, 1, 1];
pub const DOT1Q_VLAN_STATIC_EGRESS_PORTS: &[u32] = &[1, 3, 6, 1, 2, 1, 17, 7, 1, 4, 3, 1, 2];

// Bridge MIB (BRIDGE-MIB) - spanning tree
pub const DOT1D_STP_ROOT_PORT: &[u32] = &[1, 3, 6, 1, 2, 1, 17, 2, 7, 0];
pub const DOT1D_BASE_PORT_IFINDEX: &[u32] = &[1, 3, 6, 1, 2, 1, 17, 1, 4, 1, 2];

/// Append a table index to a column OID.
pub fn with_index(base: &[u32], index: u32) -> Vec<u32> {
    let mut oid = base.to_vec();
    oid.push(index);
    oid
}

/// Format an OID as a dot-separated string.
pub fn oid_to_string(oid: &[u32]) -> String {
    oid.iter()
        .map(|o| o.to_string())
        .collect::<Vec<_>>()
        .join(".")
}
