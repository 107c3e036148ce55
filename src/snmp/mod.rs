//! SNMP client for device polling.
//!
//! Wraps the `snmp` crate's synchronous v2c session behind async entry
//! points, plus pure decoders for the MIB subtrees the mapper reads
//! (LLDP-MIB, IF-MIB, Q-BRIDGE-MIB, BRIDGE-MIB). All OIDs are numeric;
//! no MIB files are compiled.

pub mod client;
pub mod decode;
pub mod oids;

pub use client::{SnmpClient, SnmpError, SnmpValue};
