//! Database models for all netmapper entities.
//!
//! Each model maps to a SQLite table and uses SQLx for query binding and
//! Serde for JSON serialization.

pub mod device;
pub mod link;
pub mod map;

pub use device::{Device, DeviceType};
pub use link::Link;
pub use map::Map;
