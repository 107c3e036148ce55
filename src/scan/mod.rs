//! Scan orchestration - registry, per-host probe, and the crawling
//! supervisor.

pub mod crawler;
pub mod probe;
pub mod registry;

pub use registry::{ScanRegistry, ScanState};
