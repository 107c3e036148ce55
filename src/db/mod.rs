//! Database access layer using SQLx with SQLite.
//!
//! Provides connection pooling, schema bootstrap, map CRUD, and the
//! serialized graph store.

pub mod migrate;
pub mod pool;
pub mod queries;
pub mod store;

pub use migrate::*;
pub use pool::*;
pub use queries::*;
pub use store::*;
