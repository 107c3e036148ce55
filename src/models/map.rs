//! Map model - a named discovery workspace.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A discovery workspace isolating one topology from others in the store.
///
/// `network` and `community` hold the settings of the most recent scan so
/// a map can be rescanned without re-entering them; `community` is the raw
/// comma-joined string as supplied by the operator.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Map {
    pub id: i64,
    pub name: String,
    pub created_at: Option<NaiveDateTime>,
    pub network: Option<String>,
    pub community: Option<String>,
}
