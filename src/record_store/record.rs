use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

// ============================================================================
// Record - the unit of storage
// ============================================================================

/// Store-managed timestamps carried by every record
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Timestamps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
}

/// A typed record persisted in a single collection.
///
/// `id()` must be pure: the same business fields always derive the same key,
/// and distinct inputs must not collide. An empty key means the caller did
/// not supply the identifying fields.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection the record lives in
    const COLLECTION: &'static str;

    fn id(&self) -> String;

    fn timestamps(&self) -> &Timestamps;

    fn timestamps_mut(&mut self) -> &mut Timestamps;

    /// Fill derived fields before the record is written
    fn normalize(&mut self) {}
}
