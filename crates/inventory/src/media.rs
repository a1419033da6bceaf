use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{MediaId, UserId};

/// What a media attachment documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Document,
}

/// Evidence attached to an inventory record (stored by an external media store).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryMedia {
    pub id: MediaId,
    pub url: String,
    pub kind: MediaKind,
    pub file_name: String,
    pub uploaded_at: DateTime<Utc>,
    pub uploaded_by: UserId,
}
