use serde::{Deserialize, Serialize};

use crate::storage::db::SecondsSinceUnix;

/// A track discovered on the remote platform.
///
/// This is also the wire format of the ingestion endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub track_id: u32,
    pub track_title: String,
    #[serde(default)]
    pub album_title: Option<String>,
    pub band_name: String,
    pub track_url: String,
}

/// A track as persisted by the store, with its server-assigned creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTrack {
    pub track: Track,
    pub created_at: SecondsSinceUnix,
}
