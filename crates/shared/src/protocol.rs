use serde::{Deserialize, Serialize};

use crate::domain::{PhotoRecord, PhotoStatus};

/// Flat listing returned by `GET /api/photos/{path}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryListing {
    #[serde(default)]
    pub files: Vec<PhotoRecord>,
    #[serde(default)]
    pub directories: Vec<String>,
}

/// One pending edit: the new status a photo should be persisted with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub path: String,
    pub status: PhotoStatus,
}

/// Body of `POST /api/update_statuses`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusesRequest {
    pub updates: Vec<StatusUpdate>,
}

/// Confirmation payload for a successful batch update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusesResponse {
    pub success: bool,
    pub message: String,
    pub updated_count: usize,
    #[serde(default)]
    pub saved_updates: Vec<StatusUpdate>,
}

/// Error body the service attaches to non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
