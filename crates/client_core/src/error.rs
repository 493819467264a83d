use thiserror::Error;

pub use shared::domain::InvalidStatusError;

/// Everything that can go wrong on the client side of the moderation flow.
///
/// Load and navigation failures replace the tree/grid in the presentation
/// layer; save failures are surfaced non-destructively so pending edits
/// survive for a retry. Nothing here is retried automatically.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Tree or directory fetch failed: connection error, non-2xx status, or
    /// a malformed body.
    #[error("failed to fetch {what}: {source}")]
    Fetch {
        what: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// A slash-delimited path did not resolve to a tree node. Never coerced
    /// to the root or a partial match.
    #[error("path not found in tree: {path}")]
    PathNotFound { path: String },

    /// A status spelling outside the enumerated set reached the client.
    #[error(transparent)]
    InvalidStatus(#[from] InvalidStatusError),

    /// The batch status update could not be persisted; pending edits are
    /// kept so the operator can retry.
    #[error("status update failed: {source}")]
    Network {
        #[source]
        source: reqwest::Error,
    },

    /// A save for the current overlay is still outstanding.
    #[error("a save is already in flight")]
    SaveInFlight,

    #[error("directory tree is not loaded")]
    TreeNotLoaded,

    /// The cycled path is not part of the active directory.
    #[error("no photo at {path} in the active directory")]
    UnknownPhoto { path: String },
}
