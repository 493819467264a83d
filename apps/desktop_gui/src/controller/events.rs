//! UI/backend events and error modeling for the desktop controller.

use client_core::GridPhoto;
use shared::domain::DirectoryNode;

pub enum UiEvent {
    Info(String),
    TreeLoaded {
        root: DirectoryNode,
    },
    DirectorySelected {
        path: String,
        photo_count: usize,
    },
    GridUpdated {
        photos: Vec<GridPhoto>,
        pending_count: usize,
    },
    SaveCompleted {
        applied: Vec<String>,
    },
    ThumbnailLoaded {
        path: String,
        image: PreviewImage,
    },
    ThumbnailFailed {
        path: String,
        reason: String,
    },
    Error(UiError),
}

/// Decoded thumbnail pixels, turned into a texture on the UI thread.
#[derive(Clone)]
pub struct PreviewImage {
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Transport,
    NotFound,
    Validation,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    TreeLoad,
    Selection,
    Save,
    Thumbnail,
    General,
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("not found") || message_lower.contains("404") {
            UiErrorCategory::NotFound
        } else if message_lower.contains("unknown photo status")
            || message_lower.contains("invalid")
            || message_lower.contains("malformed")
            || message_lower.contains("already in flight")
        {
            UiErrorCategory::Validation
        } else if message_lower.contains("connect")
            || message_lower.contains("connection")
            || message_lower.contains("timeout")
            || message_lower.contains("timed out")
            || message_lower.contains("network")
            || message_lower.contains("dns")
            || message_lower.contains("unreachable")
            || message_lower.contains("error sending request")
        {
            UiErrorCategory::Transport
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    /// Load and navigation failures replace the tree/grid workspace; save
    /// failures stay a non-destructive notice so pending edits survive.
    pub fn replaces_workspace(&self) -> bool {
        matches!(self.context, UiErrorContext::TreeLoad)
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_connection_failures_as_transport() {
        let err = UiError::from_message(
            UiErrorContext::TreeLoad,
            "failed to fetch tree: error sending request for url",
        );
        assert_eq!(err.category(), UiErrorCategory::Transport);
        assert!(err.replaces_workspace());
    }

    #[test]
    fn classifies_missing_paths_as_not_found() {
        let err = UiError::from_message(
            UiErrorContext::Selection,
            "path not found in tree: Pictures/Missing",
        );
        assert_eq!(err.category(), UiErrorCategory::NotFound);
        assert!(!err.replaces_workspace());
    }

    #[test]
    fn classifies_bad_status_values_as_validation() {
        let err = UiError::from_message(UiErrorContext::General, "unknown photo status: archived");
        assert_eq!(err.category(), UiErrorCategory::Validation);
    }

    #[test]
    fn save_errors_do_not_replace_the_workspace() {
        let err = UiError::from_message(
            UiErrorContext::Save,
            "status update failed: connection reset",
        );
        assert_eq!(err.category(), UiErrorCategory::Transport);
        assert!(!err.replaces_workspace());
    }
}
