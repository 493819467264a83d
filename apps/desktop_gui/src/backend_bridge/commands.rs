//! Backend commands queued from UI to backend worker.

use client_core::StatusFilter;

pub enum BackendCommand {
    /// Build a client for `server_url` and load the tree.
    Connect {
        server_url: String,
        root_path: Option<String>,
    },
    ReloadTree,
    SelectDirectory {
        path: String,
    },
    CycleStatus {
        path: String,
    },
    SetFilter {
        filter: StatusFilter,
    },
    ToggleSort,
    Save,
    FetchThumbnail {
        path: String,
    },
}
