//! Client-side state synchronization for the photo moderation backend.
//!
//! The client owns one directory tree per session, couples tree navigation
//! to the photo grid through selection events, buffers status edits in an
//! overlay on top of server truth, and flushes the overlay diff as a single
//! batch update. All state lives behind one mutex and every mutation goes
//! through a documented entry point, so the invariants (overlay vs. truth,
//! one signal per selection, last selection wins) are enforced here rather
//! than by convention in the UI.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use shared::{
    domain::{DirectoryNode, PhotoRecord, PhotoStatus},
    protocol::{DirectoryListing, StatusUpdate, UpdateStatusesRequest, UpdateStatusesResponse},
};
use tokio::sync::{broadcast, Mutex, MutexGuard};
use tracing::{debug, info, warn};

pub mod error;
pub mod overlay;
pub mod thumbnails;
pub mod tree;
pub mod view;

pub use error::ClientError;
pub use overlay::EditOverlay;
pub use thumbnails::ThumbnailResolver;
pub use tree::PhotoTree;
pub use view::{SortDirection, StatusFilter, ViewState};

type Result<T> = std::result::Result<T, ClientError>;

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// The directory currently shown in the grid. Replaced wholesale by a
/// selection; never edited field-by-field from outside.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    pub active_path: Option<String>,
    pub photos: Vec<PhotoRecord>,
}

/// A photo as the grid should draw it: the server record plus its effective
/// (overlay-aware) status.
#[derive(Debug, Clone, PartialEq)]
pub struct GridPhoto {
    pub photo: PhotoRecord,
    pub status: PhotoStatus,
    pub pending: bool,
}

#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// A fresh tree replaced the old one; all selection state was reset.
    TreeLoaded { root: DirectoryNode },
    /// Emitted exactly once per applied directory selection, carrying that
    /// directory's server-truth photo list.
    DirectorySelected {
        path: String,
        photos: Vec<PhotoRecord>,
    },
    /// The derived grid view changed: selection, status cycle, filter/sort
    /// change, or a completed save.
    GridUpdated {
        photos: Vec<GridPhoto>,
        pending_count: usize,
    },
    SaveCompleted { applied: Vec<String> },
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The overlay was empty; no request was issued.
    NothingToSave,
    Saved { applied: Vec<String> },
}

/// Async surface the front ends drive. `ModerationClient` is the live
/// implementation; tests substitute their own.
#[async_trait]
pub trait ModerationHandle: Send + Sync {
    async fn load_tree(&self) -> Result<()>;
    async fn select_directory(&self, path: &str) -> Result<()>;
    async fn select_directory_listing(&self, path: &str) -> Result<bool>;
    async fn cycle_status(&self, path: &str) -> Result<PhotoStatus>;
    async fn set_filter(&self, filter: StatusFilter);
    async fn toggle_sort(&self) -> SortDirection;
    async fn save(&self) -> Result<SaveOutcome>;
    fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent>;
}

struct ClientState {
    tree: Option<PhotoTree>,
    selection: SelectionState,
    overlay: EditOverlay,
    view: ViewState,
    /// Bumped on every selection attempt; an async resolution only applies
    /// if the epoch it captured is still current (last selection wins).
    selection_epoch: u64,
    save_in_flight: bool,
}

pub struct ModerationClient {
    http: Client,
    server_url: String,
    /// Optional library subdirectory the session is scoped to; resolved
    /// inside every freshly fetched tree.
    root_path: Option<String>,
    inner: Mutex<ClientState>,
    events: broadcast::Sender<ClientEvent>,
}

impl ModerationClient {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self::with_root(server_url, None)
    }

    pub fn with_root(server_url: impl Into<String>, root_path: Option<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            http: Client::new(),
            server_url: server_url.into().trim_end_matches('/').to_string(),
            root_path,
            inner: Mutex::new(ClientState {
                tree: None,
                selection: SelectionState::default(),
                overlay: EditOverlay::new(),
                view: ViewState::default(),
                selection_epoch: 0,
                save_in_flight: false,
            }),
            events,
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Fetches `/api/tree` and replaces the session tree wholesale,
    /// resetting selection, overlay and filter. When the client is scoped
    /// to a root path, that subdirectory becomes the new root; a missing
    /// scope path fails with [`ClientError::PathNotFound`] and leaves the
    /// previous tree in place.
    pub async fn load_tree(&self) -> Result<()> {
        let url = format!("{}/api/tree", self.server_url);
        let fetched: DirectoryNode = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(fetch_error("tree"))?
            .error_for_status()
            .map_err(fetch_error("tree"))?
            .json()
            .await
            .map_err(fetch_error("tree"))?;

        let root = match &self.root_path {
            Some(path) => tree::descend(&fetched, path)
                .ok_or_else(|| ClientError::PathNotFound { path: path.clone() })?
                .clone(),
            None => fetched,
        };
        info!(dirs = root.dirs.len(), "directory tree loaded");

        let mut inner = self.inner.lock().await;
        inner.tree = Some(PhotoTree::new(root.clone()));
        inner.selection = SelectionState::default();
        inner.overlay.clear();
        inner.view.filter = StatusFilter::All;
        inner.selection_epoch += 1;
        let _ = self.events.send(ClientEvent::TreeLoaded { root });
        self.emit_grid(&inner);
        Ok(())
    }

    /// Selects a directory out of the embedded tree. Resolution and
    /// application happen under one lock, so the signal fires exactly once
    /// and a failed resolution leaves every piece of state untouched.
    pub async fn select_directory(&self, path: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let photos = {
            let tree = inner.tree.as_ref().ok_or(ClientError::TreeNotLoaded)?;
            tree.resolve(path)?.files.clone()
        };
        inner.selection_epoch += 1;
        self.apply_selection(&mut inner, path, photos);
        Ok(())
    }

    /// Flat-fetch variant: resolves the directory through
    /// `/api/photos/{path}`. Because the fetch suspends, a newer selection
    /// can start in the meantime; the stale resolution is then discarded
    /// without touching state, and `Ok(false)` reports the discard.
    pub async fn select_directory_listing(&self, path: &str) -> Result<bool> {
        let epoch = {
            let mut inner = self.inner.lock().await;
            inner.selection_epoch += 1;
            inner.selection_epoch
        };

        let url = format!(
            "{}/api/photos/{}",
            self.server_url,
            urlencoding::encode(path)
        );
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(fetch_error("directory listing"))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::PathNotFound {
                path: path.to_string(),
            });
        }
        let listing: DirectoryListing = response
            .error_for_status()
            .map_err(fetch_error("directory listing"))?
            .json()
            .await
            .map_err(fetch_error("directory listing"))?;

        let mut inner = self.inner.lock().await;
        if inner.selection_epoch != epoch {
            debug!(path, "discarding superseded directory selection");
            return Ok(false);
        }
        self.apply_selection(&mut inner, path, listing.files);
        Ok(true)
    }

    /// Advances one photo's effective status a step along the cycle and
    /// records the override in the overlay.
    pub async fn cycle_status(&self, path: &str) -> Result<PhotoStatus> {
        let mut inner = self.inner.lock().await;
        let current = {
            let photo = inner
                .selection
                .photos
                .iter()
                .find(|photo| photo.path == path)
                .ok_or_else(|| ClientError::UnknownPhoto {
                    path: path.to_string(),
                })?;
            inner.overlay.effective_status(photo)
        };
        let next = inner.overlay.cycle_status(path, current);
        debug!(path, from = %current, to = %next, "cycled photo status");
        self.emit_grid(&inner);
        Ok(next)
    }

    pub async fn set_filter(&self, filter: StatusFilter) {
        let mut inner = self.inner.lock().await;
        inner.view.filter = filter;
        self.emit_grid(&inner);
    }

    pub async fn toggle_sort(&self) -> SortDirection {
        let mut inner = self.inner.lock().await;
        inner.view.sort = inner.view.sort.toggled();
        self.emit_grid(&inner);
        inner.view.sort
    }

    /// Current derived grid contents; the same list `GridUpdated` carries.
    pub async fn grid(&self) -> Vec<GridPhoto> {
        let inner = self.inner.lock().await;
        Self::grid_snapshot(&inner)
    }

    pub async fn selection(&self) -> SelectionState {
        self.inner.lock().await.selection.clone()
    }

    pub async fn pending_count(&self) -> usize {
        self.inner.lock().await.overlay.len()
    }

    /// Flushes the overlay as one batch update. Rejected while a previous
    /// save is outstanding. On success the diffed statuses are merged into
    /// server truth (selection and tree) and the overlay is cleared; on
    /// failure the overlay is left intact so the operator can retry.
    pub async fn save(&self) -> Result<SaveOutcome> {
        let updates = {
            let mut inner = self.inner.lock().await;
            if inner.save_in_flight {
                return Err(ClientError::SaveInFlight);
            }
            let updates = inner.overlay.diff();
            if updates.is_empty() {
                return Ok(SaveOutcome::NothingToSave);
            }
            inner.save_in_flight = true;
            updates
        };

        let url = format!("{}/api/update_statuses", self.server_url);
        let response = match self
            .http
            .post(&url)
            .json(&UpdateStatusesRequest {
                updates: updates.clone(),
            })
            .send()
            .await
            .and_then(|response| response.error_for_status())
        {
            Ok(response) => response.json::<UpdateStatusesResponse>().await,
            Err(err) => Err(err),
        };

        let mut inner = self.inner.lock().await;
        inner.save_in_flight = false;
        match response {
            Ok(confirmation) => {
                info!(count = confirmation.updated_count, "status updates persisted");
                Self::merge_updates(&mut inner, &updates);
                inner.overlay.clear();
                let applied: Vec<String> =
                    updates.into_iter().map(|update| update.path).collect();
                let _ = self.events.send(ClientEvent::SaveCompleted {
                    applied: applied.clone(),
                });
                self.emit_grid(&inner);
                Ok(SaveOutcome::Saved { applied })
            }
            Err(source) => {
                warn!(error = %source, "status update batch failed; keeping pending edits");
                let _ = self
                    .events
                    .send(ClientEvent::Error(format!("failed to save changes: {source}")));
                Err(ClientError::Network { source })
            }
        }
    }

    /// Replaces the selection wholesale and resets the per-directory state:
    /// pending edits are discarded and the filter goes back to `All`; the
    /// sort preference survives as a session setting.
    fn apply_selection(&self, inner: &mut MutexGuard<'_, ClientState>, path: &str, photos: Vec<PhotoRecord>) {
        inner.selection = SelectionState {
            active_path: Some(path.to_string()),
            photos: photos.clone(),
        };
        inner.overlay.clear();
        inner.view.filter = StatusFilter::All;
        debug!(path, photos = photos.len(), "directory selected");
        let _ = self.events.send(ClientEvent::DirectorySelected {
            path: path.to_string(),
            photos,
        });
        self.emit_grid(inner);
    }

    /// Folds persisted statuses into server truth so overlay-vs-truth
    /// diffing stays correct and re-navigation shows the saved values.
    fn merge_updates(inner: &mut MutexGuard<'_, ClientState>, updates: &[StatusUpdate]) {
        for update in updates {
            if let Some(photo) = inner
                .selection
                .photos
                .iter_mut()
                .find(|photo| photo.path == update.path)
            {
                photo.status = update.status;
            }
        }

        let active_path = inner.selection.active_path.clone();
        let (Some(path), Some(tree)) = (active_path, inner.tree.as_mut()) else {
            return;
        };
        if let Ok(node) = tree.resolve_mut(&path) {
            for update in updates {
                if let Some(photo) = node.files.iter_mut().find(|photo| photo.path == update.path)
                {
                    photo.status = update.status;
                }
            }
        }
    }

    fn grid_snapshot(inner: &ClientState) -> Vec<GridPhoto> {
        view::compute(&inner.selection.photos, &inner.overlay, inner.view)
            .into_iter()
            .map(|photo| GridPhoto {
                status: inner.overlay.effective_status(&photo),
                pending: inner.overlay.get(&photo.path).is_some(),
                photo,
            })
            .collect()
    }

    fn emit_grid(&self, inner: &ClientState) {
        let _ = self.events.send(ClientEvent::GridUpdated {
            photos: Self::grid_snapshot(inner),
            pending_count: inner.overlay.len(),
        });
    }
}

fn fetch_error(what: &'static str) -> impl FnOnce(reqwest::Error) -> ClientError {
    move |source| ClientError::Fetch { what, source }
}

#[async_trait]
impl ModerationHandle for ModerationClient {
    async fn load_tree(&self) -> Result<()> {
        ModerationClient::load_tree(self).await
    }

    async fn select_directory(&self, path: &str) -> Result<()> {
        ModerationClient::select_directory(self, path).await
    }

    async fn select_directory_listing(&self, path: &str) -> Result<bool> {
        ModerationClient::select_directory_listing(self, path).await
    }

    async fn cycle_status(&self, path: &str) -> Result<PhotoStatus> {
        ModerationClient::cycle_status(self, path).await
    }

    async fn set_filter(&self, filter: StatusFilter) {
        ModerationClient::set_filter(self, filter).await;
    }

    async fn toggle_sort(&self) -> SortDirection {
        ModerationClient::toggle_sort(self).await
    }

    async fn save(&self) -> Result<SaveOutcome> {
        ModerationClient::save(self).await
    }

    fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        ModerationClient::subscribe_events(self)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
