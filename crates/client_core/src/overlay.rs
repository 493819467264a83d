use shared::domain::{PhotoRecord, PhotoStatus};
use shared::protocol::StatusUpdate;

/// Pending, unsaved status overrides for the active directory.
///
/// Entries are kept in first-insertion order so `diff()` is deterministic
/// per call; re-setting a path updates it in place without reordering. The
/// overlay only grows through [`set_status`](Self::set_status) /
/// [`cycle_status`](Self::cycle_status) and only empties through
/// [`clear`](Self::clear) — it is never pruned entry by entry.
#[derive(Debug, Clone, Default)]
pub struct EditOverlay {
    entries: Vec<StatusUpdate>,
}

impl EditOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<PhotoStatus> {
        self.entries
            .iter()
            .find(|entry| entry.path == path)
            .map(|entry| entry.status)
    }

    /// The status the grid and filters must use: the pending override when
    /// one exists, otherwise the server-truth status on the record.
    pub fn effective_status(&self, photo: &PhotoRecord) -> PhotoStatus {
        self.get(&photo.path).unwrap_or(photo.status)
    }

    pub fn set_status(&mut self, path: &str, status: PhotoStatus) {
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.path == path) {
            entry.status = status;
        } else {
            self.entries.push(StatusUpdate {
                path: path.to_string(),
                status,
            });
        }
    }

    /// Advances `current` one step along the status cycle and records the
    /// result. `current` must be the *effective* status so repeated cycles
    /// compose before a save.
    pub fn cycle_status(&mut self, path: &str, current: PhotoStatus) -> PhotoStatus {
        let next = current.next();
        self.set_status(path, next);
        next
    }

    /// Snapshot of all pending edits for the batch update request, in
    /// insertion order.
    pub fn diff(&self) -> Vec<StatusUpdate> {
        self.entries.clone()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
