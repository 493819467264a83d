use std::collections::HashSet;

use shared::domain::{DirectoryNode, DirectoryStats};

use crate::error::ClientError;

/// Splits a slash path into segments, dropping empties and `.` the same way
/// the backend does when it builds the tree.
fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|part| !part.is_empty() && *part != ".")
}

/// Walks `dirs` one segment at a time. `None` as soon as a segment is
/// missing; the empty path resolves to `root` itself.
pub(crate) fn descend<'a>(root: &'a DirectoryNode, path: &str) -> Option<&'a DirectoryNode> {
    let mut current = root;
    for segment in path_segments(path) {
        current = current.dirs.get(segment)?;
    }
    Some(current)
}

fn descend_mut<'a>(root: &'a mut DirectoryNode, path: &str) -> Option<&'a mut DirectoryNode> {
    let mut current = root;
    for segment in path_segments(path) {
        current = current.dirs.get_mut(segment)?;
    }
    Some(current)
}

/// Navigable in-memory model of the server's directory tree.
///
/// Owns its `DirectoryNode` root for the whole session: a reload replaces
/// the tree wholesale, nothing is ever patched in place. Expand/collapse
/// state is keyed by path and layered on top of the tree, independent of
/// which directory is selected.
#[derive(Debug)]
pub struct PhotoTree {
    root: DirectoryNode,
    expanded: HashSet<String>,
}

impl PhotoTree {
    pub fn new(root: DirectoryNode) -> Self {
        Self {
            root,
            expanded: HashSet::new(),
        }
    }

    pub fn root(&self) -> &DirectoryNode {
        &self.root
    }

    /// Resolves a slash-delimited path to its node, failing with
    /// [`ClientError::PathNotFound`] on the first absent segment. There is
    /// no fallback to the root or to a partial match.
    pub fn resolve(&self, path: &str) -> Result<&DirectoryNode, ClientError> {
        descend(&self.root, path).ok_or_else(|| ClientError::PathNotFound {
            path: path.to_string(),
        })
    }

    pub(crate) fn resolve_mut(&mut self, path: &str) -> Result<&mut DirectoryNode, ClientError> {
        descend_mut(&mut self.root, path).ok_or_else(|| ClientError::PathNotFound {
            path: path.to_string(),
        })
    }

    pub fn stats_at(&self, path: &str) -> Result<DirectoryStats, ClientError> {
        Ok(self.resolve(path)?.stats())
    }

    pub fn is_expanded(&self, path: &str) -> bool {
        self.expanded.contains(path)
    }

    pub fn toggle_expanded(&mut self, path: &str) {
        if !self.expanded.remove(path) {
            self.expanded.insert(path.to_string());
        }
    }
}
