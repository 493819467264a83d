use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Moderation status of a single photo.
///
/// The set is closed: every wire payload and every transition result is one
/// of these five values. Repeated manual toggling walks the fixed cycle
/// `normal -> pending -> approved -> rejected -> published -> normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoStatus {
    Normal,
    Pending,
    Approved,
    Rejected,
    Published,
}

#[derive(Debug, Clone, Error)]
#[error("unknown photo status: {value}")]
pub struct InvalidStatusError {
    pub value: String,
}

impl PhotoStatus {
    /// Every status, in cycle order.
    pub const ALL: [PhotoStatus; 5] = [
        PhotoStatus::Normal,
        PhotoStatus::Pending,
        PhotoStatus::Approved,
        PhotoStatus::Rejected,
        PhotoStatus::Published,
    ];

    /// Successor in the moderation cycle; wraps from `Published` back to
    /// `Normal`. Never a fixed point.
    pub fn next(self) -> PhotoStatus {
        match self {
            PhotoStatus::Normal => PhotoStatus::Pending,
            PhotoStatus::Pending => PhotoStatus::Approved,
            PhotoStatus::Approved => PhotoStatus::Rejected,
            PhotoStatus::Rejected => PhotoStatus::Published,
            PhotoStatus::Published => PhotoStatus::Normal,
        }
    }

    /// Wire spelling, matching the serde encoding.
    pub fn as_str(self) -> &'static str {
        match self {
            PhotoStatus::Normal => "normal",
            PhotoStatus::Pending => "pending",
            PhotoStatus::Approved => "approved",
            PhotoStatus::Rejected => "rejected",
            PhotoStatus::Published => "published",
        }
    }

    /// Stable display label; exactly one per status.
    pub fn label(self) -> &'static str {
        match self {
            PhotoStatus::Normal => "Normal",
            PhotoStatus::Pending => "In review",
            PhotoStatus::Approved => "Approved",
            PhotoStatus::Rejected => "Rejected",
            PhotoStatus::Published => "Published",
        }
    }
}

impl FromStr for PhotoStatus {
    type Err = InvalidStatusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "normal" => Ok(PhotoStatus::Normal),
            "pending" => Ok(PhotoStatus::Pending),
            "approved" => Ok(PhotoStatus::Approved),
            "rejected" => Ok(PhotoStatus::Rejected),
            "published" => Ok(PhotoStatus::Published),
            other => Err(InvalidStatusError {
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for PhotoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One photo row as served by the backend. `path` is the primary key and the
/// join key used by the overlay, selection and diff machinery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub path: String,
    pub status: PhotoStatus,
    pub is_nude: bool,
    pub has_face: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nsfw_score: Option<f64>,
}

impl PhotoRecord {
    /// Display name: the last slash-delimited path segment.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// One node of the directory tree returned by `GET /api/tree`.
///
/// Directory names live in the `dirs` keys; the root node itself is unnamed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectoryNode {
    #[serde(default)]
    pub files: Vec<PhotoRecord>,
    #[serde(default)]
    pub dirs: BTreeMap<String, DirectoryNode>,
}

/// Recursive roll-up of a subtree, shown next to each directory name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectoryStats {
    pub total_files: usize,
    pub nude_files: usize,
    pub face_files: usize,
    pub directories: usize,
}

impl DirectoryNode {
    pub fn stats(&self) -> DirectoryStats {
        let mut stats = DirectoryStats {
            total_files: self.files.len(),
            nude_files: self.files.iter().filter(|f| f.is_nude).count(),
            face_files: self.files.iter().filter(|f| f.has_face).count(),
            directories: 0,
        };
        for child in self.dirs.values() {
            let child_stats = child.stats();
            stats.total_files += child_stats.total_files;
            stats.nude_files += child_stats.nude_files;
            stats.face_files += child_stats.face_files;
            stats.directories += 1 + child_stats.directories;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_cycle_closes_after_five_steps() {
        for status in PhotoStatus::ALL {
            let mut current = status;
            for _ in 0..5 {
                current = current.next();
            }
            assert_eq!(current, status);
        }
    }

    #[test]
    fn next_is_never_a_fixed_point() {
        for status in PhotoStatus::ALL {
            assert_ne!(status.next(), status);
        }
    }

    #[test]
    fn every_status_has_a_distinct_label() {
        let labels: std::collections::HashSet<_> =
            PhotoStatus::ALL.iter().map(|s| s.label()).collect();
        assert_eq!(labels.len(), PhotoStatus::ALL.len());
    }

    #[test]
    fn parses_wire_spellings_and_rejects_everything_else() {
        for status in PhotoStatus::ALL {
            assert_eq!(status.as_str().parse::<PhotoStatus>().unwrap(), status);
        }
        let err = "archived".parse::<PhotoStatus>().unwrap_err();
        assert_eq!(err.value, "archived");
    }

    #[test]
    fn status_serializes_as_snake_case_string() {
        let json = serde_json::to_string(&PhotoStatus::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
        let back: PhotoStatus = serde_json::from_str("\"published\"").unwrap();
        assert_eq!(back, PhotoStatus::Published);
    }

    #[test]
    fn file_name_is_last_path_segment() {
        let photo = PhotoRecord {
            path: "Sessions/2024/portrait.jpg".to_string(),
            status: PhotoStatus::Normal,
            is_nude: false,
            has_face: true,
            nsfw_score: None,
        };
        assert_eq!(photo.file_name(), "portrait.jpg");
    }

    #[test]
    fn directory_stats_roll_up_recursively() {
        let tree: DirectoryNode = serde_json::from_str(
            r#"{
                "files": [],
                "dirs": {
                    "a": {
                        "files": [
                            {"path": "a/1.jpg", "status": "normal", "is_nude": true, "has_face": false, "nsfw_score": 0.9},
                            {"path": "a/2.jpg", "status": "approved", "is_nude": false, "has_face": true}
                        ],
                        "dirs": {
                            "b": {
                                "files": [
                                    {"path": "a/b/3.jpg", "status": "pending", "is_nude": true, "has_face": true}
                                ],
                                "dirs": {}
                            }
                        }
                    }
                }
            }"#,
        )
        .unwrap();

        let stats = tree.stats();
        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.nude_files, 2);
        assert_eq!(stats.face_files, 2);
        assert_eq!(stats.directories, 2);
    }
}
