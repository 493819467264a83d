use shared::domain::{PhotoRecord, PhotoStatus};

use crate::overlay::EditOverlay;

/// Grid filter: everything, or only photos whose effective status matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(PhotoStatus),
}

impl StatusFilter {
    pub fn label(self) -> &'static str {
        match self {
            StatusFilter::All => "All",
            StatusFilter::Only(status) => status.label(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> SortDirection {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// Presentation-only view preferences. The filter resets on directory
/// change; the sort direction is a user setting that lives for the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewState {
    pub filter: StatusFilter,
    pub sort: SortDirection,
}

/// Derives the displayed photo list from grid contents, overlay, and view
/// preferences. Pure: inputs are never mutated and repeated calls on the
/// same inputs return the same sequence.
///
/// Filtering consults the overlay-aware effective status; sorting compares
/// the lowercased last path segment with a stable sort, so photos with
/// identical names keep their incoming relative order.
pub fn compute(photos: &[PhotoRecord], overlay: &EditOverlay, view: ViewState) -> Vec<PhotoRecord> {
    let mut out: Vec<PhotoRecord> = photos
        .iter()
        .filter(|photo| match view.filter {
            StatusFilter::All => true,
            StatusFilter::Only(status) => overlay.effective_status(photo) == status,
        })
        .cloned()
        .collect();

    out.sort_by(|a, b| {
        let name_a = a.file_name().to_lowercase();
        let name_b = b.file_name().to_lowercase();
        match view.sort {
            SortDirection::Ascending => name_a.cmp(&name_b),
            SortDirection::Descending => name_b.cmp(&name_a),
        }
    });
    out
}
