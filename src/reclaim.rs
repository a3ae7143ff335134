//! Reclaim executor: moves a category's matched entries to the trash.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::categories::{CategoryKind, CleanableCategory};
use crate::fs_access::FileSystem;
use crate::scanner::{self, ScanEntry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReclaimFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// What one reclaim pass did. Partial success is the normal case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReclaimOutcome {
    pub kind: CategoryKind,
    pub trashed: Vec<ScanEntry>,
    pub failures: Vec<ReclaimFailure>,
    pub bytes_moved: u64,
}

impl ReclaimOutcome {
    fn empty(kind: CategoryKind) -> Self {
        Self {
            kind,
            trashed: Vec::new(),
            failures: Vec::new(),
            bytes_moved: 0,
        }
    }
}

/// Move every entry the scanner would count for `category` to the trash.
///
/// A failing entry is recorded and skipped. Does not rescan; the caller owns
/// the post-clean size.
pub fn reclaim(category: &CleanableCategory, home: &Path, fs: &dyn FileSystem) -> ReclaimOutcome {
    let mut outcome = ReclaimOutcome::empty(category.kind);

    for entry in scanner::matched_entries(category, home, fs) {
        match fs.move_to_trash(&entry.path) {
            Ok(landed) => {
                debug!(
                    category = %category.kind,
                    path = %entry.path.display(),
                    trashed_as = %landed.display(),
                    bytes = entry.size_bytes,
                    "moved to trash"
                );
                outcome.bytes_moved = outcome.bytes_moved.saturating_add(entry.size_bytes);
                outcome.trashed.push(entry);
            }
            Err(e) => {
                warn!(category = %category.kind, path = %entry.path.display(), error = %e, "could not trash entry");
                outcome.failures.push(ReclaimFailure {
                    path: entry.path,
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        category = %category.kind,
        trashed = outcome.trashed.len(),
        failed = outcome.failures.len(),
        bytes = outcome.bytes_moved,
        "reclaim finished"
    );
    outcome
}
