use std::path::{Path, PathBuf};

use super::{CategoryKind, CleanableCategory, DisplayMeta, MatchRule};

fn roots(home: &Path) -> Vec<PathBuf> {
    vec![home.join("Library/Caches")]
}

pub(super) const CATEGORY: CleanableCategory = CleanableCategory {
    kind: CategoryKind::SystemCache,
    display: DisplayMeta {
        name: "System Caches",
        icon: "memorychip",
        accent: "blue",
    },
    rule: MatchRule::WholeDirectory,
    roots,
};
