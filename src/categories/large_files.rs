use std::path::{Path, PathBuf};

use super::{CategoryKind, CleanableCategory, DisplayMeta, MatchRule, LARGE_FILE_THRESHOLD};

fn roots(home: &Path) -> Vec<PathBuf> {
    vec![home.join("Downloads")]
}

pub(super) const CATEGORY: CleanableCategory = CleanableCategory {
    kind: CategoryKind::LargeFiles,
    display: DisplayMeta {
        name: "Large Files",
        icon: "shippingbox.fill",
        accent: "pink",
    },
    rule: MatchRule::LargerThan(LARGE_FILE_THRESHOLD),
    roots,
};
