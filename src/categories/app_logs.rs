use std::path::{Path, PathBuf};

use super::{CategoryKind, CleanableCategory, DisplayMeta, MatchRule};

fn roots(home: &Path) -> Vec<PathBuf> {
    vec![home.join("Library/Logs")]
}

pub(super) const CATEGORY: CleanableCategory = CleanableCategory {
    kind: CategoryKind::Logs,
    display: DisplayMeta {
        name: "Logs",
        icon: "doc.text.magnifyingglass",
        accent: "orange",
    },
    rule: MatchRule::WholeDirectory,
    roots,
};
