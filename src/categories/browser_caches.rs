use std::path::{Path, PathBuf};

use super::{CategoryKind, CleanableCategory, DisplayMeta, MatchRule};

/// Safari local storage and the default Chrome profile cache. Both are summed.
fn roots(home: &Path) -> Vec<PathBuf> {
    vec![
        home.join("Library/Safari/LocalStorage"),
        home.join("Library/Application Support/Google/Chrome/Default/Cache"),
    ]
}

pub(super) const CATEGORY: CleanableCategory = CleanableCategory {
    kind: CategoryKind::BrowserCache,
    display: DisplayMeta {
        name: "Browser Caches",
        icon: "globe",
        accent: "purple",
    },
    rule: MatchRule::WholeDirectory,
    roots,
};
