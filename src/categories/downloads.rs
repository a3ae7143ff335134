use std::path::{Path, PathBuf};

use super::{CategoryKind, CleanableCategory, DisplayMeta, MatchRule};

/// Installer and archive leftovers.
const INSTALLER_EXTENSIONS: &[&str] = &["dmg", "pkg", "zip"];

fn roots(home: &Path) -> Vec<PathBuf> {
    vec![home.join("Downloads")]
}

pub(super) const CATEGORY: CleanableCategory = CleanableCategory {
    kind: CategoryKind::Downloads,
    display: DisplayMeta {
        name: "Downloads",
        icon: "arrow.down.circle",
        accent: "green",
    },
    rule: MatchRule::Extensions(INSTALLER_EXTENSIONS),
    roots,
};
