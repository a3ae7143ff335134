use std::path::{Path, PathBuf};

use super::{CategoryKind, CleanableCategory, DisplayMeta, MatchRule};

fn roots(home: &Path) -> Vec<PathBuf> {
    vec![home.join("Library/Logs/DiagnosticReports")]
}

pub(super) const CATEGORY: CleanableCategory = CleanableCategory {
    kind: CategoryKind::CrashReports,
    display: DisplayMeta {
        name: "Crash Reports",
        icon: "exclamationmark.triangle",
        accent: "yellow",
    },
    rule: MatchRule::WholeDirectory,
    roots,
};
