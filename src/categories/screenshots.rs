use std::path::{Path, PathBuf};

use super::{CategoryKind, CleanableCategory, DisplayMeta, MatchRule};

/// Filename prefixes macOS uses for screenshots (French and English locales).
const SCREENSHOT_PREFIXES: &[&str] = &["Capture d’écran", "Screenshot"];

fn roots(home: &Path) -> Vec<PathBuf> {
    vec![home.join("Desktop")]
}

pub(super) const CATEGORY: CleanableCategory = CleanableCategory {
    kind: CategoryKind::ScreenCaptures,
    display: DisplayMeta {
        name: "Screen Captures",
        icon: "camera.viewfinder",
        accent: "cyan",
    },
    rule: MatchRule::Prefixes(SCREENSHOT_PREFIXES),
    roots,
};
