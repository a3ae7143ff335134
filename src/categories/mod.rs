mod app_logs;
mod browser_caches;
mod crash_reports;
mod downloads;
mod large_files;
mod screenshots;
mod system_caches;

use std::path::{Path, PathBuf};

use serde::Serialize;

/// Files strictly larger than this are "large".
pub const LARGE_FILE_THRESHOLD: u64 = 100_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum CategoryKind {
    SystemCache,
    BrowserCache,
    LargeFiles,
    Logs,
    CrashReports,
    Downloads,
    ScreenCaptures,
}

impl CategoryKind {
    /// Machine-readable name used by `--category` (e.g. "system-caches").
    pub const fn slug(self) -> &'static str {
        match self {
            Self::SystemCache => "system-caches",
            Self::BrowserCache => "browser-caches",
            Self::LargeFiles => "large-files",
            Self::Logs => "logs",
            Self::CrashReports => "crash-reports",
            Self::Downloads => "downloads",
            Self::ScreenCaptures => "screen-captures",
        }
    }
}

impl std::fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

/// How files under a category root are selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    /// Everything below the root, recursively.
    WholeDirectory,
    /// Immediate regular files whose lowercase extension is listed.
    Extensions(&'static [&'static str]),
    /// Immediate regular files whose name starts with a listed prefix.
    Prefixes(&'static [&'static str]),
    /// Immediate regular files strictly larger than the threshold.
    LargerThan(u64),
}

/// Presentation metadata. Carried, never interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DisplayMeta {
    pub name: &'static str,
    pub icon: &'static str,
    pub accent: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct CleanableCategory {
    pub kind: CategoryKind,
    pub display: DisplayMeta,
    pub rule: MatchRule,
    roots: fn(&Path) -> Vec<PathBuf>,
}

impl CleanableCategory {
    /// Candidate root paths for a given home directory. Never fails; whether
    /// the paths exist is the scanner's business.
    pub fn roots(&self, home: &Path) -> Vec<PathBuf> {
        (self.roots)(home)
    }
}

/// Display order, not priority.
static REGISTRY: [CleanableCategory; 7] = [
    system_caches::CATEGORY,
    browser_caches::CATEGORY,
    large_files::CATEGORY,
    app_logs::CATEGORY,
    crash_reports::CATEGORY,
    downloads::CATEGORY,
    screenshots::CATEGORY,
];

pub fn list_categories() -> &'static [CleanableCategory] {
    &REGISTRY
}

pub fn find_category(kind: CategoryKind) -> &'static CleanableCategory {
    // REGISTRY is laid out in CategoryKind declaration order.
    &REGISTRY[kind as usize]
}

pub fn find_by_slug(slug: &str) -> Option<&'static CleanableCategory> {
    REGISTRY.iter().find(|c| c.kind.slug() == slug)
}

pub fn all_slugs() -> Vec<&'static str> {
    REGISTRY.iter().map(|c| c.kind.slug()).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn registry_has_seven_distinct_kinds_in_display_order() {
        let kinds: Vec<_> = list_categories().iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                CategoryKind::SystemCache,
                CategoryKind::BrowserCache,
                CategoryKind::LargeFiles,
                CategoryKind::Logs,
                CategoryKind::CrashReports,
                CategoryKind::Downloads,
                CategoryKind::ScreenCaptures,
            ]
        );
        let unique: HashSet<_> = kinds.iter().collect();
        assert_eq!(unique.len(), 7);
    }

    #[test]
    fn find_category_round_trips_every_kind() {
        for category in list_categories() {
            assert_eq!(find_category(category.kind).kind, category.kind);
            assert_eq!(find_by_slug(category.kind.slug()).unwrap().kind, category.kind);
        }
        assert!(find_by_slug("xcode").is_none());
    }

    #[test]
    fn roots_are_pure_joins_under_home() {
        let home = Path::new("/Users/nobody-here");
        for category in list_categories() {
            let roots = category.roots(home);
            assert!(!roots.is_empty(), "{} has no roots", category.kind);
            for root in roots {
                assert!(root.starts_with(home));
            }
        }
        assert_eq!(
            find_category(CategoryKind::BrowserCache).roots(home).len(),
            2
        );
    }

    #[test]
    fn compiled_in_rules() {
        assert_eq!(
            find_category(CategoryKind::LargeFiles).rule,
            MatchRule::LargerThan(LARGE_FILE_THRESHOLD)
        );
        assert_eq!(
            find_category(CategoryKind::Downloads).rule,
            MatchRule::Extensions(&["dmg", "pkg", "zip"])
        );
    }
}
