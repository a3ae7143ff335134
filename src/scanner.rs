//! Size scanner: read-only evaluation of a category's match rule.
//!
//! [`matched_entries`] is the only place a [`MatchRule`] is interpreted. The
//! reclaim executor trashes exactly the entries it returns, so what a scan
//! counts is what a clean removes.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::categories::{CleanableCategory, MatchRule};
use crate::fs_access::{DirItem, EntryKind, FileSystem};

/// One item matched by a category rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Entries matched by `category` under `home`, largest first.
///
/// For whole-directory rules the entries are the immediate children of each
/// root, each sized recursively; the other rules only look at immediate
/// regular files. Missing or unreadable roots contribute nothing.
pub fn matched_entries(
    category: &CleanableCategory,
    home: &Path,
    fs: &dyn FileSystem,
) -> Vec<ScanEntry> {
    let mut entries = Vec::new();

    for root in category.roots(home) {
        let items = match fs.list_dir(&root) {
            Ok(items) => items,
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => {
                debug!(category = %category.kind, root = %root.display(), error = %e, "skipping unreadable root");
                continue;
            }
        };

        for item in items {
            if let Some(size_bytes) = rule_size(category.rule, &item, fs) {
                entries.push(ScanEntry {
                    path: item.path,
                    size_bytes,
                });
            }
        }
    }

    // Sort by size descending for readability
    entries.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes));
    entries
}

/// Current byte size of a category. Never fails, never writes.
pub fn scan(category: &CleanableCategory, home: &Path, fs: &dyn FileSystem) -> u64 {
    matched_entries(category, home, fs)
        .iter()
        .fold(0u64, |acc, e| acc.saturating_add(e.size_bytes))
}

/// Size the item contributes if the rule selects it.
fn rule_size(rule: MatchRule, item: &DirItem, fs: &dyn FileSystem) -> Option<u64> {
    let is_file = item.kind == EntryKind::File;
    match rule {
        MatchRule::WholeDirectory => Some(match item.kind {
            EntryKind::File => item.len,
            EntryKind::Dir => fs.tree_size(&item.path),
            EntryKind::Symlink | EntryKind::Other => 0,
        }),
        MatchRule::Extensions(allowed) => {
            (is_file && has_extension(&item.name, allowed)).then_some(item.len)
        }
        MatchRule::Prefixes(prefixes) => {
            (is_file && prefixes.iter().any(|p| item.name.starts_with(p))).then_some(item.len)
        }
        MatchRule::LargerThan(threshold) => (is_file && item.len > threshold).then_some(item.len),
    }
}

fn has_extension(name: &str, allowed: &[&str]) -> bool {
    Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| allowed.iter().any(|a| *a == ext))
}
