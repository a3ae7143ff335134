//! Filesystem accessor used by the scanner and the reclaim executor.
//!
//! Everything the engine does to the disk goes through [`FileSystem`], so
//! tests can point it at a temporary home and a temporary trash.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{PureError, Result};
use crate::utils;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Other,
}

/// One immediate child of a listed directory.
#[derive(Debug, Clone)]
pub struct DirItem {
    pub path: PathBuf,
    pub name: String,
    pub kind: EntryKind,
    /// Byte length for regular files, 0 otherwise.
    pub len: u64,
}

pub trait FileSystem: Send + Sync {
    /// Immediate children of `dir`, symlinks not followed. Entries whose
    /// metadata cannot be read are skipped.
    fn list_dir(&self, dir: &Path) -> io::Result<Vec<DirItem>>;

    /// Recursive size of regular files at or below `path`.
    fn tree_size(&self, path: &Path) -> u64;

    /// Move `path` into the trash and return where it landed.
    fn move_to_trash(&self, path: &Path) -> Result<PathBuf>;
}

/// Where trashed items go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrashLocation {
    pub files: PathBuf,
    /// freedesktop `info/` directory; `None` for the macOS `~/.Trash` layout.
    pub info: Option<PathBuf>,
}

impl TrashLocation {
    /// The platform trash for a user whose home is `home`.
    pub fn for_home(home: &Path) -> Self {
        if cfg!(target_os = "macos") {
            Self {
                files: home.join(".Trash"),
                info: None,
            }
        } else {
            let base = std::env::var_os("XDG_DATA_HOME")
                .map(PathBuf::from)
                .filter(|p| p.is_absolute())
                .unwrap_or_else(|| home.join(".local/share"))
                .join("Trash");
            Self {
                files: base.join("files"),
                info: Some(base.join("info")),
            }
        }
    }
}

/// The real local disk.
#[derive(Debug, Clone)]
pub struct LocalFs {
    trash: TrashLocation,
}

impl LocalFs {
    pub fn new(trash: TrashLocation) -> Self {
        Self { trash }
    }

    pub fn for_home(home: &Path) -> Self {
        Self::new(TrashLocation::for_home(home))
    }

    fn unique_target(&self, name: &OsStr) -> (PathBuf, Option<PathBuf>) {
        let original = Path::new(name);
        let stem = original
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = original
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()));

        let mut attempt = 1u32;
        loop {
            let candidate = if attempt == 1 {
                name.to_string_lossy().into_owned()
            } else {
                format!("{stem} {attempt}{}", ext.as_deref().unwrap_or(""))
            };
            let target = self.trash.files.join(&candidate);
            let info = self
                .trash
                .info
                .as_ref()
                .map(|dir| dir.join(format!("{candidate}.trashinfo")));
            let taken = target.symlink_metadata().is_ok()
                || info.as_ref().is_some_and(|i| i.symlink_metadata().is_ok());
            if !taken {
                return (target, info);
            }
            attempt += 1;
        }
    }
}

impl FileSystem for LocalFs {
    fn list_dir(&self, dir: &Path) -> io::Result<Vec<DirItem>> {
        let mut items = Vec::new();
        for entry in fs::read_dir(dir)?.flatten() {
            let Ok(meta) = entry.path().symlink_metadata() else {
                continue;
            };
            let file_type = meta.file_type();
            let kind = if file_type.is_symlink() {
                EntryKind::Symlink
            } else if file_type.is_dir() {
                EntryKind::Dir
            } else if file_type.is_file() {
                EntryKind::File
            } else {
                EntryKind::Other
            };
            items.push(DirItem {
                path: entry.path(),
                name: entry.file_name().to_string_lossy().into_owned(),
                kind,
                len: if kind == EntryKind::File { meta.len() } else { 0 },
            });
        }
        Ok(items)
    }

    fn tree_size(&self, path: &Path) -> u64 {
        match path.symlink_metadata() {
            Ok(meta) if meta.is_dir() => utils::dir_size(path),
            Ok(meta) if meta.is_file() => meta.len(),
            _ => 0,
        }
    }

    fn move_to_trash(&self, path: &Path) -> Result<PathBuf> {
        let refuse = |details: &str| PureError::Trash {
            path: path.to_path_buf(),
            details: details.to_string(),
        };

        let name = path.file_name().ok_or_else(|| refuse("path has no file name"))?;
        if self.trash.files.starts_with(path) {
            return Err(refuse("refusing to trash the trash itself"));
        }
        path.symlink_metadata()
            .map_err(|e| PureError::io(path, e))?;

        fs::create_dir_all(&self.trash.files).map_err(|e| PureError::io(&self.trash.files, e))?;
        if let Some(info_dir) = &self.trash.info {
            fs::create_dir_all(info_dir).map_err(|e| PureError::io(info_dir, e))?;
        }

        let (target, info) = self.unique_target(name);
        if let Some(info) = &info {
            let record = format!(
                "[Trash Info]\nPath={}\nDeletionDate={}\n",
                percent_encode_path(path),
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S")
            );
            fs::write(info, record).map_err(|e| PureError::io(info, e))?;
        }

        if let Err(e) = fs::rename(path, &target) {
            if let Some(info) = &info {
                let _ = fs::remove_file(info);
            }
            return Err(PureError::Trash {
                path: path.to_path_buf(),
                details: e.to_string(),
            });
        }
        Ok(target)
    }
}

/// RFC 2396 style escaping used by `.trashinfo` `Path=` keys.
fn percent_encode_path(path: &Path) -> String {
    let raw = path.to_string_lossy();
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
