//! Error type shared by probes, trash moves, command launches and config.

use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PureError>;

#[derive(Debug, Error)]
pub enum PureError {
    #[error("[PURE-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[PURE-1002] home directory could not be determined")]
    NoHomeDir,

    #[error("[PURE-2001] probe `{probe}` failed: {details}")]
    Probe {
        probe: &'static str,
        details: String,
    },

    #[error("[PURE-2002] probe `{probe}` is not supported on this platform")]
    Unsupported { probe: &'static str },

    #[error("[PURE-3001] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[PURE-3002] could not move {path} to the trash: {details}")]
    Trash { path: PathBuf, details: String },

    #[error("[PURE-3003] could not launch `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("[PURE-3004] could not start {what} thread: {source}")]
    Spawn {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl PureError {
    /// Stable machine-parseable error code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "PURE-1001",
            Self::NoHomeDir => "PURE-1002",
            Self::Probe { .. } => "PURE-2001",
            Self::Unsupported { .. } => "PURE-2002",
            Self::Io { .. } => "PURE-3001",
            Self::Trash { .. } => "PURE-3002",
            Self::Launch { .. } => "PURE-3003",
            Self::Spawn { .. } => "PURE-3004",
        }
    }

    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn probe(probe: &'static str, details: impl Into<String>) -> Self {
        Self::Probe {
            probe,
            details: details.into(),
        }
    }
}
