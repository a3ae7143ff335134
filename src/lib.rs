//! Disk-cleanup and system-telemetry engine for macOS-style home directories.
//!
//! The [`engine::Engine`] is the entry point: it scans the cleanable
//! categories, moves their contents to the trash on request, runs the
//! maintenance commands and keeps a live [`telemetry::SystemSnapshot`].

pub mod categories;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod fs_access;
pub mod logging;
pub mod reclaim;
pub mod scanner;
pub mod telemetry;
pub mod utils;

pub use categories::{CategoryKind, CleanableCategory, MatchRule};
pub use commands::{CommandOutcome, CommandRunner, ProcessRunner};
pub use config::EngineConfig;
pub use engine::{BusyFlags, CategoryPhase, Engine, EngineEvent, ScanResult, TimerHandle};
pub use error::{PureError, Result};
pub use fs_access::{FileSystem, LocalFs};
pub use reclaim::{ReclaimFailure, ReclaimOutcome};
pub use telemetry::{SystemSnapshot, SystemStats};
