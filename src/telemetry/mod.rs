//! Telemetry sampler: independent probes over an injectable OS accessor.

pub mod battery;
pub mod host;
pub mod rates;
pub mod snapshot;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::Result;
pub use battery::{BatteryHealth, BatteryReading, BatteryState, RawPowerInfo, Thermal, ThermalClass};
pub use host::HostStats;
pub use rates::{CpuTicks, CpuTracker, NetCounters, NetTracker};
pub use snapshot::{DiskUsage, MemoryUsage, SnapshotUpdate, SystemSnapshot, Throughput};

/// OS counter reads. Implementations must be callable from any thread.
pub trait SystemStats: Send + Sync {
    /// Capacity of the volume holding `path`.
    fn volume_capacity(&self, path: &Path) -> Result<DiskUsage>;

    /// Used (active + wired + compressed) and total physical memory.
    fn memory(&self) -> Result<MemoryUsage>;

    /// Cumulative CPU ticks since boot.
    fn cpu_ticks(&self) -> Result<CpuTicks>;

    /// Cumulative byte counters of `interface`, or of the primary interface
    /// when `None`.
    fn network_counters(&self, interface: Option<&str>) -> Result<NetCounters>;

    /// Untyped power-source description; `Ok(None)` when there is no battery.
    fn power_source(&self) -> Result<Option<RawPowerInfo>>;

    /// Name of the process using the most CPU right now.
    fn top_process(&self) -> Result<String>;
}

/// Runs the probes. Holds the counter baselines for the rate probes; every
/// probe is independent and a failure yields no update.
pub struct Sampler {
    stats: Arc<dyn SystemStats>,
    volume_path: PathBuf,
    interface: Option<String>,
    cpu: Mutex<CpuTracker>,
    net: Mutex<NetTracker>,
}

impl Sampler {
    pub fn new(stats: Arc<dyn SystemStats>, volume_path: PathBuf, interface: Option<String>) -> Self {
        Self {
            stats,
            volume_path,
            interface,
            cpu: Mutex::new(CpuTracker::default()),
            net: Mutex::new(NetTracker::default()),
        }
    }

    pub fn sample_disk(&self) -> Option<SnapshotUpdate> {
        self.stats
            .volume_capacity(&self.volume_path)
            .map(SnapshotUpdate::Disk)
            .map_err(|e| warn!(probe = "disk", error = %e, "probe failed"))
            .ok()
    }

    pub fn sample_memory(&self) -> Option<SnapshotUpdate> {
        self.stats
            .memory()
            .map(SnapshotUpdate::Memory)
            .map_err(|e| warn!(probe = "memory", error = %e, "probe failed"))
            .ok()
    }

    pub fn sample_cpu(&self) -> Option<SnapshotUpdate> {
        let ticks = self
            .stats
            .cpu_ticks()
            .map_err(|e| warn!(probe = "cpu", error = %e, "probe failed"))
            .ok()?;
        let utilization = self.cpu.lock().observe(ticks);
        if utilization.is_none() {
            debug!(probe = "cpu", "baseline recorded");
        }
        Some(SnapshotUpdate::Cpu(utilization))
    }

    pub fn sample_network(&self) -> Option<SnapshotUpdate> {
        let counters = self
            .stats
            .network_counters(self.interface.as_deref())
            .map_err(|e| warn!(probe = "network", error = %e, "probe failed"))
            .ok()?;
        let throughput = self.net.lock().observe(counters, Instant::now());
        Some(SnapshotUpdate::Network(throughput))
    }

    pub fn sample_battery(&self) -> Option<SnapshotUpdate> {
        self.stats
            .power_source()
            .map(|raw| SnapshotUpdate::Battery(battery::decode(raw.as_ref())))
            .map_err(|e| warn!(probe = "battery", error = %e, "probe failed"))
            .ok()
    }

    /// Best effort: a failure keeps whatever name is already displayed.
    pub fn sample_top_process(&self) -> Option<SnapshotUpdate> {
        self.stats
            .top_process()
            .map(SnapshotUpdate::TopProcess)
            .map_err(|e| debug!(probe = "top_process", error = %e, "keeping previous value"))
            .ok()
    }
}
