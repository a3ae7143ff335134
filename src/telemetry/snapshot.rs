//! The published telemetry snapshot.
//!
//! `None` / `Unknown` means "no successful sample yet". Each probe produces a
//! [`SnapshotUpdate`] touching only its own field group.

use serde::Serialize;

use super::battery::BatteryState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiskUsage {
    pub total_bytes: u64,
    pub available_bytes: u64,
}

impl DiskUsage {
    pub fn used_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.available_bytes)
    }

    pub fn used_fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        self.used_bytes() as f64 / self.total_bytes as f64
    }

    pub fn free_fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        1.0 - self.used_fraction()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryUsage {
    pub used_bytes: u64,
    pub total_bytes: u64,
}

impl MemoryUsage {
    pub fn used_fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        (self.used_bytes as f64 / self.total_bytes as f64).min(1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Throughput {
    pub download_bps: f64,
    pub upload_bps: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SystemSnapshot {
    pub disk: Option<DiskUsage>,
    pub memory: Option<MemoryUsage>,
    /// Utilization fraction in `[0, 1]`.
    pub cpu: Option<f64>,
    pub top_process: Option<String>,
    pub battery: BatteryState,
    pub network: Option<Throughput>,
}

/// A partial update produced by one probe.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotUpdate {
    Disk(DiskUsage),
    Memory(MemoryUsage),
    /// `None` while the tracker has only a baseline.
    Cpu(Option<f64>),
    Network(Option<Throughput>),
    Battery(BatteryState),
    TopProcess(String),
}

impl SystemSnapshot {
    pub fn apply(&mut self, update: SnapshotUpdate) {
        match update {
            SnapshotUpdate::Disk(disk) => self.disk = Some(disk),
            SnapshotUpdate::Memory(memory) => self.memory = Some(memory),
            SnapshotUpdate::Cpu(cpu) => {
                // A re-baselined tracker keeps showing the last real value.
                if cpu.is_some() {
                    self.cpu = cpu;
                }
            }
            SnapshotUpdate::Network(network) => {
                if network.is_some() {
                    self.network = network;
                }
            }
            SnapshotUpdate::Battery(battery) => self.battery = battery,
            SnapshotUpdate::TopProcess(name) => self.top_process = Some(name),
        }
    }
}
