//! Rates derived from cumulative counters.
//!
//! Both trackers need two readings. The first observation only sets a
//! baseline and yields `None`; so does any reading where a counter went
//! backwards (reboot, interface reset) or the network interface changed,
//! which re-baselines.

use std::time::Instant;

use super::snapshot::Throughput;

/// Cumulative CPU time-slice counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuTicks {
    pub user: u64,
    pub system: u64,
    pub idle: u64,
    pub nice: u64,
}

impl CpuTicks {
    pub fn busy(&self) -> u64 {
        self.user + self.system + self.nice
    }

    pub fn total(&self) -> u64 {
        self.busy() + self.idle
    }
}

/// Cumulative byte counters of one named interface.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NetCounters {
    pub interface: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// (Δuser + Δsystem + Δnice) / Δtotal between two readings.
pub fn cpu_utilization(prev: CpuTicks, next: CpuTicks) -> Option<f64> {
    let fields = [
        (prev.user, next.user),
        (prev.system, next.system),
        (prev.idle, next.idle),
        (prev.nice, next.nice),
    ];
    if fields.iter().any(|(p, n)| n < p) {
        return None;
    }
    let total = next.total() - prev.total();
    if total == 0 {
        return None;
    }
    let busy = next.busy() - prev.busy();
    Some((busy as f64 / total as f64).clamp(0.0, 1.0))
}

#[derive(Debug, Default)]
pub struct CpuTracker {
    last: Option<CpuTicks>,
}

impl CpuTracker {
    pub fn observe(&mut self, ticks: CpuTicks) -> Option<f64> {
        let prev = self.last.replace(ticks)?;
        cpu_utilization(prev, ticks)
    }
}

#[derive(Debug, Default)]
pub struct NetTracker {
    last: Option<(NetCounters, Instant)>,
}

impl NetTracker {
    /// Throughput over the measured time since the previous reading of the
    /// same interface.
    pub fn observe(&mut self, counters: NetCounters, at: Instant) -> Option<Throughput> {
        let (prev, prev_at) = self.last.replace((counters.clone(), at))?;
        if prev.interface != counters.interface {
            return None;
        }
        let elapsed = at.checked_duration_since(prev_at)?.as_secs_f64();
        if elapsed <= 0.0 {
            return None;
        }
        let rx = counters.rx_bytes.checked_sub(prev.rx_bytes)?;
        let tx = counters.tx_bytes.checked_sub(prev.tx_bytes)?;
        Some(Throughput {
            download_bps: rx as f64 / elapsed,
            upload_bps: tx as f64 / elapsed,
        })
    }
}
