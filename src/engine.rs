//! Engine coordinator: owns the canonical state and drives scans, cleans,
//! maintenance commands and the telemetry timers.
//!
//! All writes to [`EngineState`] go through one mutex. Scans run on the rayon
//! pool and hand their results back over a channel to the thread that asked
//! for them, which applies them in completion order.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use crossbeam_channel::{select, Receiver, Sender, TrySendError};
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use tracing::{debug, info};

use crate::categories::{find_category, list_categories, CategoryKind, CleanableCategory};
use crate::commands::{CommandOutcome, CommandRunner, ProcessRunner};
use crate::config::{CommandLine, EngineConfig};
use crate::error::{PureError, Result};
use crate::fs_access::{FileSystem, LocalFs};
use crate::reclaim::{self, ReclaimOutcome};
use crate::scanner;
use crate::telemetry::{HostStats, Sampler, SnapshotUpdate, SystemSnapshot, SystemStats};
use crate::utils;

/// Events a subscriber can fall behind by before new ones are dropped.
const SUBSCRIBER_BACKLOG: usize = 256;

/// Latest known size of one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    pub kind: CategoryKind,
    pub size_bytes: u64,
    pub is_scanning: bool,
    /// `None` until the first scan completes.
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CategoryPhase {
    Idle,
    Scanning,
    Cleaning,
}

/// Coarse maintenance operations in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BusyFlags {
    pub boosting: bool,
    pub flushing_network: bool,
    pub maintaining: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BusyKind {
    Boost,
    FlushNetwork,
    Maintenance,
}

impl BusyFlags {
    fn flag(&mut self, kind: BusyKind) -> &mut bool {
        match kind {
            BusyKind::Boost => &mut self.boosting,
            BusyKind::FlushNetwork => &mut self.flushing_network,
            BusyKind::Maintenance => &mut self.maintaining,
        }
    }

    pub fn any(&self) -> bool {
        self.boosting || self.flushing_network || self.maintaining
    }
}

/// Change notifications for a presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    PhaseChanged {
        kind: CategoryKind,
        phase: CategoryPhase,
    },
    ScanCompleted {
        kind: CategoryKind,
        size_bytes: u64,
    },
    CleanFinished {
        kind: CategoryKind,
        bytes_moved: u64,
        failures: usize,
    },
    SnapshotUpdated,
    BusyChanged(BusyFlags),
}

struct Slot {
    phase: CategoryPhase,
    result: ScanResult,
}

struct EngineState {
    // Indexed by `CategoryKind as usize`, which is registry order.
    slots: Vec<Slot>,
    snapshot: SystemSnapshot,
    busy: BusyFlags,
}

impl EngineState {
    fn new() -> Self {
        Self {
            slots: list_categories()
                .iter()
                .map(|c| Slot {
                    phase: CategoryPhase::Idle,
                    result: ScanResult {
                        kind: c.kind,
                        size_bytes: 0,
                        is_scanning: false,
                        last_updated: None,
                    },
                })
                .collect(),
            snapshot: SystemSnapshot::default(),
            busy: BusyFlags::default(),
        }
    }

    fn slot(&self, kind: CategoryKind) -> &Slot {
        &self.slots[kind as usize]
    }

    fn slot_mut(&mut self, kind: CategoryKind) -> &mut Slot {
        &mut self.slots[kind as usize]
    }

    fn set_phase(&mut self, kind: CategoryKind, phase: CategoryPhase) {
        let slot = self.slot_mut(kind);
        slot.phase = phase;
        slot.result.is_scanning = phase == CategoryPhase::Scanning;
    }
}

pub struct Engine {
    home: PathBuf,
    config: EngineConfig,
    fs: Arc<dyn FileSystem>,
    sampler: Sampler,
    runner: Arc<dyn CommandRunner>,
    state: Mutex<EngineState>,
    category_idle: Condvar,
    subscribers: Mutex<Vec<Sender<EngineEvent>>>,
}

impl Engine {
    pub fn new(
        home: PathBuf,
        config: EngineConfig,
        fs: Arc<dyn FileSystem>,
        stats: Arc<dyn SystemStats>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        let sampler = Sampler::new(stats, home.clone(), config.network_interface.clone());
        Self {
            home,
            config,
            fs,
            sampler,
            runner,
            state: Mutex::new(EngineState::new()),
            category_idle: Condvar::new(),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Engine over the real home directory, disk, OS counters and processes.
    pub fn with_host(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let home = utils::home_dir()?;
        let fs = Arc::new(LocalFs::for_home(&home));
        Ok(Self::new(
            home,
            config,
            fs,
            Arc::new(HostStats::new()),
            Arc::new(ProcessRunner),
        ))
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ---- read access -------------------------------------------------

    pub fn categories(&self) -> &'static [CleanableCategory] {
        list_categories()
    }

    pub fn scan_result(&self, kind: CategoryKind) -> ScanResult {
        self.state.lock().slot(kind).result.clone()
    }

    /// Results in registry order.
    pub fn scan_results(&self) -> Vec<ScanResult> {
        self.state
            .lock()
            .slots
            .iter()
            .map(|s| s.result.clone())
            .collect()
    }

    pub fn phase(&self, kind: CategoryKind) -> CategoryPhase {
        self.state.lock().slot(kind).phase
    }

    /// Sum over categories that completed at least one scan.
    pub fn total_reclaimable(&self) -> u64 {
        self.state
            .lock()
            .slots
            .iter()
            .filter(|s| s.result.last_updated.is_some())
            .fold(0u64, |acc, s| acc.saturating_add(s.result.size_bytes))
    }

    pub fn snapshot(&self) -> SystemSnapshot {
        self.state.lock().snapshot.clone()
    }

    pub fn busy(&self) -> BusyFlags {
        self.state.lock().busy
    }

    pub fn is_scanning(&self) -> bool {
        self.state
            .lock()
            .slots
            .iter()
            .any(|s| s.phase == CategoryPhase::Scanning)
    }

    /// Change notifications. A subscriber that stops reading misses events
    /// once its backlog is full; dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> Receiver<EngineEvent> {
        let (tx, rx) = crossbeam_channel::bounded(SUBSCRIBER_BACKLOG);
        self.subscribers.lock().push(tx);
        rx
    }

    fn emit(&self, event: EngineEvent) {
        self.subscribers
            .lock()
            .retain(|tx| match tx.try_send(event.clone()) {
                Ok(()) | Err(TrySendError::Full(_)) => true,
                Err(TrySendError::Disconnected(_)) => false,
            });
    }

    // ---- scanning ----------------------------------------------------

    /// Scan every idle category in parallel. Categories already scanning or
    /// cleaning are skipped. Blocks until the claimed scans are applied and
    /// returns how many were run.
    pub fn scan_all(&self) -> usize {
        self.scan_kinds(list_categories().iter().map(|c| c.kind))
    }

    /// Scan one category unless it is already busy. Returns whether a scan ran.
    pub fn scan_one(&self, kind: CategoryKind) -> bool {
        self.scan_kinds(std::iter::once(kind)) == 1
    }

    fn scan_kinds(&self, kinds: impl Iterator<Item = CategoryKind>) -> usize {
        let claimed: Vec<CategoryKind> = {
            let mut state = self.state.lock();
            kinds
                .filter(|&kind| {
                    if state.slot(kind).phase != CategoryPhase::Idle {
                        debug!(category = %kind, "scan coalesced with one in flight");
                        return false;
                    }
                    state.set_phase(kind, CategoryPhase::Scanning);
                    true
                })
                .collect()
        };
        for &kind in &claimed {
            self.emit(EngineEvent::PhaseChanged {
                kind,
                phase: CategoryPhase::Scanning,
            });
        }

        let (tx, rx) = crossbeam_channel::unbounded();
        for &kind in &claimed {
            let tx = tx.clone();
            let fs = Arc::clone(&self.fs);
            let home = self.home.clone();
            rayon::spawn(move || {
                let started = Instant::now();
                let size = scanner::scan(find_category(kind), &home, fs.as_ref());
                debug!(category = %kind, bytes = size, elapsed_ms = started.elapsed().as_millis() as u64, "scan finished");
                let _ = tx.send((kind, size));
            });
        }
        drop(tx);

        // First completed, first applied.
        for (kind, size) in rx {
            self.finish_scan(kind, size);
        }
        claimed.len()
    }

    fn finish_scan(&self, kind: CategoryKind, size_bytes: u64) {
        {
            let mut state = self.state.lock();
            let slot = state.slot_mut(kind);
            slot.result.size_bytes = size_bytes;
            slot.result.last_updated = Some(Utc::now());
            state.set_phase(kind, CategoryPhase::Idle);
        }
        self.category_idle.notify_all();
        self.emit(EngineEvent::ScanCompleted { kind, size_bytes });
        self.emit(EngineEvent::PhaseChanged {
            kind,
            phase: CategoryPhase::Idle,
        });
    }

    // ---- cleaning ----------------------------------------------------

    /// Trash everything `kind` matches, then rescan it.
    ///
    /// Waits for any in-flight scan or clean of the same category first, so
    /// the rescan always starts after this clean request.
    pub fn clean_one(&self, kind: CategoryKind) -> ReclaimOutcome {
        {
            let mut state = self.state.lock();
            while state.slot(kind).phase != CategoryPhase::Idle {
                self.category_idle.wait(&mut state);
            }
            state.set_phase(kind, CategoryPhase::Cleaning);
        }
        self.emit(EngineEvent::PhaseChanged {
            kind,
            phase: CategoryPhase::Cleaning,
        });

        let category = find_category(kind);
        let outcome = reclaim::reclaim(category, &self.home, self.fs.as_ref());

        self.state.lock().set_phase(kind, CategoryPhase::Scanning);
        self.emit(EngineEvent::PhaseChanged {
            kind,
            phase: CategoryPhase::Scanning,
        });
        let size = scanner::scan(category, &self.home, self.fs.as_ref());
        self.finish_scan(kind, size);

        self.emit(EngineEvent::CleanFinished {
            kind,
            bytes_moved: outcome.bytes_moved,
            failures: outcome.failures.len(),
        });
        self.refresh_disk();
        outcome
    }

    /// Sequential clean of every category in registry order. Best effort.
    pub fn clean_all(&self) -> Vec<ReclaimOutcome> {
        let outcomes: Vec<ReclaimOutcome> = list_categories()
            .iter()
            .map(|c| self.clean_one(c.kind))
            .collect();
        info!(
            bytes = outcomes.iter().map(|o| o.bytes_moved).sum::<u64>(),
            failures = outcomes.iter().map(|o| o.failures.len()).sum::<usize>(),
            "clean all finished"
        );
        outcomes
    }

    // ---- maintenance commands ----------------------------------------

    /// Free inactive memory, then re-sample memory once things settle.
    /// `None` if a boost is already running.
    pub fn boost_memory(&self) -> Option<CommandOutcome> {
        let outcome = self.run_held(
            BusyKind::Boost,
            &self.config.commands.purge,
            self.config.boost_settle,
        )?;
        self.refresh_memory();
        Some(outcome)
    }

    pub fn flush_network_cache(&self) -> Option<CommandOutcome> {
        self.run_held(
            BusyKind::FlushNetwork,
            &self.config.commands.flush_network,
            self.config.flush_hold,
        )
    }

    pub fn run_maintenance(&self) -> Option<CommandOutcome> {
        self.run_held(
            BusyKind::Maintenance,
            &self.config.commands.housekeeping,
            self.config.maintenance_hold,
        )
    }

    /// Raise `kind`'s busy flag, run the command, keep the flag up for at
    /// least `hold`, then clear it whatever happened.
    fn run_held(&self, kind: BusyKind, command: &CommandLine, hold: Duration) -> Option<CommandOutcome> {
        let _guard = BusyGuard::acquire(self, kind)?;
        let started = Instant::now();
        info!(command = %command, "running maintenance command");
        let outcome = self.runner.run(command, self.config.command_timeout);
        debug!(command = %command, ?outcome, "maintenance command returned");
        if let Some(remaining) = hold.checked_sub(started.elapsed()) {
            thread::sleep(remaining);
        }
        Some(outcome)
    }

    fn set_busy(&self, kind: BusyKind, value: bool) -> bool {
        let flags = {
            let mut state = self.state.lock();
            let flag = state.busy.flag(kind);
            if value && *flag {
                return false;
            }
            *flag = value;
            state.busy
        };
        self.emit(EngineEvent::BusyChanged(flags));
        true
    }

    // ---- telemetry ---------------------------------------------------

    fn apply(&self, update: Option<SnapshotUpdate>) {
        if let Some(update) = update {
            self.state.lock().snapshot.apply(update);
            self.emit(EngineEvent::SnapshotUpdated);
        }
    }

    pub fn refresh_disk(&self) {
        self.apply(self.sampler.sample_disk());
    }

    pub fn refresh_memory(&self) {
        self.apply(self.sampler.sample_memory());
    }

    pub fn refresh_cpu(&self) {
        self.apply(self.sampler.sample_cpu());
    }

    pub fn refresh_network(&self) {
        self.apply(self.sampler.sample_network());
    }

    pub fn refresh_battery(&self) {
        self.apply(self.sampler.sample_battery());
    }

    pub fn refresh_top_process(&self) {
        self.apply(self.sampler.sample_top_process());
    }

    /// Memory, CPU, network and battery.
    pub fn refresh_fast_tier(&self) {
        self.refresh_memory();
        self.refresh_cpu();
        self.refresh_network();
        self.refresh_battery();
    }

    /// Disk capacity, top process and a full category re-scan.
    pub fn refresh_slow_tier(&self) {
        self.refresh_disk();
        self.refresh_top_process();
        self.scan_all();
    }

    /// Run both telemetry tiers on their own threads until the returned
    /// handle is stopped or dropped. Each tier ticks once immediately.
    pub fn start_timers(self: &Arc<Self>) -> Result<TimerHandle> {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
        let fast = spawn_tier(
            "fast-tier",
            self.config.fast_interval,
            Arc::clone(self),
            stop_rx.clone(),
            Engine::refresh_fast_tier,
        )?;
        let slow = spawn_tier(
            "slow-tier",
            self.config.slow_interval,
            Arc::clone(self),
            stop_rx,
            Engine::refresh_slow_tier,
        )?;
        info!(
            fast_ms = self.config.fast_interval.as_millis() as u64,
            slow_ms = self.config.slow_interval.as_millis() as u64,
            "telemetry timers started"
        );
        Ok(TimerHandle {
            stop: Some(stop_tx),
            threads: vec![fast, slow],
        })
    }
}

/// Clears a busy flag on drop.
struct BusyGuard<'a> {
    engine: &'a Engine,
    kind: BusyKind,
}

impl<'a> BusyGuard<'a> {
    fn acquire(engine: &'a Engine, kind: BusyKind) -> Option<Self> {
        if !engine.set_busy(kind, true) {
            debug!(?kind, "already busy, ignoring request");
            return None;
        }
        Some(Self { engine, kind })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.engine.set_busy(self.kind, false);
    }
}

fn spawn_tier(
    name: &'static str,
    interval: Duration,
    engine: Arc<Engine>,
    stop: Receiver<()>,
    tick: fn(&Engine),
) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("pure-{name}"))
        .spawn(move || {
            let ticker = crossbeam_channel::tick(interval);
            tick(&engine);
            loop {
                select! {
                    recv(stop) -> _ => break,
                    recv(ticker) -> _ => tick(&engine),
                }
            }
            debug!(tier = name, "timer stopped");
        })
        .map_err(|source| PureError::Spawn { what: name, source })
}

/// Owns the timer threads.
pub struct TimerHandle {
    stop: Option<Sender<()>>,
    threads: Vec<JoinHandle<()>>,
}

impl TimerHandle {
    /// Stop both tiers and wait for any tick in progress to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Disconnecting the channel wakes every tier's select.
        self.stop.take();
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
