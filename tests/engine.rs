use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use pure::commands::{CommandOutcome, CommandRunner};
use pure::config::CommandLine;
use pure::fs_access::{DirItem, FileSystem, LocalFs, TrashLocation};
use pure::telemetry::{
    BatteryState, CpuTicks, DiskUsage, MemoryUsage, NetCounters, RawPowerInfo, SystemStats,
};
use pure::{CategoryKind, CategoryPhase, Engine, EngineConfig, EngineEvent, PureError, Result};

/// Memory usage drops by a fixed step every time it is read; the CPU is a
/// steady 25% busy.
struct FakeStats {
    used_memory: AtomicU64,
    cpu_reads: AtomicU64,
}

impl FakeStats {
    fn new() -> Self {
        Self {
            used_memory: AtomicU64::new(1_000_000),
            cpu_reads: AtomicU64::new(0),
        }
    }
}

impl SystemStats for FakeStats {
    fn volume_capacity(&self, _path: &Path) -> Result<DiskUsage> {
        Ok(DiskUsage {
            total_bytes: 1_000_000,
            available_bytes: 250_000,
        })
    }

    fn memory(&self) -> Result<MemoryUsage> {
        let used = self.used_memory.fetch_sub(1_000, Ordering::SeqCst);
        Ok(MemoryUsage {
            used_bytes: used,
            total_bytes: 2_000_000,
        })
    }

    fn cpu_ticks(&self) -> Result<CpuTicks> {
        let n = self.cpu_reads.fetch_add(1, Ordering::SeqCst);
        Ok(CpuTicks {
            user: 10 + 10 * n,
            system: 10,
            idle: 80 + 30 * n,
            nice: 0,
        })
    }

    fn network_counters(&self, _interface: Option<&str>) -> Result<NetCounters> {
        Err(PureError::Unsupported { probe: "network" })
    }

    fn power_source(&self) -> Result<Option<RawPowerInfo>> {
        Ok(None)
    }

    fn top_process(&self) -> Result<String> {
        Ok("WindowServer".to_string())
    }
}

#[derive(Default)]
struct RecordingRunner {
    commands: parking_lot::Mutex<Vec<CommandLine>>,
}

impl CommandRunner for RecordingRunner {
    fn run(&self, command: &CommandLine, _timeout: Duration) -> CommandOutcome {
        self.commands.lock().push(command.clone());
        CommandOutcome::Completed { success: true }
    }
}

/// Runner that parks until the test releases it.
struct GatedRunner {
    entered: Barrier,
    release: Barrier,
    calls: AtomicUsize,
}

impl CommandRunner for GatedRunner {
    fn run(&self, _command: &CommandLine, _timeout: Duration) -> CommandOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.wait();
        self.release.wait();
        CommandOutcome::Completed { success: true }
    }
}

/// Local disk whose directory listings can be slowed down.
struct SlowFs {
    inner: LocalFs,
    delay: Duration,
    listings: AtomicUsize,
}

impl FileSystem for SlowFs {
    fn list_dir(&self, path: &Path) -> std::io::Result<Vec<DirItem>> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.delay);
        self.inner.list_dir(path)
    }

    fn tree_size(&self, path: &Path) -> u64 {
        self.inner.tree_size(path)
    }

    fn move_to_trash(&self, path: &Path) -> Result<PathBuf> {
        self.inner.move_to_trash(path)
    }
}

fn write(path: PathBuf, len: usize) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, vec![0u8; len]).unwrap();
}

/// A home directory with something in every category but the large files
/// and browser caches.
fn populated_home() -> tempfile::TempDir {
    let home = tempfile::tempdir().unwrap();
    let h = home.path();
    write(h.join("Library/Caches/com.example.app/blob.bin"), 1_000);
    write(h.join("Library/Caches/loose.db"), 24);
    write(h.join("Library/Logs/app.log"), 200);
    write(h.join("Library/Logs/DiagnosticReports/crash.ips"), 50);
    write(h.join("Downloads/setup.dmg"), 300);
    write(h.join("Downloads/notes.txt"), 10);
    write(h.join("Desktop/Screenshot 2024-01-01.png"), 70);
    write(h.join("Desktop/todo.txt"), 5);
    home
}

fn trash(home: &Path) -> TrashLocation {
    TrashLocation {
        files: home.join(".Trash"),
        info: None,
    }
}

fn quick_config() -> EngineConfig {
    EngineConfig {
        fast_interval: Duration::from_millis(20),
        slow_interval: Duration::from_millis(40),
        boost_settle: Duration::from_millis(30),
        flush_hold: Duration::from_millis(30),
        maintenance_hold: Duration::from_millis(30),
        ..EngineConfig::default()
    }
}

fn engine_with(
    home: &Path,
    fs: Arc<dyn FileSystem>,
    runner: Arc<dyn CommandRunner>,
) -> Engine {
    Engine::new(
        home.to_path_buf(),
        quick_config(),
        fs,
        Arc::new(FakeStats::new()),
        runner,
    )
}

fn engine(home: &Path) -> Engine {
    engine_with(
        home,
        Arc::new(LocalFs::new(trash(home))),
        Arc::new(RecordingRunner::default()),
    )
}

#[test]
fn scan_all_sizes_every_category() {
    let home = populated_home();
    let engine = engine(home.path());

    assert_eq!(engine.scan_all(), 7);

    let size = |kind| engine.scan_result(kind).size_bytes;
    assert_eq!(size(CategoryKind::SystemCache), 1_024);
    assert_eq!(size(CategoryKind::BrowserCache), 0);
    assert_eq!(size(CategoryKind::LargeFiles), 0);
    assert_eq!(size(CategoryKind::Logs), 250);
    assert_eq!(size(CategoryKind::CrashReports), 50);
    assert_eq!(size(CategoryKind::Downloads), 300);
    assert_eq!(size(CategoryKind::ScreenCaptures), 70);

    assert!(engine
        .scan_results()
        .iter()
        .all(|r| r.last_updated.is_some() && !r.is_scanning));
    assert_eq!(engine.total_reclaimable(), 1_694);
    assert!(!engine.is_scanning());
}

#[test]
fn total_counts_only_completed_scans() {
    let home = populated_home();
    let engine = engine(home.path());

    assert!(engine.scan_one(CategoryKind::Downloads));
    assert_eq!(engine.total_reclaimable(), 300);
    assert!(engine
        .scan_result(CategoryKind::Logs)
        .last_updated
        .is_none());
}

#[test]
fn scanning_never_modifies_the_home() {
    let home = populated_home();
    let engine = engine(home.path());
    engine.scan_all();
    engine.scan_all();

    assert!(home.path().join("Downloads/setup.dmg").exists());
    assert!(home.path().join("Library/Logs/app.log").exists());
    assert!(!home.path().join(".Trash").exists());
}

#[test]
fn scan_events_report_phases_and_sizes() {
    let home = populated_home();
    let engine = engine(home.path());
    let events = engine.subscribe();

    engine.scan_one(CategoryKind::ScreenCaptures);

    let received: Vec<EngineEvent> = events.try_iter().collect();
    assert_eq!(
        received,
        vec![
            EngineEvent::PhaseChanged {
                kind: CategoryKind::ScreenCaptures,
                phase: CategoryPhase::Scanning,
            },
            EngineEvent::ScanCompleted {
                kind: CategoryKind::ScreenCaptures,
                size_bytes: 70,
            },
            EngineEvent::PhaseChanged {
                kind: CategoryKind::ScreenCaptures,
                phase: CategoryPhase::Idle,
            },
        ]
    );
}

#[test]
fn concurrent_scan_requests_coalesce() {
    let home = populated_home();
    let fs = Arc::new(SlowFs {
        inner: LocalFs::new(trash(home.path())),
        delay: Duration::from_millis(300),
        listings: AtomicUsize::new(0),
    });
    let engine = Arc::new(engine_with(
        home.path(),
        fs.clone(),
        Arc::new(RecordingRunner::default()),
    ));

    let first = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || engine.scan_one(CategoryKind::Logs))
    };
    let deadline = Instant::now() + Duration::from_secs(5);
    while engine.phase(CategoryKind::Logs) != CategoryPhase::Scanning {
        assert!(Instant::now() < deadline);
        thread::sleep(Duration::from_millis(5));
    }

    assert!(!engine.scan_one(CategoryKind::Logs));
    assert!(first.join().unwrap());
    assert_eq!(fs.listings.load(Ordering::SeqCst), 1);
    assert_eq!(engine.scan_result(CategoryKind::Logs).size_bytes, 200);
}

#[test]
fn clean_trashes_downloads_installers_and_rescans() {
    let home = populated_home();
    let engine = engine(home.path());
    engine.scan_all();
    let before = engine.scan_result(CategoryKind::Downloads);

    let outcome = engine.clean_one(CategoryKind::Downloads);

    assert_eq!(outcome.bytes_moved, 300);
    assert!(outcome.failures.is_empty());
    assert!(!home.path().join("Downloads/setup.dmg").exists());
    assert!(home.path().join("Downloads/notes.txt").exists());
    assert!(home.path().join(".Trash/setup.dmg").exists());

    let after = engine.scan_result(CategoryKind::Downloads);
    assert_eq!(after.size_bytes, 0);
    assert!(after.size_bytes <= before.size_bytes);
    assert!(after.last_updated >= before.last_updated);
    assert_eq!(engine.phase(CategoryKind::Downloads), CategoryPhase::Idle);
    assert!(engine.snapshot().disk.is_some());
}

#[test]
fn clean_logs_empties_the_whole_logs_tree() {
    let home = populated_home();
    let engine = engine(home.path());

    let outcome = engine.clean_one(CategoryKind::Logs);

    assert_eq!(outcome.bytes_moved, 250);
    assert!(!home.path().join("Library/Logs/DiagnosticReports").exists());
    assert!(home
        .path()
        .join(".Trash/DiagnosticReports/crash.ips")
        .exists());
    assert_eq!(engine.scan_result(CategoryKind::Logs).size_bytes, 0);

    engine.scan_one(CategoryKind::CrashReports);
    assert_eq!(engine.scan_result(CategoryKind::CrashReports).size_bytes, 0);
}

#[test]
fn clean_emits_phase_sequence_and_summary() {
    let home = populated_home();
    let engine = engine(home.path());
    let events = engine.subscribe();

    engine.clean_one(CategoryKind::ScreenCaptures);

    let phases: Vec<CategoryPhase> = events
        .try_iter()
        .filter_map(|e| match e {
            EngineEvent::PhaseChanged { phase, .. } => Some(phase),
            EngineEvent::CleanFinished {
                bytes_moved,
                failures,
                ..
            } => {
                assert_eq!((bytes_moved, failures), (70, 0));
                None
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        phases,
        vec![
            CategoryPhase::Cleaning,
            CategoryPhase::Scanning,
            CategoryPhase::Idle
        ]
    );
}

#[test]
fn clean_waits_for_inflight_scan() {
    let home = populated_home();
    let fs = Arc::new(SlowFs {
        inner: LocalFs::new(trash(home.path())),
        delay: Duration::from_millis(200),
        listings: AtomicUsize::new(0),
    });
    let engine = Arc::new(engine_with(
        home.path(),
        fs,
        Arc::new(RecordingRunner::default()),
    ));

    let scan = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || engine.scan_one(CategoryKind::ScreenCaptures))
    };
    while engine.phase(CategoryKind::ScreenCaptures) != CategoryPhase::Scanning {
        thread::yield_now();
    }

    let outcome = engine.clean_one(CategoryKind::ScreenCaptures);
    scan.join().unwrap();

    assert_eq!(outcome.bytes_moved, 70);
    // The older scan result must not overwrite the post-clean size.
    assert_eq!(engine.scan_result(CategoryKind::ScreenCaptures).size_bytes, 0);
}

#[test]
fn clean_all_runs_every_category_best_effort() {
    let home = populated_home();
    let engine = engine(home.path());

    let outcomes = engine.clean_all();

    assert_eq!(outcomes.len(), 7);
    let moved: u64 = outcomes.iter().map(|o| o.bytes_moved).sum();
    // The Logs clean takes the nested crash reports with it.
    assert_eq!(moved, 1_644);
    assert!(outcomes.iter().all(|o| o.failures.is_empty()));
    assert_eq!(engine.total_reclaimable(), 0);
    assert!(home.path().join("Desktop/todo.txt").exists());
    assert!(home.path().join("Downloads/notes.txt").exists());
}

#[test]
fn maintenance_commands_use_configured_programs() {
    let home = tempfile::tempdir().unwrap();
    let runner = Arc::new(RecordingRunner::default());
    let engine = engine_with(
        home.path(),
        Arc::new(LocalFs::new(trash(home.path()))),
        runner.clone(),
    );

    let started = Instant::now();
    assert_eq!(
        engine.flush_network_cache(),
        Some(CommandOutcome::Completed { success: true })
    );
    assert!(started.elapsed() >= Duration::from_millis(30));
    engine.run_maintenance();
    engine.boost_memory();

    let config = EngineConfig::default();
    let commands = runner.commands.lock();
    assert_eq!(commands[0], config.commands.flush_network);
    assert_eq!(commands[1], config.commands.housekeeping);
    assert_eq!(commands[2], config.commands.purge);
    assert!(!engine.busy().any());
}

#[test]
fn boost_samples_memory_after_settling() {
    let home = tempfile::tempdir().unwrap();
    let engine = engine(home.path());
    engine.refresh_memory();
    let before = engine.snapshot().memory.unwrap();

    engine.boost_memory();

    let after = engine.snapshot().memory.unwrap();
    assert!(after.used_bytes < before.used_bytes);
}

#[test]
fn busy_operation_ignores_second_request() {
    let home = tempfile::tempdir().unwrap();
    let runner = Arc::new(GatedRunner {
        entered: Barrier::new(2),
        release: Barrier::new(2),
        calls: AtomicUsize::new(0),
    });
    let engine = Arc::new(engine_with(
        home.path(),
        Arc::new(LocalFs::new(trash(home.path()))),
        runner.clone(),
    ));

    let first = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || engine.flush_network_cache())
    };
    runner.entered.wait();
    assert!(engine.busy().flushing_network);
    assert_eq!(engine.flush_network_cache(), None);
    runner.release.wait();

    assert!(first.join().unwrap().is_some());
    assert_eq!(runner.calls.load(Ordering::SeqCst), 1);
    assert!(!engine.busy().flushing_network);
}

#[test]
fn fast_tier_fills_snapshot_and_tolerates_failing_readings() {
    let home = tempfile::tempdir().unwrap();
    let engine = engine(home.path());

    engine.refresh_fast_tier();
    let snapshot = engine.snapshot();
    assert!(snapshot.memory.is_some());
    assert!(snapshot.cpu.is_none(), "first CPU reading is only a baseline");
    assert!(snapshot.network.is_none());
    assert_eq!(snapshot.battery, BatteryState::NotApplicable);

    engine.refresh_fast_tier();
    assert_eq!(engine.snapshot().cpu, Some(0.25));
}

#[test]
fn slow_tier_refreshes_disk_top_process_and_sizes() {
    let home = populated_home();
    let engine = engine(home.path());

    engine.refresh_slow_tier();

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.disk.unwrap().available_bytes, 250_000);
    assert_eq!(snapshot.top_process.as_deref(), Some("WindowServer"));
    assert_eq!(engine.total_reclaimable(), 1_694);
}

#[test]
fn timers_keep_sampling_until_stopped() {
    let home = populated_home();
    let engine = Arc::new(engine(home.path()));

    let timers = engine.start_timers().unwrap();
    let deadline = Instant::now() + Duration::from_secs(10);
    while engine.snapshot().cpu.is_none() || engine.total_reclaimable() == 0 {
        assert!(Instant::now() < deadline, "timers did not produce readings");
        thread::sleep(Duration::from_millis(10));
    }
    timers.stop();

    let frozen = engine.snapshot();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(engine.snapshot(), frozen);
}
