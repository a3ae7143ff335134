//! The real OS behind [`SystemStats`].

use std::path::Path;

use parking_lot::Mutex;
use sysinfo::{Networks, ProcessesToUpdate, System};
use tracing::debug;

use super::battery::{self, RawPowerInfo};
use super::rates::{CpuTicks, NetCounters};
use super::snapshot::{DiskUsage, MemoryUsage};
use super::SystemStats;
use crate::error::{PureError, Result};

const LOOPBACK_INTERFACES: &[&str] = &["lo", "lo0"];

/// Counter reads backed by `sysinfo`, `libc` and the kernel's own files.
pub struct HostStats {
    // Process CPU usage is relative to the previous refresh, so the same
    // System has to be reused across top-process lookups.
    system: Mutex<System>,
    // Interface picked when none is configured; kept while it exists.
    primary_interface: Mutex<Option<String>>,
}

impl Default for HostStats {
    fn default() -> Self {
        Self::new()
    }
}

impl HostStats {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
            primary_interface: Mutex::new(None),
        }
    }
}

impl SystemStats for HostStats {
    fn volume_capacity(&self, path: &Path) -> Result<DiskUsage> {
        statvfs(path)
    }

    fn memory(&self) -> Result<MemoryUsage> {
        let mut sys = self.system.lock();
        sys.refresh_memory();
        let total_bytes = sys.total_memory();
        if total_bytes == 0 {
            return Err(PureError::probe("memory", "total memory reported as 0"));
        }
        let used_bytes = used_memory(&sys)?;
        Ok(MemoryUsage {
            used_bytes,
            total_bytes,
        })
    }

    fn cpu_ticks(&self) -> Result<CpuTicks> {
        read_cpu_ticks()
    }

    fn network_counters(&self, interface: Option<&str>) -> Result<NetCounters> {
        let networks = Networks::new_with_refreshed_list();
        let list = networks.list();
        let name = match interface {
            Some(name) => name.to_string(),
            None => {
                let mut primary = self.primary_interface.lock();
                match primary.as_ref().filter(|name| list.contains_key(name.as_str())) {
                    Some(name) => name.clone(),
                    None => {
                        let chosen = list
                            .iter()
                            .filter(|(name, _)| !LOOPBACK_INTERFACES.contains(&name.as_str()))
                            .max_by_key(|(_, data)| data.total_received())
                            .map(|(name, _)| name.clone())
                            .ok_or_else(|| PureError::probe("network", "no non-loopback interface"))?;
                        debug!(interface = %chosen, "primary network interface selected");
                        *primary = Some(chosen.clone());
                        chosen
                    }
                }
            }
        };
        let data = list
            .get(&name)
            .ok_or_else(|| PureError::probe("network", format!("no interface named {name}")))?;
        Ok(NetCounters {
            rx_bytes: data.total_received(),
            tx_bytes: data.total_transmitted(),
            interface: name,
        })
    }

    fn power_source(&self) -> Result<Option<RawPowerInfo>> {
        read_power_source()
    }

    fn top_process(&self) -> Result<String> {
        let mut sys = self.system.lock();
        sys.refresh_processes(ProcessesToUpdate::All, true);
        sys.processes()
            .values()
            .filter(|p| p.cpu_usage() > 0.0)
            .max_by(|a, b| a.cpu_usage().total_cmp(&b.cpu_usage()))
            .map(|p| p.name().to_string_lossy().into_owned())
            .ok_or_else(|| PureError::probe("top_process", "no process has measurable CPU yet"))
    }
}

#[cfg(unix)]
fn statvfs(path: &Path) -> Result<DiskUsage> {
    use std::ffi::CString;
    use std::mem::MaybeUninit;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| PureError::probe("disk", "path contains a NUL byte"))?;
    let mut stat = MaybeUninit::<libc::statvfs>::uninit();
    let ret = unsafe { libc::statvfs(c_path.as_ptr(), stat.as_mut_ptr()) };
    if ret != 0 {
        return Err(PureError::io(path, std::io::Error::last_os_error()));
    }
    let stat = unsafe { stat.assume_init() };
    let block_size = stat.f_frsize as u64;
    Ok(DiskUsage {
        total_bytes: (stat.f_blocks as u64).saturating_mul(block_size),
        available_bytes: (stat.f_bavail as u64).saturating_mul(block_size),
    })
}

#[cfg(not(unix))]
fn statvfs(_path: &Path) -> Result<DiskUsage> {
    Err(PureError::Unsupported { probe: "disk" })
}

#[cfg(target_os = "linux")]
fn read_cpu_ticks() -> Result<CpuTicks> {
    let raw = std::fs::read_to_string("/proc/stat").map_err(|e| PureError::io("/proc/stat", e))?;
    parse_proc_stat(&raw).ok_or_else(|| PureError::probe("cpu", "unrecognised /proc/stat"))
}

#[cfg(target_os = "macos")]
fn read_cpu_ticks() -> Result<CpuTicks> {
    let mut info = std::mem::MaybeUninit::<libc::host_cpu_load_info>::zeroed();
    let mut count = libc::HOST_CPU_LOAD_INFO_COUNT;
    #[allow(deprecated)]
    let ret = unsafe {
        libc::host_statistics(
            libc::mach_host_self(),
            libc::HOST_CPU_LOAD_INFO,
            info.as_mut_ptr().cast::<libc::integer_t>(),
            &mut count,
        )
    };
    if ret != libc::KERN_SUCCESS {
        return Err(PureError::probe("cpu", format!("host_statistics returned {ret}")));
    }
    let ticks = unsafe { info.assume_init() }.cpu_ticks;
    let tick = |state: libc::c_int| u64::from(ticks[state as usize]);
    Ok(CpuTicks {
        user: tick(libc::CPU_STATE_USER),
        system: tick(libc::CPU_STATE_SYSTEM),
        idle: tick(libc::CPU_STATE_IDLE),
        nice: tick(libc::CPU_STATE_NICE),
    })
}

/// Active + wired + compressed pages, as Activity Monitor counts them.
#[cfg(target_os = "macos")]
fn used_memory(_sys: &System) -> Result<u64> {
    let mut stats = std::mem::MaybeUninit::<libc::vm_statistics64>::zeroed();
    let mut count = libc::HOST_VM_INFO64_COUNT;
    #[allow(deprecated)]
    let ret = unsafe {
        libc::host_statistics64(
            libc::mach_host_self(),
            libc::HOST_VM_INFO64,
            stats.as_mut_ptr().cast::<libc::integer_t>(),
            &mut count,
        )
    };
    if ret != libc::KERN_SUCCESS {
        return Err(PureError::probe("memory", format!("host_statistics64 returned {ret}")));
    }
    let stats = unsafe { stats.assume_init() };
    let page_size = unsafe { libc::vm_page_size } as u64;
    Ok(used_pages_to_bytes(
        u64::from(stats.active_count),
        u64::from(stats.wire_count),
        u64::from(stats.compressor_page_count),
        page_size,
    ))
}

#[cfg(not(target_os = "macos"))]
fn used_memory(sys: &System) -> Result<u64> {
    Ok(sys.used_memory())
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn read_cpu_ticks() -> Result<CpuTicks> {
    Err(PureError::Unsupported { probe: "cpu" })
}

#[cfg(target_os = "macos")]
fn read_power_source() -> Result<Option<RawPowerInfo>> {
    let output = command_stdout("ioreg", &["-rn", "AppleSmartBattery"])?;
    Ok(battery::parse_ioreg(&output))
}

#[cfg(not(target_os = "macos"))]
fn read_power_source() -> Result<Option<RawPowerInfo>> {
    let root = Path::new("/sys/class/power_supply");
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(PureError::io(root, e)),
    };
    for entry in entries.flatten() {
        let supply = entry.path();
        let is_battery = std::fs::read_to_string(supply.join("type"))
            .is_ok_and(|kind| kind.trim() == "Battery");
        if !is_battery {
            continue;
        }
        let uevent = supply.join("uevent");
        let contents = std::fs::read_to_string(&uevent).map_err(|e| PureError::io(&uevent, e))?;
        return Ok(Some(battery::parse_uevent(&contents)));
    }
    Ok(None)
}

#[cfg(target_os = "macos")]
fn command_stdout(program: &str, args: &[&str]) -> Result<String> {
    let output = std::process::Command::new(program)
        .args(args)
        .output()
        .map_err(|source| PureError::Launch {
            program: program.to_string(),
            source,
        })?;
    if !output.status.success() {
        return Err(PureError::probe("command", format!("{program} exited with {}", output.status)));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Bytes held by active, wired and compressed pages.
pub fn used_pages_to_bytes(active: u64, wired: u64, compressed: u64, page_size: u64) -> u64 {
    active
        .saturating_add(wired)
        .saturating_add(compressed)
        .saturating_mul(page_size)
}

/// Aggregate ticks from the `cpu ` line of `/proc/stat`. iowait counts as
/// idle; irq, softirq and steal count as system.
pub fn parse_proc_stat(raw: &str) -> Option<CpuTicks> {
    let line = raw.lines().find(|l| l.starts_with("cpu "))?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|f| f.parse().ok())
        .collect::<Option<_>>()?;
    let get = |i: usize| fields.get(i).copied().unwrap_or(0);
    if fields.len() < 4 {
        return None;
    }
    Some(CpuTicks {
        user: get(0),
        nice: get(1),
        system: get(2) + get(5) + get(6) + get(7),
        idle: get(3) + get(4),
    })
}
