use colored::Colorize;

use pure::telemetry::{BatteryState, SystemSnapshot};
use pure::utils::{format_rate, format_size};
use pure::CommandOutcome;

pub fn print_banner() {
    println!(
        "{}",
        concat!("pure - disk cleanup and system health v", env!("CARGO_PKG_VERSION"))
            .bold()
            .cyan()
    );
    println!();
}

pub fn print_scan_header(label: &str) {
    println!("{}", format!("=== {label} ===").bold().white());
}

pub fn print_scan_entry(path: &str, size: u64) {
    println!("  {}  {}", path.dimmed(), format_size(size).yellow());
}

pub fn print_summary_header() {
    println!("{}", "=== Summary ===".bold().white());
}

pub fn print_summary_row(label: &str, size: u64) {
    println!("  {:<30} {}", label, format_size(size).green());
}

pub fn print_separator() {
    println!("  {}", "─".repeat(45).dimmed());
}

pub fn print_grand_total(total: u64) {
    println!(
        "  {:<30} {}",
        "Total reclaimable:".bold(),
        format_size(total).green().bold()
    );
    println!();
}

pub fn print_warning(msg: &str) {
    println!("{} {}", "Warning:".red().bold(), msg.red());
}

pub fn print_info(msg: &str) {
    println!("{} {}", "Info:".cyan().bold(), msg);
}

pub fn print_dry_run_footer() {
    println!(
        "{}",
        "This was a dry run. Run `pure clean --confirm` to move these to the trash."
            .yellow()
            .bold()
    );
}

pub fn print_no_confirm_warning() {
    println!(
        "{}",
        "No --confirm flag provided. Running as dry-run scan."
            .yellow()
            .bold()
    );
    println!();
}

pub fn print_trashed(path: &str, size: u64) {
    println!(
        "  {} {}  {}",
        "Trashed".green(),
        path.dimmed(),
        format_size(size).yellow()
    );
}

pub fn print_trash_error(path: &str, err: &str) {
    println!("  {} {}: {}", "Failed".red().bold(), path.dimmed(), err.red());
}

pub fn print_clean_complete(moved: u64, failures: usize) {
    let mut line = format!("{} moved to the trash.", format_size(moved));
    if failures > 0 {
        line.push_str(&format!(" {failures} item(s) could not be moved."));
    }
    println!("{} {}", "Cleaned!".green().bold(), line.green());
}

pub fn print_command_outcome(label: &str, outcome: Option<CommandOutcome>) {
    match outcome {
        Some(CommandOutcome::Completed { success: true }) => {
            println!("{} {label} finished.", "Done:".green().bold())
        }
        Some(CommandOutcome::Completed { success: false }) => {
            print_warning(&format!("{label} exited with an error."))
        }
        Some(CommandOutcome::TimedOut) => {
            print_info(&format!("{label} is still running in the background."))
        }
        Some(CommandOutcome::LaunchFailed) => print_warning(&format!("{label} could not be started.")),
        None => print_info(&format!("{label} is already running.")),
    }
}

fn unknown() -> String {
    "--".dimmed().to_string()
}

pub fn print_snapshot(snapshot: &SystemSnapshot) {
    let disk = snapshot.disk.map_or_else(unknown, |d| {
        format!(
            "{} free of {} ({:.0}% used)",
            format_size(d.available_bytes),
            format_size(d.total_bytes),
            d.used_fraction() * 100.0
        )
    });
    let memory = snapshot.memory.map_or_else(unknown, |m| {
        format!(
            "{} / {} ({:.0}%)",
            format_size(m.used_bytes),
            format_size(m.total_bytes),
            m.used_fraction() * 100.0
        )
    });
    let cpu = snapshot
        .cpu
        .map_or_else(unknown, |c| format!("{:.0}%", c * 100.0));
    let network = snapshot.network.map_or_else(unknown, |n| {
        format!(
            "down {}  up {}",
            format_rate(n.download_bps),
            format_rate(n.upload_bps)
        )
    });
    let top = snapshot.top_process.clone().unwrap_or_else(unknown);
    let battery = match snapshot.battery {
        BatteryState::Unknown => unknown(),
        BatteryState::NotApplicable => "no battery".dimmed().to_string(),
        BatteryState::Present(b) => {
            let temp = b
                .thermal
                .celsius
                .map(|c| format!(", {c:.1}°C"))
                .unwrap_or_default();
            format!(
                "{:.0}% (health {:?}, {:?}{temp})",
                b.percent, b.health, b.thermal.class
            )
        }
    };

    println!("  {:<12} {}", "Disk".bold(), disk);
    println!("  {:<12} {}", "Memory".bold(), memory);
    println!("  {:<12} {}", "CPU".bold(), cpu);
    println!("  {:<12} {}", "Network".bold(), network);
    println!("  {:<12} {}", "Top process".bold(), top);
    println!("  {:<12} {}", "Battery".bold(), battery);
}
