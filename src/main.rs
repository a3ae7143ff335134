mod cli;
mod output;

use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing::error;

use cli::{Cli, Command};
use pure::categories::{all_slugs, find_by_slug, find_category, list_categories, CleanableCategory};
use pure::fs_access::LocalFs;
use pure::utils::{display_path, format_size};
use pure::{scanner, Engine, EngineConfig, PureError, ReclaimOutcome, Result};

/// Gap between the two readings `status` needs for CPU and network rates.
const RATE_WINDOW: Duration = Duration::from_secs(1);

fn main() -> ExitCode {
    pure::logging::init("pure=info");
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(code = e.code(), error = %e, "command failed");
            output::print_warning(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = EngineConfig::from_env()?;
    let engine = Engine::with_host(config)?;

    match cli.command {
        Command::Scan { category, verbose } => {
            output::print_banner();
            let selected = select_categories(category.as_deref())?;
            scan_and_report(&engine, &selected, verbose);
            Ok(())
        }
        Command::Clean { confirm, category } => {
            output::print_banner();
            let selected = select_categories(category.as_deref())?;
            if !confirm {
                output::print_no_confirm_warning();
                scan_and_report(&engine, &selected, true);
                output::print_dry_run_footer();
                return Ok(());
            }
            let outcomes: Vec<ReclaimOutcome> =
                selected.iter().map(|c| engine.clean_one(c.kind)).collect();
            report_clean(&engine, &outcomes);
            Ok(())
        }
        Command::Status { json } => {
            engine.refresh_disk();
            engine.refresh_fast_tier();
            engine.refresh_top_process();
            thread::sleep(RATE_WINDOW);
            engine.refresh_cpu();
            engine.refresh_network();
            engine.refresh_top_process();

            let snapshot = engine.snapshot();
            if json {
                let text = serde_json::to_string_pretty(&snapshot).map_err(|e| {
                    PureError::probe("status", format!("could not encode snapshot: {e}"))
                })?;
                println!("{text}");
            } else {
                output::print_banner();
                output::print_snapshot(&snapshot);
            }
            Ok(())
        }
        Command::Boost => {
            engine.refresh_memory();
            let before = engine.snapshot().memory;
            let outcome = engine.boost_memory();
            output::print_command_outcome("Memory boost", outcome);
            if let (Some(before), Some(after)) = (before, engine.snapshot().memory) {
                let freed = before.used_bytes.saturating_sub(after.used_bytes);
                output::print_info(&format!(
                    "{} in use ({} freed)",
                    format_size(after.used_bytes),
                    format_size(freed)
                ));
            }
            Ok(())
        }
        Command::FlushDns => {
            output::print_command_outcome("DNS flush", engine.flush_network_cache());
            Ok(())
        }
        Command::Maintenance => {
            output::print_command_outcome("Maintenance scripts", engine.run_maintenance());
            Ok(())
        }
        Command::Watch { ticks } => watch(Arc::new(engine), ticks),
    }
}

fn select_categories(slug: Option<&str>) -> Result<Vec<&'static CleanableCategory>> {
    match slug {
        None => Ok(list_categories().iter().collect()),
        Some(slug) => find_by_slug(slug).map(|c| vec![c]).ok_or_else(|| {
            PureError::InvalidConfig {
                details: format!(
                    "unknown category '{slug}', expected one of: {}",
                    all_slugs().join(", ")
                ),
            }
        }),
    }
}

fn scan_and_report(engine: &Engine, selected: &[&'static CleanableCategory], verbose: bool) {
    if selected.len() == list_categories().len() {
        engine.scan_all();
    } else {
        for category in selected {
            engine.scan_one(category.kind);
        }
    }

    let fs = LocalFs::for_home(engine.home());
    let mut total = 0u64;
    output::print_summary_header();
    for category in selected {
        let result = engine.scan_result(category.kind);
        total = total.saturating_add(result.size_bytes);
        output::print_summary_row(category.display.name, result.size_bytes);
        if verbose {
            for entry in scanner::matched_entries(category, engine.home(), &fs) {
                output::print_scan_entry(&display_path(&entry.path, engine.home()), entry.size_bytes);
            }
        }
    }
    output::print_separator();
    output::print_grand_total(total);
}

fn report_clean(engine: &Engine, outcomes: &[ReclaimOutcome]) {
    let mut moved = 0u64;
    let mut failures = 0usize;
    for outcome in outcomes {
        let name = find_category(outcome.kind).display.name;
        output::print_scan_header(name);
        for entry in &outcome.trashed {
            output::print_trashed(&display_path(&entry.path, engine.home()), entry.size_bytes);
        }
        for failure in &outcome.failures {
            output::print_trash_error(&display_path(&failure.path, engine.home()), &failure.reason);
        }
        moved = moved.saturating_add(outcome.bytes_moved);
        failures += outcome.failures.len();
    }
    println!();
    output::print_clean_complete(moved, failures);
}

fn watch(engine: Arc<Engine>, ticks: Option<u64>) -> Result<()> {
    output::print_banner();
    let timers = engine.start_timers()?;
    let ticker = crossbeam_channel::tick(engine.config().fast_interval);

    let mut printed = 0u64;
    while ticks.map_or(true, |limit| printed < limit) {
        if ticker.recv().is_err() {
            break;
        }
        output::print_scan_header(&chrono::Local::now().format("%H:%M:%S").to_string());
        output::print_snapshot(&engine.snapshot());
        output::print_grand_total(engine.total_reclaimable());
        printed += 1;
    }

    timers.stop();
    Ok(())
}
