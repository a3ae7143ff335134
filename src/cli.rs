use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "pure",
    about = "Find reclaimable disk space, move it to the trash and watch system health",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Size every cleanable category (nothing is moved)
    Scan {
        /// Only scan one category, e.g. "logs" or "system-caches"
        #[arg(long)]
        category: Option<String>,

        /// List the matched entries, not just the totals
        #[arg(long)]
        verbose: bool,
    },

    /// Move category contents to the trash (requires --confirm)
    Clean {
        /// Actually move files. Without this flag, behaves like scan.
        #[arg(long)]
        confirm: bool,

        /// Only clean one category
        #[arg(long)]
        category: Option<String>,
    },

    /// Print one telemetry snapshot
    Status {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Ask the OS to free inactive memory
    Boost,

    /// Flush the DNS cache (prompts for an administrator password)
    FlushDns,

    /// Run the daily/weekly/monthly housekeeping scripts (prompts for a password)
    Maintenance,

    /// Keep sampling telemetry and print each fast-tier update
    Watch {
        /// Stop after this many updates
        #[arg(long)]
        ticks: Option<u64>,
    },
}
