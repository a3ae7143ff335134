//! Launching the opaque maintenance programs (purge, DNS flush, periodic).

use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::CommandLine;
use crate::error::PureError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The process exited before the timeout.
    Completed { success: bool },
    /// Still running when the timeout hit; left to finish on its own.
    TimedOut,
    /// The program could not be started at all.
    LaunchFailed,
}

pub trait CommandRunner: Send + Sync {
    /// Start `command` and wait for it for at most `timeout`.
    fn run(&self, command: &CommandLine, timeout: Duration) -> CommandOutcome;
}

/// Spawns real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, command: &CommandLine, timeout: Duration) -> CommandOutcome {
        let mut child = match Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(source) => {
                let err = PureError::Launch {
                    program: command.program.clone(),
                    source,
                };
                warn!(error = %err, "maintenance command did not start");
                return CommandOutcome::LaunchFailed;
            }
        };

        let deadline = Instant::now() + timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    debug!(command = %command, %status, "maintenance command exited");
                    return CommandOutcome::Completed {
                        success: status.success(),
                    };
                }
                Ok(None) if Instant::now() >= deadline => {
                    debug!(command = %command, "maintenance command still running, not waiting further");
                    // Reap it in the background so it does not linger as a zombie.
                    thread::spawn(move || {
                        let _ = child.wait();
                    });
                    return CommandOutcome::TimedOut;
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    warn!(command = %command, error = %e, "lost track of maintenance command");
                    return CommandOutcome::TimedOut;
                }
            }
        }
    }
}
