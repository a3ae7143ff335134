//! Engine timing and command configuration.
//!
//! Category definitions and thresholds are compiled in (see
//! [`crate::categories`]); only cadences, hold times and the external
//! maintenance commands can be overridden, through `PURE_*` environment
//! variables.

use std::time::Duration;

use crate::error::{PureError, Result};

/// One external program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
        }
    }

    /// Wrap a shell snippet in an AppleScript admin prompt so the OS performs
    /// the elevation, not us.
    pub fn elevated(script: &str) -> Self {
        let escaped = script.replace('\\', "\\\\").replace('"', "\\\"");
        Self::new(
            "osascript",
            &[
                "-e",
                &format!("do shell script \"{escaped}\" with administrator privileges"),
            ],
        )
    }
}

impl std::fmt::Display for CommandLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// The three coarse maintenance actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenanceCommands {
    pub purge: CommandLine,
    pub flush_network: CommandLine,
    pub housekeeping: CommandLine,
}

impl Default for MaintenanceCommands {
    fn default() -> Self {
        Self {
            purge: CommandLine::new("/usr/sbin/purge", &[]),
            flush_network: CommandLine::elevated(
                "dscacheutil -flushcache; killall -HUP mDNSResponder",
            ),
            housekeeping: CommandLine::elevated("periodic daily weekly monthly"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Memory, CPU, network and battery cadence.
    pub fast_interval: Duration,
    /// Disk capacity, top process and full category re-scan cadence.
    pub slow_interval: Duration,
    /// Wait after launching purge before memory is re-sampled.
    pub boost_settle: Duration,
    pub flush_hold: Duration,
    pub maintenance_hold: Duration,
    /// Upper bound on how long a maintenance command is awaited.
    pub command_timeout: Duration,
    /// Interface used for throughput; `None` picks the busiest non-loopback one.
    pub network_interface: Option<String>,
    pub commands: MaintenanceCommands,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fast_interval: Duration::from_secs(3),
            slow_interval: Duration::from_secs(30),
            boost_settle: Duration::from_millis(1500),
            flush_hold: Duration::from_secs(2),
            maintenance_hold: Duration::from_secs(5),
            command_timeout: Duration::from_secs(120),
            network_interface: None,
            commands: MaintenanceCommands::default(),
        }
    }
}

impl EngineConfig {
    /// Defaults with `PURE_*` environment overrides applied.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_overrides_from(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn apply_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        set_duration_ms(&mut lookup, "PURE_FAST_INTERVAL_MS", &mut self.fast_interval)?;
        set_duration_ms(&mut lookup, "PURE_SLOW_INTERVAL_MS", &mut self.slow_interval)?;
        set_duration_ms(&mut lookup, "PURE_BOOST_SETTLE_MS", &mut self.boost_settle)?;
        set_duration_ms(&mut lookup, "PURE_FLUSH_HOLD_MS", &mut self.flush_hold)?;
        set_duration_ms(&mut lookup, "PURE_MAINTENANCE_HOLD_MS", &mut self.maintenance_hold)?;
        set_duration_ms(&mut lookup, "PURE_COMMAND_TIMEOUT_MS", &mut self.command_timeout)?;

        if let Some(raw) = lookup("PURE_NETWORK_INTERFACE") {
            let name = raw.trim();
            self.network_interface = (!name.is_empty()).then(|| name.to_string());
        }

        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.fast_interval.is_zero() || self.slow_interval.is_zero() {
            return Err(PureError::InvalidConfig {
                details: "sampling intervals must be non-zero".to_string(),
            });
        }
        if self.slow_interval < self.fast_interval {
            return Err(PureError::InvalidConfig {
                details: format!(
                    "slow interval ({:?}) must not be shorter than fast interval ({:?})",
                    self.slow_interval, self.fast_interval
                ),
            });
        }
        Ok(())
    }
}

fn set_duration_ms<F>(lookup: &mut F, key: &str, slot: &mut Duration) -> Result<()>
where
    F: FnMut(&str) -> Option<String>,
{
    if let Some(raw) = lookup(key) {
        let ms: u64 = raw.trim().parse().map_err(|_| PureError::InvalidConfig {
            details: format!("{key} expects milliseconds, got {raw:?}"),
        })?;
        *slot = Duration::from_millis(ms);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn apply(vars: &[(&str, &str)]) -> Result<EngineConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        let mut config = EngineConfig::default();
        config.apply_overrides_from(|key| map.get(key).cloned())?;
        Ok(config)
    }

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.boost_settle, Duration::from_millis(1500));
        assert!(config.fast_interval < config.slow_interval);
    }

    #[test]
    fn env_overrides_apply() {
        let config = apply(&[
            ("PURE_FAST_INTERVAL_MS", "500"),
            ("PURE_NETWORK_INTERFACE", " en0 "),
        ])
        .unwrap();
        assert_eq!(config.fast_interval, Duration::from_millis(500));
        assert_eq!(config.network_interface.as_deref(), Some("en0"));
    }

    #[test]
    fn garbage_override_is_rejected() {
        let err = apply(&[("PURE_SLOW_INTERVAL_MS", "soon")]).unwrap_err();
        assert_eq!(err.code(), "PURE-1001");
    }

    #[test]
    fn slow_tier_cannot_outpace_fast_tier() {
        assert!(apply(&[("PURE_SLOW_INTERVAL_MS", "100")]).is_err());
        assert!(apply(&[("PURE_FAST_INTERVAL_MS", "0")]).is_err());
    }

    #[test]
    fn elevated_command_escapes_quotes() {
        let cmd = CommandLine::elevated(r#"echo "hi""#);
        assert_eq!(cmd.program, "osascript");
        assert!(cmd.args[1].contains(r#"echo \"hi\""#));
    }
}
