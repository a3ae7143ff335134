//! Typed decode of the power subsystem's untyped key/value description.
//!
//! Two payload dialects are understood: the macOS `AppleSmartBattery`
//! registry entry (`CurrentCapacity`, `MaxCapacity`, `Temperature`, ...) and
//! the Linux `power_supply` uevent (`POWER_SUPPLY_CAPACITY`, ...). Anything
//! missing or malformed decodes to the `Unknown` sentinel, never to 0%.

use std::collections::BTreeMap;

use serde::Serialize;

/// Raw power-source description as read from the OS.
pub type RawPowerInfo = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BatteryHealth {
    Good,
    Fair,
    Poor,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ThermalClass {
    Nominal,
    Warm,
    Hot,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thermal {
    pub class: ThermalClass,
    pub celsius: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BatteryReading {
    /// Charge in `[0, 100]`.
    pub percent: f64,
    pub health: BatteryHealth,
    pub thermal: Thermal,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub enum BatteryState {
    /// Not sampled yet, or the payload could not be decoded.
    #[default]
    Unknown,
    /// The machine has no battery.
    NotApplicable,
    Present(BatteryReading),
}

const WARM_CELSIUS: f64 = 35.0;
const HOT_CELSIUS: f64 = 45.0;

/// Decode a power-source payload. `None` means the OS reported no battery.
pub fn decode(raw: Option<&RawPowerInfo>) -> BatteryState {
    let Some(raw) = raw else {
        return BatteryState::NotApplicable;
    };
    if raw.contains_key("POWER_SUPPLY_CAPACITY") || raw.contains_key("POWER_SUPPLY_PRESENT") {
        decode_uevent(raw)
    } else {
        decode_smart_battery(raw)
    }
}

fn decode_smart_battery(raw: &RawPowerInfo) -> BatteryState {
    if raw.get("BatteryInstalled").map(String::as_str) == Some("No") {
        return BatteryState::NotApplicable;
    }
    let (Some(current), Some(max)) = (number(raw, "CurrentCapacity"), number(raw, "MaxCapacity"))
    else {
        return BatteryState::Unknown;
    };
    if max <= 0.0 {
        return BatteryState::Unknown;
    }

    // Apple silicon reports MaxCapacity as a percentage; the raw mAh figure
    // lives in AppleRawMaxCapacity.
    let full = number(raw, "AppleRawMaxCapacity").unwrap_or(max);
    let health = health_from_ratio(full, number(raw, "DesignCapacity"));
    let celsius = number(raw, "Temperature").map(|centi| centi / 100.0);

    BatteryState::Present(BatteryReading {
        percent: (current / max * 100.0).clamp(0.0, 100.0),
        health,
        thermal: thermal(celsius),
    })
}

fn decode_uevent(raw: &RawPowerInfo) -> BatteryState {
    if raw.get("POWER_SUPPLY_PRESENT").map(String::as_str) == Some("0") {
        return BatteryState::NotApplicable;
    }
    let Some(percent) = number(raw, "POWER_SUPPLY_CAPACITY") else {
        return BatteryState::Unknown;
    };

    let full = number(raw, "POWER_SUPPLY_ENERGY_FULL").or_else(|| number(raw, "POWER_SUPPLY_CHARGE_FULL"));
    let design = number(raw, "POWER_SUPPLY_ENERGY_FULL_DESIGN")
        .or_else(|| number(raw, "POWER_SUPPLY_CHARGE_FULL_DESIGN"));
    let health = match (raw.get("POWER_SUPPLY_HEALTH").map(String::as_str), full) {
        (Some("Dead" | "Over voltage" | "Unspecified failure"), _) => BatteryHealth::Poor,
        (Some("Overheat" | "Cold" | "Cool" | "Warm"), _) => BatteryHealth::Fair,
        (_, Some(full)) => health_from_ratio(full, design),
        (Some("Good"), None) => BatteryHealth::Good,
        _ => BatteryHealth::Unknown,
    };
    let celsius = number(raw, "POWER_SUPPLY_TEMP").map(|deci| deci / 10.0);

    BatteryState::Present(BatteryReading {
        percent: percent.clamp(0.0, 100.0),
        health,
        thermal: thermal(celsius),
    })
}

fn health_from_ratio(full: f64, design: Option<f64>) -> BatteryHealth {
    match design {
        Some(design) if design > 0.0 => {
            let ratio = full / design;
            if ratio >= 0.8 {
                BatteryHealth::Good
            } else if ratio >= 0.6 {
                BatteryHealth::Fair
            } else {
                BatteryHealth::Poor
            }
        }
        _ => BatteryHealth::Unknown,
    }
}

fn thermal(celsius: Option<f64>) -> Thermal {
    let class = match celsius {
        Some(c) if c >= HOT_CELSIUS => ThermalClass::Hot,
        Some(c) if c >= WARM_CELSIUS => ThermalClass::Warm,
        Some(_) => ThermalClass::Nominal,
        None => ThermalClass::Unknown,
    };
    Thermal { class, celsius }
}

fn number(raw: &RawPowerInfo, key: &str) -> Option<f64> {
    raw.get(key)?.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse `ioreg -rn AppleSmartBattery` output (`"Key" = Value` lines).
pub fn parse_ioreg(output: &str) -> Option<RawPowerInfo> {
    let map: RawPowerInfo = output
        .lines()
        .filter_map(|line| {
            let (key, value) = line.trim().split_once(" = ")?;
            let key = key.strip_prefix('"')?.strip_suffix('"')?;
            Some((key.to_string(), value.trim().trim_matches('"').to_string()))
        })
        .collect();
    (!map.is_empty()).then_some(map)
}

/// Parse a Linux `power_supply/*/uevent` file (`KEY=VALUE` lines).
pub fn parse_uevent(contents: &str) -> RawPowerInfo {
    contents
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}
