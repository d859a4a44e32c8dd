//! Parser for `ibswinfo -d lid-<LID>` output.
//!
//! The output is a sequence of `key | value` lines split into sections by
//! dashed divider lines:
//!
//! ```text
//! part number        | MSB7790-ES2F        identity
//! -------------------------------------    1
//! uptime (d-h:m:s)   | 160d-10:38:53
//! -------------------------------------    2
//! PSU0 status        | OK                  power supplies
//!      fan status    | OK                  <- this PSU's fan
//! -------------------------------------    3
//! temperature (C)    | 45
//! -------------------------------------    4
//! fan status         | ERROR               <- chassis fan tray
//! fan#1 (rpm)        | 8493
//! ```
//!
//! The two `fan status` keys are told apart only by how many dividers came
//! before them, so lines must be processed strictly in order.

use std::collections::BTreeMap;
use std::num::ParseFloatError;
use std::sync::LazyLock;

use chrono::{NaiveTime, Timelike};
use regex::Regex;
use tracing::error;

use crate::model::{Fan, PowerSupply, SwitchInfo};

static PSU_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"PSU([0-9]) status").expect("PSU pattern is valid"));
static FAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"fan#([0-9]+)").expect("fan pattern is valid"));

const DIVIDER: &str = "-----";
/// Dividers seen before the chassis fan section starts.
const CHASSIS_SECTION: usize = 4;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Fatal error parsing switch info output.
#[derive(Debug, Clone, PartialEq)]
pub enum SwitchInfoError {
    Power { value: String, source: ParseFloatError },
    Temperature { value: String, source: ParseFloatError },
    FanRpm { fan: String, value: String, source: ParseFloatError },
}

impl std::fmt::Display for SwitchInfoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SwitchInfoError::Power { value, source } => {
                write!(f, "unable to parse power (W) '{}': {}", value, source)
            }
            SwitchInfoError::Temperature { value, source } => {
                write!(f, "unable to parse temperature (C) '{}': {}", value, source)
            }
            SwitchInfoError::FanRpm { fan, value, source } => {
                write!(f, "unable to parse fan#{} RPM '{}': {}", fan, value, source)
            }
        }
    }
}

impl std::error::Error for SwitchInfoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SwitchInfoError::Power { source, .. }
            | SwitchInfoError::Temperature { source, .. }
            | SwitchInfoError::FanRpm { source, .. } => Some(source),
        }
    }
}

/// Parses an uptime of the form `<N>d-HH:MM:SS` or `HH:MM:SS` into seconds.
fn parse_uptime(value: &str) -> Option<f64> {
    let parts: Vec<&str> = value.split('-').collect();
    let (days, clock) = if parts.len() == 2 {
        let days = parts[0].replacen('d', "", 1);
        match days.trim().parse::<f64>() {
            Ok(days) => (days, parts[1]),
            Err(e) => {
                error!(value, error = %e, "unable to parse uptime duration");
                return None;
            }
        }
    } else {
        (0.0, value)
    };
    match NaiveTime::parse_from_str(clock.trim(), "%H:%M:%S") {
        Ok(t) => Some(days * SECONDS_PER_DAY + f64::from(t.num_seconds_from_midnight())),
        Err(e) => {
            error!(value, error = %e, "unable to parse uptime duration");
            None
        }
    }
}

/// Parses one `ibswinfo` invocation.
///
/// A malformed uptime is logged and counted in `field_errors`. An unparseable
/// power, temperature or non-empty fan reading fails the whole parse; an
/// empty fan reading means an absent fan and is kept as NaN.
pub fn parse_switch_info(output: &str) -> Result<SwitchInfo, SwitchInfoError> {
    let mut info = SwitchInfo::default();
    let mut psus: BTreeMap<String, PowerSupply> = BTreeMap::new();
    let mut psu_id: Option<String> = None;
    let mut dividers = 0usize;

    for line in output.lines() {
        if line.starts_with(DIVIDER) {
            dividers += 1;
        }
        let mut parts = line.split('|');
        let (Some(key), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        let in_psu_section = dividers < CHASSIS_SECTION;

        match key {
            "part number" => info.part_number = value.to_string(),
            "serial number" => info.serial_number = value.to_string(),
            "PSID" => info.psid = value.to_string(),
            "firmware version" => info.firmware_version = value.to_string(),
            _ => {}
        }

        if key.starts_with("uptime") {
            match parse_uptime(value) {
                Some(uptime) => info.uptime = uptime,
                None => info.field_errors += 1,
            }
            continue;
        }

        // Every line works on a fresh PSU record unless it continues the active one.
        let mut psu = PowerSupply::unset();
        if let Some(caps) = PSU_RE.captures(key)
            && let Some(id) = caps.get(1)
        {
            psu_id = Some(id.as_str().to_string());
            psu.status = value.to_string();
        }
        if psu.status.is_empty()
            && in_psu_section
            && let Some(existing) = psu_id.as_ref().and_then(|id| psus.get(id))
        {
            psu = existing.clone();
        }
        if key == "DC power" {
            psu.dc_power = value.to_string();
        }
        if key == "fan status" && in_psu_section {
            psu.fan_status = value.to_string();
        }
        if key == "power (W)" {
            psu.power_w = value.parse::<f64>().map_err(|source| {
                error!(value, error = %source, "unable to parse power (W)");
                SwitchInfoError::Power {
                    value: value.to_string(),
                    source,
                }
            })?;
        }
        if in_psu_section && let Some(id) = &psu_id {
            psus.insert(id.clone(), psu);
        }

        if key == "temperature (C)" {
            info.temperature = value.parse::<f64>().map_err(|source| {
                error!(value, error = %source, "unable to parse temperature (C)");
                SwitchInfoError::Temperature {
                    value: value.to_string(),
                    source,
                }
            })?;
        }
        if key == "fan status" && !in_psu_section {
            info.fan_status = value.to_string();
        }

        if let Some(caps) = FAN_RE.captures(key)
            && let Some(id) = caps.get(1)
        {
            let id = id.as_str().to_string();
            let rpm = if value.is_empty() {
                f64::NAN
            } else {
                value.parse::<f64>().map_err(|source| {
                    error!(fan = %id, value, error = %source, "unable to parse fan RPM");
                    SwitchInfoError::FanRpm {
                        fan: id.clone(),
                        value: value.to_string(),
                        source,
                    }
                })?
            };
            info.fans.push(Fan { id, rpm });
        }
    }

    info.power_supplies = psus
        .into_iter()
        .map(|(id, mut psu)| {
            psu.id = id;
            psu
        })
        .collect();
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::scenarios::{
        IBSWINFO_BAD_FAN, IBSWINFO_BAD_POWER, IBSWINFO_BAD_TEMPERATURE, IBSWINFO_PSU_FAILED,
        IBSWINFO_QM8790, IBSWINFO_SB7790,
    };

    fn rpms(info: &SwitchInfo) -> Vec<f64> {
        info.fans.iter().map(|f| f.rpm).collect()
    }

    #[test]
    fn test_parse_sb7790() {
        let info = parse_switch_info(IBSWINFO_SB7790).unwrap();
        assert_eq!(info.part_number, "MSB7790-ES2F");
        assert_eq!(info.serial_number, "MT1943X00498");
        assert_eq!(info.psid, "MT_1880110032");
        assert_eq!(info.firmware_version, "11.2008.2102");
        assert_eq!(info.uptime, 13862333.0);
        assert_eq!(info.field_errors, 0);

        assert_eq!(info.power_supplies.len(), 2);
        assert_eq!(
            info.power_supplies[0],
            PowerSupply {
                id: "0".into(),
                status: "OK".into(),
                dc_power: "OK".into(),
                fan_status: "OK".into(),
                power_w: 72.0,
            }
        );
        assert_eq!(info.power_supplies[1].id, "1");
        assert_eq!(info.power_supplies[1].power_w, 71.0);

        assert_eq!(info.temperature, 45.0);
        assert_eq!(info.fan_status, "ERROR");
        assert_eq!(
            rpms(&info),
            vec![8493.0, 7349.0, 8441.0, 7270.0, 8337.0, 7156.0, 8441.0, 7232.0]
        );
        assert_eq!(info.fans[0].id, "1");
        assert_eq!(info.fans[7].id, "8");
    }

    #[test]
    fn test_parse_qm8790() {
        let info = parse_switch_info(IBSWINFO_QM8790).unwrap();
        assert_eq!(info.part_number, "MQM8790-HS2F");
        assert_eq!(info.serial_number, "MT2152T10239");
        assert_eq!(info.psid, "MT_0000000063");
        assert_eq!(info.firmware_version, "27.2010.3118");
        assert_eq!(info.uptime, 8301347.0);
        let watts: Vec<f64> = info.power_supplies.iter().map(|p| p.power_w).collect();
        assert_eq!(watts, vec![154.0, 134.0]);
        assert_eq!(info.temperature, 53.0);
        assert_eq!(info.fan_status, "OK");
        assert_eq!(
            rpms(&info),
            vec![6125.0, 5251.0, 6013.0, 5335.0, 6068.0, 5423.0, 5854.0, 5467.0, 5906.0]
        );
    }

    #[test]
    fn test_fan_status_attribution_by_divider() {
        let info = parse_switch_info(IBSWINFO_PSU_FAILED).unwrap();
        assert_eq!(info.power_supplies[0].fan_status, "OK");
        assert_eq!(info.power_supplies[0].power_w, 72.0);

        let failed = &info.power_supplies[1];
        assert_eq!(failed.status, "ERROR");
        assert_eq!(failed.dc_power, "ERROR");
        assert_eq!(failed.fan_status, "ERROR");
        assert!(failed.power_w.is_nan());

        // Chassis fan status after the fourth divider does not touch the PSUs.
        assert_eq!(info.fan_status, "OK");
    }

    #[test]
    fn test_empty_fan_reading_is_unset() {
        let info = parse_switch_info(IBSWINFO_PSU_FAILED).unwrap();
        assert_eq!(info.fans.len(), 2);
        assert_eq!(info.fans[0].rpm, 8493.0);
        assert_eq!(info.fans[1].id, "2");
        assert!(info.fans[1].rpm.is_nan());
    }

    #[test]
    fn test_fatal_numeric_fields() {
        assert!(matches!(
            parse_switch_info(IBSWINFO_BAD_POWER),
            Err(SwitchInfoError::Power { value, .. }) if value == "N/A"
        ));
        assert!(matches!(
            parse_switch_info(IBSWINFO_BAD_TEMPERATURE),
            Err(SwitchInfoError::Temperature { value, .. }) if value == "hot"
        ));
        let err = parse_switch_info(IBSWINFO_BAD_FAN).unwrap_err();
        assert!(matches!(&err, SwitchInfoError::FanRpm { fan, .. } if fan == "1"));
        assert!(err.to_string().contains("fast"));
    }

    #[test]
    fn test_uptime_forms() {
        assert_eq!(parse_uptime("160d-10:38:53"), Some(13862333.0));
        assert_eq!(parse_uptime("01:00:05"), Some(3605.0));
        assert_eq!(parse_uptime("0d-00:00:00"), Some(0.0));
        assert_eq!(parse_uptime("xd-10:38:53"), None);
        assert_eq!(parse_uptime("10h"), None);
    }

    #[test]
    fn test_malformed_uptime_is_not_fatal() {
        let out = "\
part number        | MSB7790-ES2F
-------------------------------------------------
uptime (d-h:m:s)   | soon
-------------------------------------------------
";
        let info = parse_switch_info(out).unwrap();
        assert_eq!(info.part_number, "MSB7790-ES2F");
        assert_eq!(info.uptime, 0.0);
        assert_eq!(info.field_errors, 1);
        assert!(info.temperature.is_nan());
        assert!(info.power_supplies.is_empty());
    }
}
