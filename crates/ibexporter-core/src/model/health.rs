//! Switch hardware health as reported by `ibswinfo`.

use std::sync::Arc;

use serde::Serialize;

use crate::model::Device;

/// One power supply unit of a switch chassis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerSupply {
    pub id: String,
    pub status: String,
    pub dc_power: String,
    pub fan_status: String,
    /// NaN when the tool did not print a power reading.
    pub power_w: f64,
}

impl PowerSupply {
    pub(crate) fn unset() -> Self {
        Self {
            id: String::new(),
            status: String::new(),
            dc_power: String::new(),
            fan_status: String::new(),
            power_w: f64::NAN,
        }
    }
}

/// One chassis fan slot. `rpm` is NaN for an empty slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fan {
    pub id: String,
    pub rpm: f64,
}

/// Parsed output of one `ibswinfo` call, not yet bound to a device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwitchInfo {
    pub part_number: String,
    pub serial_number: String,
    pub psid: String,
    pub firmware_version: String,
    /// Seconds since boot. Zero when the uptime line is missing or malformed.
    pub uptime: f64,
    /// Sorted by PSU id.
    pub power_supplies: Vec<PowerSupply>,
    /// Chassis temperature in Celsius, NaN when not reported.
    pub temperature: f64,
    /// Chassis fan tray status.
    pub fan_status: String,
    /// In output order.
    pub fans: Vec<Fan>,
    /// Non-fatal field errors (malformed uptime).
    #[serde(skip)]
    pub field_errors: u64,
}

impl Default for SwitchInfo {
    fn default() -> Self {
        Self {
            part_number: String::new(),
            serial_number: String::new(),
            psid: String::new(),
            firmware_version: String::new(),
            uptime: 0.0,
            power_supplies: Vec::new(),
            temperature: f64::NAN,
            fan_status: String::new(),
            fans: Vec::new(),
            field_errors: 0,
        }
    }
}

/// Switch health record of one collection pass.
#[derive(Debug, Clone, Serialize)]
pub struct SwitchHealth {
    #[serde(rename = "guid", serialize_with = "crate::model::serialize_guid")]
    pub device: Arc<Device>,
    #[serde(flatten)]
    pub info: SwitchInfo,
    /// Wall-clock seconds spent in the `ibswinfo` call.
    pub duration: f64,
    /// Failed calls drop the record, so emitted records always carry `false`.
    pub error: bool,
    pub timeout: bool,
}
