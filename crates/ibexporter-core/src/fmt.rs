//! Formatting helpers for log lines and summaries.
//!
//! Functions that differ between compact log fields and verbose summaries
//! are parameterized via [`FmtStyle`].

use std::time::Duration;

/// Controls compact (log fields) vs verbose (summary) output.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum FmtStyle {
    /// Compact: no spaces, short suffixes ("100G/s", "3m5s")
    Compact,
    /// Detail: spaces, full suffixes ("100 Gbit/s", "3m 5s")
    Detail,
}

/// Format a link rate given in bytes per second as a bit rate (SI units).
///
/// Compact: `"100G/s"`, `"56M/s"`
/// Detail:  `"100 Gbit/s"`, `"56 Mbit/s"`
pub fn format_link_rate(bytes_per_sec: f64, style: FmtStyle) -> String {
    if !bytes_per_sec.is_finite() || bytes_per_sec < 1.0 {
        return "0".to_string();
    }
    let (g, m, k, b) = match style {
        FmtStyle::Compact => ("G/s", "M/s", "K/s", "b/s"),
        FmtStyle::Detail => (" Gbit/s", " Mbit/s", " Kbit/s", " bit/s"),
    };
    let bits = bytes_per_sec * 8.0;
    let (value, suffix) = if bits >= 1e9 {
        (bits / 1e9, g)
    } else if bits >= 1e6 {
        (bits / 1e6, m)
    } else if bits >= 1e3 {
        (bits / 1e3, k)
    } else {
        (bits, b)
    };
    if value.fract() == 0.0 {
        format!("{:.0}{}", value, suffix)
    } else {
        format!("{:.2}{}", value, suffix)
    }
}

/// Format a switch uptime given in seconds, keeping the two largest units.
///
/// Compact: `"160d10h"`, `"3m5s"` (`"-"` when unknown)
/// Detail:  `"160d 10h"`, `"3m 5s"` (`"0s"` when unknown)
pub fn format_uptime(secs: f64, style: FmtStyle) -> String {
    if !secs.is_finite() || secs < 0.0 {
        return match style {
            FmtStyle::Compact => "-".to_string(),
            FmtStyle::Detail => "0s".to_string(),
        };
    }
    let secs = secs as u64;
    let (major, major_unit, minor, minor_unit) = match secs {
        0..60 => return format!("{}s", secs),
        60..3600 => (secs / 60, "m", secs % 60, "s"),
        3600..86400 => (secs / 3600, "h", (secs % 3600) / 60, "m"),
        _ => (secs / 86400, "d", (secs % 86400) / 3600, "h"),
    };
    let sep = match style {
        FmtStyle::Compact => "",
        FmtStyle::Detail => " ",
    };
    format!("{}{}{}{}{}", major, major_unit, sep, minor, minor_unit)
}

/// Format a short elapsed time: `"350ms"`, `"1.25s"`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let ms = elapsed.as_secs_f64() * 1000.0;
    if ms < 1000.0 {
        format!("{:.0}ms", ms)
    } else {
        format!("{:.2}s", ms / 1000.0)
    }
}
