//! Link speed table.
//!
//! `ibnetdiscover` reports every link as a width token (`4x`, `12x`) and a
//! rate label naming the InfiniBand generation (`EDR`, `HDR`, ...). The
//! per-lane signalling rate and the effective data rate (after line encoding)
//! are looked up here and scaled by the lane count.

/// Bytes per second for one Gbit/s: 10^9 / 8.
pub const BYTES_PER_GBIT: f64 = 125_000_000.0;

/// Per-lane rates of one InfiniBand generation, in Gbit/s.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaneRate {
    /// Signalling rate on the wire.
    pub raw_gbps: f64,
    /// Usable data rate after encoding overhead.
    pub effective_gbps: f64,
}

/// Total rate of a link, in bytes per second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkRate {
    pub raw_bytes_per_sec: f64,
    pub effective_bytes_per_sec: f64,
}

/// Rate label -> (raw, effective) lane rate in Gbit/s.
const LANE_RATES: &[(&str, LaneRate)] = &[
    ("SDR", LaneRate { raw_gbps: 2.5, effective_gbps: 2.0 }),
    ("DDR", LaneRate { raw_gbps: 5.0, effective_gbps: 4.0 }),
    ("QDR", LaneRate { raw_gbps: 10.0, effective_gbps: 8.0 }),
    ("FDR10", LaneRate { raw_gbps: 10.3125, effective_gbps: 10.0 }),
    ("FDR", LaneRate { raw_gbps: 14.0625, effective_gbps: 14.0 }),
    ("EDR", LaneRate { raw_gbps: 25.78125, effective_gbps: 25.0 }),
    ("HDR", LaneRate { raw_gbps: 53.125, effective_gbps: 50.0 }),
    ("NDR", LaneRate { raw_gbps: 106.25, effective_gbps: 100.0 }),
    ("XDR", LaneRate { raw_gbps: 212.5, effective_gbps: 250.0 }),
];

/// Error computing a link rate.
#[derive(Debug, Clone, PartialEq)]
pub enum RateError {
    /// The width token contains no lane count.
    UnknownWidth(String),
    /// The rate label is not in the table.
    UnknownRate(String),
}

impl std::fmt::Display for RateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateError::UnknownWidth(width) => write!(f, "unable to find lane count in width {}", width),
            RateError::UnknownRate(rate) => write!(f, "unknown rate {}", rate),
        }
    }
}

impl std::error::Error for RateError {}

/// Looks up the per-lane rates for a rate label.
pub fn lane_rate(label: &str) -> Option<LaneRate> {
    LANE_RATES
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, rate)| *rate)
}

/// Extracts the lane count from a width token: the first run of digits.
///
/// `"4x"` -> 4, `"12x"` -> 12, `"??"` -> None.
fn lane_count(width: &str) -> Option<f64> {
    let start = width.find(|c: char| c.is_ascii_digit())?;
    let digits: String = width[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<u32>().ok().map(f64::from)
}

/// Computes raw and effective link rate in bytes per second.
///
/// `rate = lane_rate * lanes * 125_000_000`.
pub fn link_rate(width: &str, label: &str) -> Result<LinkRate, RateError> {
    let lanes = lane_count(width).ok_or_else(|| RateError::UnknownWidth(width.to_string()))?;
    let lane = lane_rate(label).ok_or_else(|| RateError::UnknownRate(label.to_string()))?;

    Ok(LinkRate {
        raw_bytes_per_sec: lane.raw_gbps * lanes * BYTES_PER_GBIT,
        effective_bytes_per_sec: lane.effective_gbps * lanes * BYTES_PER_GBIT,
    })
}
