//! Parser for `perfquery` output.
//!
//! Data lines look like `PortXmitData:....................36298026860928`.
//! A `PortSelect` line switches the port that following fields belong to, so
//! one invocation (`-l` loops over ports) can carry several port blocks.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use tracing::{debug, error};

use crate::model::{CounterField, Device, PortCounters};

const PORT_SELECT: &str = "PortSelect";

static FIELDS: LazyLock<HashMap<&'static str, CounterField>> = LazyLock::new(|| {
    CounterField::ALL
        .iter()
        .map(|field| (field.name(), *field))
        .collect()
});

/// Looks up a counter by its `perfquery` field name.
pub fn counter_field(name: &str) -> Option<CounterField> {
    FIELDS.get(name).copied()
}

/// Parses one `perfquery` invocation into per-port records.
///
/// Returns the records in first-seen port order and the number of values
/// that failed to parse. Unknown fields are skipped. A record only carries
/// the counters printed for its port; everything else stays NaN.
pub fn parse_counters(device: &Arc<Device>, output: &str) -> (Vec<PortCounters>, u64) {
    let mut records: Vec<PortCounters> = Vec::new();
    let mut by_port: HashMap<String, usize> = HashMap::new();
    let mut port = String::new();
    let mut errors = 0;

    for line in output.lines() {
        let mut parts = line.split(':');
        let (Some(name), Some(raw), None) = (parts.next(), parts.next(), parts.next()) else {
            debug!(line, "line has wrong number of elements, skipping");
            continue;
        };
        let value = raw.replace('.', "");
        let value = value.trim();

        let reading = if name == PORT_SELECT {
            port = value.to_string();
            None
        } else {
            let Some(field) = counter_field(name) else {
                debug!(field = name, "field not part of counters");
                continue;
            };
            match value.parse::<f64>() {
                Ok(v) => Some((field, v)),
                Err(e) => {
                    error!(guid = %device.guid, field = name, value, error = %e, "unable to parse counter value");
                    errors += 1;
                    continue;
                }
            }
        };

        let idx = *by_port.entry(port.clone()).or_insert_with(|| {
            records.push(PortCounters::unset(device.clone(), port.clone()));
            records.len() - 1
        });
        if let Some((field, v)) = reading {
            *records[idx].slot(field) = v;
        }
    }

    (records, errors)
}
