//! Parser for `ibnetdiscover --ports` output.
//!
//! One line per connected port:
//!
//! ```text
//! SW  1719 10 0x7cfe9003009ce5b0 4x EDR - CA   134  1 0x7cfe9003003b4bde ( 'ib-i1l1s01' - 'o0001 HCA-1' )
//! ^   ^    ^  ^                  ^  ^     ^    ^    ^  ^                   ^ local name     ^ remote name
//! |   |    |  local GUID         |  rate  |    |    |  remote GUID
//! |   |    local port            width    |    |    remote port
//! |   local LID                           |    remote LID
//! local type                              remote type
//! ```

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, error};

use crate::model::{Device, NodeKind, Topology, Uplink};
use crate::rates::{self, RateError};

static NAMES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\( '(.+)' - '(.+)' \)").expect("names pattern is valid"));

/// Placeholder rate of an unconnected port.
const UNCONNECTED: &str = "???";
/// Split-mode port lines carry this rate and exactly 7 fields.
const SPLIT_MODE_RATE: &str = "SDR";
const SPLIT_MODE_FIELDS: usize = 7;
/// Fields up to and including the remote GUID.
const LINK_FIELDS: usize = 11;

/// Fatal error parsing topology output.
#[derive(Debug, Clone, PartialEq)]
pub enum TopologyError {
    /// Width or rate of a link could not be resolved.
    Rate { guid: String, source: RateError },
    /// The `( 'name' - 'name' )` suffix is missing or malformed.
    Names { line: String },
}

impl std::fmt::Display for TopologyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TopologyError::Rate { guid, source } => {
                write!(f, "unable to parse speed of {}: {}", guid, source)
            }
            TopologyError::Names { line } => {
                write!(f, "unable to extract names from line: {}", line)
            }
        }
    }
}

impl std::error::Error for TopologyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TopologyError::Rate { source, .. } => Some(source),
            TopologyError::Names { .. } => None,
        }
    }
}

fn is_quoted_token(field: &str) -> bool {
    field.len() >= 2 && field.starts_with('\'') && field.ends_with('\'')
}

/// Splits a line into fields, re-joining a trailing quoted name that
/// whitespace splitting broke apart.
///
/// `[.., "'ib", "leaf", "1'"]` becomes `[.., "'ib leaf 1'"]`. Names with an
/// odd number of embedded quotes are not handled.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields: Vec<String> = line.split_whitespace().map(str::to_string).collect();
    let broken = fields
        .last()
        .is_some_and(|last| last.ends_with('\'') && !is_quoted_token(last));
    if broken && let Some(start) = fields.iter().rposition(|f| f.starts_with('\'')) {
        let merged = fields[start..].join(" ");
        fields.truncate(start);
        fields.push(merged);
    }
    fields
}

/// Keeps only the host name of adapter names like `o0001 HCA-1`.
fn short_name(name: &str) -> String {
    let name = name.trim();
    if name.contains(" HCA") {
        name.split(' ').next().unwrap_or(name).to_string()
    } else {
        name.to_string()
    }
}

/// Extracts the local and remote display names from the `( '..' - '..' )`
/// suffix of a line.
pub fn parse_names(line: &str) -> Result<(String, String), TopologyError> {
    let caps = NAMES_RE.captures(line).ok_or_else(|| TopologyError::Names {
        line: line.to_string(),
    })?;
    match (caps.get(1), caps.get(2)) {
        (Some(local), Some(remote)) => Ok((short_name(local.as_str()), short_name(remote.as_str()))),
        _ => Err(TopologyError::Names {
            line: line.to_string(),
        }),
    }
}

/// Parses full `ibnetdiscover --ports` output into switches and adapters.
///
/// Unconnected, split-mode and truncated lines are skipped. An unknown rate,
/// an unparseable width or a missing name suffix fails the whole parse.
pub fn parse_topology(output: &str) -> Result<Topology, TopologyError> {
    let mut devices: BTreeMap<String, Device> = BTreeMap::new();

    for line in output.lines() {
        let items = split_fields(line);
        if items.len() < 6 {
            debug!(line, "skipping line that is not connected");
            continue;
        }
        if items[5] == UNCONNECTED {
            debug!(line, "skipping line that is not connected");
            continue;
        }
        if items[5] == SPLIT_MODE_RATE && items.len() == SPLIT_MODE_FIELDS {
            debug!(line, "skipping split mode port");
            continue;
        }
        if items.len() < LINK_FIELDS {
            debug!(line, fields = items.len(), "skipping line with too few fields");
            continue;
        }

        let guid = &items[3];
        let rate = rates::link_rate(&items[4], &items[5]).map_err(|source| {
            error!(width = %items[4], rate = %items[5], guid = %guid, "unable to parse speed");
            TopologyError::Rate {
                guid: guid.clone(),
                source,
            }
        })?;
        let (name, uplink_name) = parse_names(line).inspect_err(|e| {
            error!(guid = %guid, error = %e, "unable to parse names");
        })?;

        let device = devices.entry(guid.clone()).or_insert_with(|| Device {
            kind: NodeKind::from_code(&items[0]),
            lid: String::new(),
            guid: guid.clone(),
            rate: 0.0,
            raw_rate: 0.0,
            name: String::new(),
            uplinks: BTreeMap::new(),
        });
        device.kind = NodeKind::from_code(&items[0]);
        device.lid = items[1].clone();
        device.rate = rate.effective_bytes_per_sec;
        device.raw_rate = rate.raw_bytes_per_sec;
        device.name = name;
        device.uplinks.insert(
            items[2].clone(),
            Uplink {
                kind: NodeKind::from_code(&items[7]),
                lid: items[8].clone(),
                port_number: items[9].clone(),
                guid: items[10].clone(),
                name: uplink_name,
            },
        );
    }

    // BTreeMap iteration is already ascending by GUID.
    let mut topology = Topology::default();
    for (_, device) in devices {
        match device.kind {
            NodeKind::Switch => topology.switches.push(device),
            NodeKind::Adapter => topology.adapters.push(device),
            _ => debug!(guid = %device.guid, kind = device.kind.code(), "ignoring device"),
        }
    }
    Ok(topology)
}
