//! Fabric devices and their uplinks as reported by `ibnetdiscover`.

use std::collections::BTreeMap;

use serde::Serialize;

/// Node type column of `ibnetdiscover --ports`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// `SW`
    Switch,
    /// `CA` (host channel adapter)
    Adapter,
    /// `RT`
    Router,
    /// Anything else, kept verbatim.
    Other(String),
}

impl NodeKind {
    pub fn from_code(code: &str) -> Self {
        match code {
            "SW" => NodeKind::Switch,
            "CA" => NodeKind::Adapter,
            "RT" => NodeKind::Router,
            other => NodeKind::Other(other.to_string()),
        }
    }

    /// Two-letter code used by the diagnostic tools.
    pub fn code(&self) -> &str {
        match self {
            NodeKind::Switch => "SW",
            NodeKind::Adapter => "CA",
            NodeKind::Router => "RT",
            NodeKind::Other(code) => code,
        }
    }
}

/// The neighbor attached to one local port of a [`Device`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Uplink {
    pub kind: NodeKind,
    pub lid: String,
    /// Port number on the remote side of the link.
    pub port_number: String,
    pub guid: String,
    pub name: String,
}

/// One fabric node: a switch or a channel adapter.
///
/// Identified by `guid`. Built fresh on every discovery and never mutated
/// once parsing completes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Device {
    pub kind: NodeKind,
    pub lid: String,
    pub guid: String,
    /// Effective (post-encoding) link rate in bytes per second.
    pub rate: f64,
    /// Raw signalling link rate in bytes per second.
    pub raw_rate: f64,
    pub name: String,
    /// Local port number -> neighbor on that port.
    pub uplinks: BTreeMap<String, Uplink>,
}

impl Device {
    /// Local port numbers with a connected neighbor, in numeric order.
    pub fn port_numbers(&self) -> Vec<&str> {
        let mut ports: Vec<&str> = self.uplinks.keys().map(String::as_str).collect();
        ports.sort_by_key(|p| (p.parse::<u32>().unwrap_or(u32::MAX), *p));
        ports
    }
}

/// Result of one topology discovery: switches and adapters, each sorted by GUID.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Topology {
    pub switches: Vec<Device>,
    pub adapters: Vec<Device>,
}

impl Topology {
    pub fn is_empty(&self) -> bool {
        self.switches.is_empty() && self.adapters.is_empty()
    }

    /// Finds a device of either kind by GUID.
    pub fn device(&self, guid: &str) -> Option<&Device> {
        self.switches
            .iter()
            .chain(self.adapters.iter())
            .find(|d| d.guid == guid)
    }

    /// Number of links seen from either side.
    pub fn link_count(&self) -> usize {
        self.switches
            .iter()
            .chain(self.adapters.iter())
            .map(|d| d.uplinks.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uplink(port: &str) -> Uplink {
        Uplink {
            kind: NodeKind::Adapter,
            lid: "1".into(),
            port_number: port.into(),
            guid: "0x1".into(),
            name: "n".into(),
        }
    }

    #[test]
    fn test_node_kind_codes() {
        assert_eq!(NodeKind::from_code("SW"), NodeKind::Switch);
        assert_eq!(NodeKind::from_code("CA"), NodeKind::Adapter);
        assert_eq!(NodeKind::from_code("XX"), NodeKind::Other("XX".into()));
        assert_eq!(NodeKind::from_code("XX").code(), "XX");
        assert_eq!(NodeKind::Switch.code(), "SW");
    }

    #[test]
    fn test_port_numbers_numeric_order() {
        let mut uplinks = BTreeMap::new();
        for port in ["10", "2", "1", "35"] {
            uplinks.insert(port.to_string(), uplink("1"));
        }
        let device = Device {
            kind: NodeKind::Switch,
            lid: "1719".into(),
            guid: "0xabc".into(),
            rate: 0.0,
            raw_rate: 0.0,
            name: "sw".into(),
            uplinks,
        };
        assert_eq!(device.port_numbers(), vec!["1", "2", "10", "35"]);
    }
}
