//! Data model shared by the parsers, collectors and the daemon.

use std::sync::Arc;

use serde::Serializer;

mod counters;
mod device;
mod health;

pub use counters::{CounterField, PortCounters};
pub use device::{Device, NodeKind, Topology, Uplink};
pub use health::{Fan, PowerSupply, SwitchHealth, SwitchInfo};

/// Serializes a shared device reference as its GUID.
pub(crate) fn serialize_guid<S: Serializer>(device: &Arc<Device>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&device.guid)
}
