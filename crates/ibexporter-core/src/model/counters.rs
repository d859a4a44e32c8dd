//! Per-port performance counters reported by `perfquery`.
//!
//! Every counter starts out as NaN ("unset"). A counter stays NaN unless the
//! query that produced the record printed it, so an absent field is never
//! confused with a reported zero. Consumers must skip NaN values.

use std::sync::Arc;

use serde::Serialize;

use crate::model::Device;

/// Counters of one (device, port selector) pair.
#[derive(Debug, Clone, Serialize)]
pub struct PortCounters {
    #[serde(rename = "guid", serialize_with = "crate::model::serialize_guid")]
    pub device: Arc<Device>,
    pub port_select: String,

    // -x (extended counters)
    pub port_xmit_data: f64,
    pub port_rcv_data: f64,
    pub port_xmit_pkts: f64,
    pub port_rcv_pkts: f64,
    pub port_unicast_xmit_pkts: f64,
    pub port_unicast_rcv_pkts: f64,
    pub port_multicast_xmit_pkts: f64,
    pub port_multicast_rcv_pkts: f64,
    pub symbol_error_counter: f64,
    pub link_error_recovery_counter: f64,
    pub link_downed_counter: f64,
    pub port_rcv_errors: f64,
    pub port_rcv_remote_physical_errors: f64,
    pub port_rcv_switch_relay_errors: f64,
    pub port_xmit_discards: f64,
    pub port_xmit_constraint_errors: f64,
    pub port_rcv_constraint_errors: f64,
    pub local_link_integrity_errors: f64,
    pub excessive_buffer_overrun_errors: f64,
    pub vl15_dropped: f64,
    pub port_xmit_wait: f64,
    pub qp1_dropped: f64,

    // -E (PortRcvErrorDetails)
    pub port_local_physical_errors: f64,
    pub port_malformed_pkt_errors: f64,
    pub port_buffer_overrun_errors: f64,
    pub port_dlid_mapping_errors: f64,
    pub port_vl_mapping_errors: f64,
    pub port_looping_errors: f64,
}

impl PortCounters {
    /// Creates a record with every counter unset.
    pub fn unset(device: Arc<Device>, port_select: impl Into<String>) -> Self {
        Self {
            device,
            port_select: port_select.into(),
            port_xmit_data: f64::NAN,
            port_rcv_data: f64::NAN,
            port_xmit_pkts: f64::NAN,
            port_rcv_pkts: f64::NAN,
            port_unicast_xmit_pkts: f64::NAN,
            port_unicast_rcv_pkts: f64::NAN,
            port_multicast_xmit_pkts: f64::NAN,
            port_multicast_rcv_pkts: f64::NAN,
            symbol_error_counter: f64::NAN,
            link_error_recovery_counter: f64::NAN,
            link_downed_counter: f64::NAN,
            port_rcv_errors: f64::NAN,
            port_rcv_remote_physical_errors: f64::NAN,
            port_rcv_switch_relay_errors: f64::NAN,
            port_xmit_discards: f64::NAN,
            port_xmit_constraint_errors: f64::NAN,
            port_rcv_constraint_errors: f64::NAN,
            local_link_integrity_errors: f64::NAN,
            excessive_buffer_overrun_errors: f64::NAN,
            vl15_dropped: f64::NAN,
            port_xmit_wait: f64::NAN,
            qp1_dropped: f64::NAN,
            port_local_physical_errors: f64::NAN,
            port_malformed_pkt_errors: f64::NAN,
            port_buffer_overrun_errors: f64::NAN,
            port_dlid_mapping_errors: f64::NAN,
            port_vl_mapping_errors: f64::NAN,
            port_looping_errors: f64::NAN,
        }
    }

    /// Current value of a counter (NaN when unset).
    pub fn get(&self, field: CounterField) -> f64 {
        match field {
            CounterField::PortXmitData => self.port_xmit_data,
            CounterField::PortRcvData => self.port_rcv_data,
            CounterField::PortXmitPkts => self.port_xmit_pkts,
            CounterField::PortRcvPkts => self.port_rcv_pkts,
            CounterField::PortUnicastXmitPkts => self.port_unicast_xmit_pkts,
            CounterField::PortUnicastRcvPkts => self.port_unicast_rcv_pkts,
            CounterField::PortMulticastXmitPkts => self.port_multicast_xmit_pkts,
            CounterField::PortMulticastRcvPkts => self.port_multicast_rcv_pkts,
            CounterField::SymbolErrorCounter => self.symbol_error_counter,
            CounterField::LinkErrorRecoveryCounter => self.link_error_recovery_counter,
            CounterField::LinkDownedCounter => self.link_downed_counter,
            CounterField::PortRcvErrors => self.port_rcv_errors,
            CounterField::PortRcvRemotePhysicalErrors => self.port_rcv_remote_physical_errors,
            CounterField::PortRcvSwitchRelayErrors => self.port_rcv_switch_relay_errors,
            CounterField::PortXmitDiscards => self.port_xmit_discards,
            CounterField::PortXmitConstraintErrors => self.port_xmit_constraint_errors,
            CounterField::PortRcvConstraintErrors => self.port_rcv_constraint_errors,
            CounterField::LocalLinkIntegrityErrors => self.local_link_integrity_errors,
            CounterField::ExcessiveBufferOverrunErrors => self.excessive_buffer_overrun_errors,
            CounterField::Vl15Dropped => self.vl15_dropped,
            CounterField::PortXmitWait => self.port_xmit_wait,
            CounterField::Qp1Dropped => self.qp1_dropped,
            CounterField::PortLocalPhysicalErrors => self.port_local_physical_errors,
            CounterField::PortMalformedPktErrors => self.port_malformed_pkt_errors,
            CounterField::PortBufferOverrunErrors => self.port_buffer_overrun_errors,
            CounterField::PortDlidMappingErrors => self.port_dlid_mapping_errors,
            CounterField::PortVlMappingErrors => self.port_vl_mapping_errors,
            CounterField::PortLoopingErrors => self.port_looping_errors,
        }
    }

    /// Mutable slot of a counter, used by the parser to store a value.
    pub fn slot(&mut self, field: CounterField) -> &mut f64 {
        match field {
            CounterField::PortXmitData => &mut self.port_xmit_data,
            CounterField::PortRcvData => &mut self.port_rcv_data,
            CounterField::PortXmitPkts => &mut self.port_xmit_pkts,
            CounterField::PortRcvPkts => &mut self.port_rcv_pkts,
            CounterField::PortUnicastXmitPkts => &mut self.port_unicast_xmit_pkts,
            CounterField::PortUnicastRcvPkts => &mut self.port_unicast_rcv_pkts,
            CounterField::PortMulticastXmitPkts => &mut self.port_multicast_xmit_pkts,
            CounterField::PortMulticastRcvPkts => &mut self.port_multicast_rcv_pkts,
            CounterField::SymbolErrorCounter => &mut self.symbol_error_counter,
            CounterField::LinkErrorRecoveryCounter => &mut self.link_error_recovery_counter,
            CounterField::LinkDownedCounter => &mut self.link_downed_counter,
            CounterField::PortRcvErrors => &mut self.port_rcv_errors,
            CounterField::PortRcvRemotePhysicalErrors => &mut self.port_rcv_remote_physical_errors,
            CounterField::PortRcvSwitchRelayErrors => &mut self.port_rcv_switch_relay_errors,
            CounterField::PortXmitDiscards => &mut self.port_xmit_discards,
            CounterField::PortXmitConstraintErrors => &mut self.port_xmit_constraint_errors,
            CounterField::PortRcvConstraintErrors => &mut self.port_rcv_constraint_errors,
            CounterField::LocalLinkIntegrityErrors => &mut self.local_link_integrity_errors,
            CounterField::ExcessiveBufferOverrunErrors => &mut self.excessive_buffer_overrun_errors,
            CounterField::Vl15Dropped => &mut self.vl15_dropped,
            CounterField::PortXmitWait => &mut self.port_xmit_wait,
            CounterField::Qp1Dropped => &mut self.qp1_dropped,
            CounterField::PortLocalPhysicalErrors => &mut self.port_local_physical_errors,
            CounterField::PortMalformedPktErrors => &mut self.port_malformed_pkt_errors,
            CounterField::PortBufferOverrunErrors => &mut self.port_buffer_overrun_errors,
            CounterField::PortDlidMappingErrors => &mut self.port_dlid_mapping_errors,
            CounterField::PortVlMappingErrors => &mut self.port_vl_mapping_errors,
            CounterField::PortLoopingErrors => &mut self.port_looping_errors,
        }
    }

    /// Counters this record actually carries, skipping unset ones.
    pub fn reported(&self) -> impl Iterator<Item = (CounterField, f64)> + '_ {
        CounterField::ALL
            .iter()
            .map(|&field| (field, self.get(field)))
            .filter(|(_, value)| !value.is_nan())
    }
}

/// Counter names as printed by `perfquery`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CounterField {
    PortXmitData,
    PortRcvData,
    PortXmitPkts,
    PortRcvPkts,
    PortUnicastXmitPkts,
    PortUnicastRcvPkts,
    PortMulticastXmitPkts,
    PortMulticastRcvPkts,
    SymbolErrorCounter,
    LinkErrorRecoveryCounter,
    LinkDownedCounter,
    PortRcvErrors,
    PortRcvRemotePhysicalErrors,
    PortRcvSwitchRelayErrors,
    PortXmitDiscards,
    PortXmitConstraintErrors,
    PortRcvConstraintErrors,
    LocalLinkIntegrityErrors,
    ExcessiveBufferOverrunErrors,
    Vl15Dropped,
    PortXmitWait,
    Qp1Dropped,
    PortLocalPhysicalErrors,
    PortMalformedPktErrors,
    PortBufferOverrunErrors,
    PortDlidMappingErrors,
    PortVlMappingErrors,
    PortLoopingErrors,
}

impl CounterField {
    pub const ALL: [CounterField; 28] = [
        CounterField::PortXmitData,
        CounterField::PortRcvData,
        CounterField::PortXmitPkts,
        CounterField::PortRcvPkts,
        CounterField::PortUnicastXmitPkts,
        CounterField::PortUnicastRcvPkts,
        CounterField::PortMulticastXmitPkts,
        CounterField::PortMulticastRcvPkts,
        CounterField::SymbolErrorCounter,
        CounterField::LinkErrorRecoveryCounter,
        CounterField::LinkDownedCounter,
        CounterField::PortRcvErrors,
        CounterField::PortRcvRemotePhysicalErrors,
        CounterField::PortRcvSwitchRelayErrors,
        CounterField::PortXmitDiscards,
        CounterField::PortXmitConstraintErrors,
        CounterField::PortRcvConstraintErrors,
        CounterField::LocalLinkIntegrityErrors,
        CounterField::ExcessiveBufferOverrunErrors,
        CounterField::Vl15Dropped,
        CounterField::PortXmitWait,
        CounterField::Qp1Dropped,
        CounterField::PortLocalPhysicalErrors,
        CounterField::PortMalformedPktErrors,
        CounterField::PortBufferOverrunErrors,
        CounterField::PortDlidMappingErrors,
        CounterField::PortVlMappingErrors,
        CounterField::PortLoopingErrors,
    ];

    /// Field name in `perfquery` output (`PortXmitData:.....123`).
    pub fn name(self) -> &'static str {
        match self {
            CounterField::PortXmitData => "PortXmitData",
            CounterField::PortRcvData => "PortRcvData",
            CounterField::PortXmitPkts => "PortXmitPkts",
            CounterField::PortRcvPkts => "PortRcvPkts",
            CounterField::PortUnicastXmitPkts => "PortUnicastXmitPkts",
            CounterField::PortUnicastRcvPkts => "PortUnicastRcvPkts",
            CounterField::PortMulticastXmitPkts => "PortMulticastXmitPkts",
            CounterField::PortMulticastRcvPkts => "PortMulticastRcvPkts",
            CounterField::SymbolErrorCounter => "SymbolErrorCounter",
            CounterField::LinkErrorRecoveryCounter => "LinkErrorRecoveryCounter",
            CounterField::LinkDownedCounter => "LinkDownedCounter",
            CounterField::PortRcvErrors => "PortRcvErrors",
            CounterField::PortRcvRemotePhysicalErrors => "PortRcvRemotePhysicalErrors",
            CounterField::PortRcvSwitchRelayErrors => "PortRcvSwitchRelayErrors",
            CounterField::PortXmitDiscards => "PortXmitDiscards",
            CounterField::PortXmitConstraintErrors => "PortXmitConstraintErrors",
            CounterField::PortRcvConstraintErrors => "PortRcvConstraintErrors",
            CounterField::LocalLinkIntegrityErrors => "LocalLinkIntegrityErrors",
            CounterField::ExcessiveBufferOverrunErrors => "ExcessiveBufferOverrunErrors",
            CounterField::Vl15Dropped => "VL15Dropped",
            CounterField::PortXmitWait => "PortXmitWait",
            CounterField::Qp1Dropped => "QP1Dropped",
            CounterField::PortLocalPhysicalErrors => "PortLocalPhysicalErrors",
            CounterField::PortMalformedPktErrors => "PortMalformedPktErrors",
            CounterField::PortBufferOverrunErrors => "PortBufferOverrunErrors",
            CounterField::PortDlidMappingErrors => "PortDLIDMappingErrors",
            CounterField::PortVlMappingErrors => "PortVLMappingErrors",
            CounterField::PortLoopingErrors => "PortLoopingErrors",
        }
    }

    /// True for the fields only reported by the `-E` (rcv error details) query.
    pub fn is_rcv_error_detail(self) -> bool {
        matches!(
            self,
            CounterField::PortLocalPhysicalErrors
                | CounterField::PortMalformedPktErrors
                | CounterField::PortBufferOverrunErrors
                | CounterField::PortDlidMappingErrors
                | CounterField::PortVlMappingErrors
                | CounterField::PortLoopingErrors
        )
    }
}
