//! Collection cycle: discovery followed by the enabled collectors.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::collector::ibnetdiscover::discover;
use crate::collector::pool::{CollectOutcome, CollectorStats};
use crate::collector::ports::{PortCounterSettings, PortFamily, collect_port_counters};
use crate::collector::switch_health::{COLLECTOR_NAME as SWITCH_HEALTH, SwitchHealthSettings, collect_switch_health};
use crate::collector::traits::CommandRunner;
use crate::config::ExporterConfig;
use crate::model::{Device, PortCounters, SwitchHealth, Topology};

/// Everything gathered in one collection cycle.
#[derive(Debug, Clone, Serialize)]
pub struct FabricSnapshot {
    pub timestamp: DateTime<Utc>,
    /// `None` when discovery failed; no other collector ran in that case.
    pub topology: Option<Topology>,
    /// One entry per collector that ran, discovery first.
    pub collectors: Vec<CollectorStats>,
    pub switch_counters: Vec<PortCounters>,
    pub hca_counters: Vec<PortCounters>,
    pub switch_health: Vec<SwitchHealth>,
}

impl FabricSnapshot {
    pub fn total_errors(&self) -> u64 {
        self.collectors.iter().map(|c| c.errors).sum()
    }

    pub fn total_timeouts(&self) -> u64 {
        self.collectors.iter().map(|c| c.timeouts).sum()
    }

    /// Number of counter and health records.
    pub fn record_count(&self) -> usize {
        self.switch_counters.len() + self.hca_counters.len() + self.switch_health.len()
    }
}

/// Runs collection cycles against a fabric through a [`CommandRunner`].
pub struct Collector<R: CommandRunner> {
    runner: Arc<R>,
    config: ExporterConfig,
}

impl<R: CommandRunner + 'static> Collector<R> {
    pub fn new(runner: R, config: ExporterConfig) -> Self {
        Self {
            runner: Arc::new(runner),
            config,
        }
    }

    pub fn config(&self) -> &ExporterConfig {
        &self.config
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Discovers the fabric, then runs the enabled collectors concurrently.
    ///
    /// Never fails: tool failures show up as error and timeout counts in
    /// [`FabricSnapshot::collectors`].
    pub async fn collect_cycle(&self) -> FabricSnapshot {
        let start = Instant::now();
        let timestamp = Utc::now();
        let discovery = discover(self.runner.as_ref(), &self.config).await;
        let mut snapshot = FabricSnapshot {
            timestamp,
            topology: None,
            collectors: vec![discovery.stats],
            switch_counters: Vec::new(),
            hca_counters: Vec::new(),
            switch_health: Vec::new(),
        };

        let Some(topology) = discovery.topology else {
            warn!("fabric discovery failed, skipping collectors");
            return snapshot;
        };
        let switches: Vec<Arc<Device>> = topology.switches.iter().cloned().map(Arc::new).collect();
        let adapters: Vec<Arc<Device>> = topology.adapters.iter().cloned().map(Arc::new).collect();
        snapshot.topology = Some(topology);

        let config = &self.config;
        let switch_pass = async {
            if !config.switch.enabled {
                return None;
            }
            let settings = PortCounterSettings::from_config(config, PortFamily::Switch);
            Some(collect_port_counters(self.runner.clone(), &switches, &settings).await)
        };
        let hca_pass = async {
            if !config.hca.enabled {
                return None;
            }
            let settings = PortCounterSettings::from_config(config, PortFamily::Hca);
            Some(collect_port_counters(self.runner.clone(), &adapters, &settings).await)
        };
        let health_pass = async {
            if !config.ibswinfo.enabled {
                return None;
            }
            let settings = SwitchHealthSettings::from_config(config);
            Some(collect_switch_health(self.runner.clone(), &switches, &settings).await)
        };
        let (switch, hca, health) = tokio::join!(switch_pass, hca_pass, health_pass);

        snapshot.switch_counters = take_records(&mut snapshot.collectors, PortFamily::Switch.name(), switch);
        snapshot.hca_counters = take_records(&mut snapshot.collectors, PortFamily::Hca.name(), hca);
        snapshot.switch_health = take_records(&mut snapshot.collectors, SWITCH_HEALTH, health);

        debug!(elapsed = ?start.elapsed(), "collection cycle finished");
        if snapshot.total_errors() > 0 || snapshot.total_timeouts() > 0 {
            info!(
                errors = snapshot.total_errors(),
                timeouts = snapshot.total_timeouts(),
                "collection cycle finished with failures"
            );
        }
        snapshot
    }
}

fn take_records<T>(
    collectors: &mut Vec<CollectorStats>,
    name: &str,
    outcome: Option<CollectOutcome<T>>,
) -> Vec<T> {
    match outcome {
        Some(outcome) => {
            collectors.push(outcome.stats(name));
            outcome.records
        }
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockRunner;
    use crate::collector::mock::scenarios::SWITCH_1719_GUID;

    fn collector_names(snapshot: &FabricSnapshot) -> Vec<&str> {
        snapshot.collectors.iter().map(|c| c.collector.as_str()).collect()
    }

    fn all_enabled() -> ExporterConfig {
        let mut config = ExporterConfig::default();
        config.hca.enabled = true;
        config.ibswinfo.enabled = true;
        config
    }

    #[tokio::test]
    async fn test_collect_cycle_defaults() {
        let collector = Collector::new(MockRunner::healthy_fabric(), ExporterConfig::default());
        let snapshot = collector.collect_cycle().await;

        assert_eq!(collector_names(&snapshot), vec!["ibnetdiscover", "switch"]);
        let topology = snapshot.topology.as_ref().unwrap();
        assert_eq!(topology.switches.len(), 2);
        assert_eq!(snapshot.switch_counters.len(), 3);
        assert!(snapshot.hca_counters.is_empty());
        assert!(snapshot.switch_health.is_empty());
        assert_eq!(snapshot.total_errors(), 0);
        assert_eq!(snapshot.total_timeouts(), 0);
        assert_eq!(snapshot.record_count(), 3);
        assert_eq!(collector.runner().call_count(), 3);
    }

    #[tokio::test]
    async fn test_collect_cycle_all_collectors() {
        let collector = Collector::new(MockRunner::healthy_fabric(), all_enabled());
        let snapshot = collector.collect_cycle().await;

        assert_eq!(
            collector_names(&snapshot),
            vec!["ibnetdiscover", "switch", "hca", "ibswinfo"]
        );
        assert_eq!(snapshot.switch_counters.len(), 3);
        assert_eq!(snapshot.hca_counters.len(), 3);
        assert_eq!(snapshot.switch_health.len(), 2);
        assert_eq!(snapshot.record_count(), 8);
        assert_eq!(snapshot.total_errors(), 0);
    }

    #[tokio::test]
    async fn test_collect_cycle_skips_collectors_without_topology() {
        let runner = MockRunner::new().with_timeout("ibnetdiscover --ports");
        let collector = Collector::new(runner, all_enabled());
        let snapshot = collector.collect_cycle().await;

        assert!(snapshot.topology.is_none());
        assert_eq!(collector_names(&snapshot), vec!["ibnetdiscover"]);
        assert_eq!(snapshot.total_timeouts(), 1);
        assert_eq!(snapshot.record_count(), 0);
        assert_eq!(collector.runner().call_count(), 1);
    }

    #[tokio::test]
    async fn test_collect_cycle_partial_failure() {
        let runner = MockRunner::healthy_fabric()
            .with_failure(format!("perfquery -l -x -G {} 1,10,11", SWITCH_1719_GUID), "ibwarn: timeout")
            .with_timeout("ibswinfo -d lid-2052");
        let collector = Collector::new(runner, all_enabled());
        let snapshot = collector.collect_cycle().await;

        assert_eq!(snapshot.switch_counters.len(), 1);
        assert_eq!(snapshot.switch_health.len(), 1);
        let switch = &snapshot.collectors[1];
        assert_eq!((switch.errors, switch.timeouts), (1, 0));
        let health = &snapshot.collectors[3];
        assert_eq!((health.errors, health.timeouts), (0, 1));
        assert_eq!(snapshot.total_errors(), 1);
        assert_eq!(snapshot.total_timeouts(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_json() {
        let collector = Collector::new(MockRunner::healthy_fabric(), all_enabled());
        let snapshot = collector.collect_cycle().await;
        let value = serde_json::to_value(&snapshot).unwrap();

        assert!(value["timestamp"].is_string());
        assert_eq!(value["collectors"][0]["collector"], "ibnetdiscover");
        let counters = value["switch_counters"].as_array().unwrap();
        assert!(counters.iter().all(|c| c["guid"].is_string()));
        // Counters the query did not report serialize as null.
        assert!(counters.iter().all(|c| c["port_looping_errors"].is_null()));
        assert!(counters.iter().all(|c| c["port_xmit_data"].is_number()));

        let health = value["switch_health"].as_array().unwrap();
        assert!(health.iter().all(|h| h["part_number"].is_string()));
        assert!(health.iter().all(|h| h.get("field_errors").is_none()));
        assert_eq!(value["topology"]["adapters"].as_array().unwrap().len(), 3);
    }
}
