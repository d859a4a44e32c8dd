//! Port counter collection for switches and HCAs via `perfquery`.
//!
//! Per device, one base query (`-l -x`) covers all connected ports. When
//! receive error details are enabled, each port selector returned by the base
//! query gets its own `-E` query. Base and detail results are separate
//! records, so their counter subsets never mix.

use std::sync::Arc;

use tracing::{debug, error};

use crate::collector::invocation::Invocation;
use crate::collector::perfquery::parse_counters;
use crate::collector::pool::{CollectOutcome, Dispatcher, PassSink, fan_out};
use crate::collector::traits::{CommandRunner, RunError};
use crate::config::{ExporterConfig, PerfqueryConfig};
use crate::model::{Device, PortCounters};

const BASE_ARGS: &[&str] = &["-l", "-x"];
const RCV_ERR_ARGS: &[&str] = &["-E"];

/// Which device list a port counter pass covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortFamily {
    Switch,
    Hca,
}

impl PortFamily {
    pub fn name(&self) -> &'static str {
        match self {
            PortFamily::Switch => "switch",
            PortFamily::Hca => "hca",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PortCounterSettings {
    pub family: PortFamily,
    /// Keep the base query records. The base query runs regardless.
    pub base_metrics: bool,
    pub rcv_err_details: bool,
    pub perfquery: PerfqueryConfig,
    pub sudo: bool,
}

impl PortCounterSettings {
    pub fn from_config(config: &ExporterConfig, family: PortFamily) -> Self {
        let (base_metrics, rcv_err_details) = match family {
            PortFamily::Switch => (true, config.switch.rcv_err_details),
            PortFamily::Hca => (config.hca.base_metrics, config.hca.rcv_err_details),
        };
        Self {
            family,
            base_metrics,
            rcv_err_details,
            perfquery: config.perfquery.clone(),
            sudo: config.sudo,
        }
    }
}

fn log_failure(device: &Device, invocation: &Invocation, err: &RunError) {
    if err.is_timeout() {
        error!(guid = %device.guid, command = %invocation, error = %err, "timeout collecting perfquery data");
    } else {
        error!(guid = %device.guid, command = %invocation, error = %err, "error running perfquery");
    }
}

async fn collect_device<R: CommandRunner>(
    dispatcher: Dispatcher<R>,
    settings: Arc<PortCounterSettings>,
    device: Arc<Device>,
    sink: PassSink<PortCounters>,
) {
    let ports = device.port_numbers().join(",");
    let base = Invocation::perfquery(
        &settings.perfquery,
        settings.sudo,
        BASE_ARGS,
        &device.guid,
        &ports,
    );
    let output = match dispatcher.invoke(&base).await {
        Ok(output) => output,
        Err(e) => {
            log_failure(&device, &base, &e);
            sink.record_failure(&e);
            return;
        }
    };
    let (records, errors) = parse_counters(&device, &output);
    sink.add_errors(errors);

    let selectors: Vec<String> = records.iter().map(|r| r.port_select.clone()).collect();
    if settings.base_metrics {
        sink.extend(records);
    }
    if !settings.rcv_err_details {
        return;
    }

    for port in selectors {
        let detail = Invocation::perfquery(
            &settings.perfquery,
            settings.sudo,
            RCV_ERR_ARGS,
            &device.guid,
            &port,
        );
        match dispatcher.invoke(&detail).await {
            Ok(output) => {
                let (records, errors) = parse_counters(&device, &output);
                sink.add_errors(errors);
                sink.extend(records);
            }
            Err(e) => {
                log_failure(&device, &detail, &e);
                sink.record_failure(&e);
            }
        }
    }
}

/// Collects port counters of `devices`, at most `perfquery.max_concurrent`
/// `perfquery` calls at a time.
pub async fn collect_port_counters<R: CommandRunner + 'static>(
    runner: Arc<R>,
    devices: &[Arc<Device>],
    settings: &PortCounterSettings,
) -> CollectOutcome<PortCounters> {
    debug!(
        family = settings.family.name(),
        devices = devices.len(),
        rcv_err_details = settings.rcv_err_details,
        "collecting port counters"
    );
    let dispatcher = Dispatcher::new(
        runner,
        settings.perfquery.max_concurrent,
        settings.perfquery.timeout,
    );
    let settings = Arc::new(settings.clone());
    fan_out(settings.family.name(), devices, |device, sink| {
        collect_device(dispatcher.clone(), settings.clone(), device, sink)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::ibnetdiscover::parse_topology;
    use crate::collector::mock::scenarios::{
        IBNETDISCOVER, PERFQUERY_BAD_VALUES, PERFQUERY_HCA, SWITCH_1719_GUID, SWITCH_2052_GUID,
    };
    use crate::collector::mock::{MockResponse, MockRunner};
    use crate::model::{CounterField, NodeKind};
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn switches() -> Vec<Arc<Device>> {
        let topology = parse_topology(IBNETDISCOVER).unwrap();
        topology.switches.into_iter().map(Arc::new).collect()
    }

    fn adapters() -> Vec<Arc<Device>> {
        let topology = parse_topology(IBNETDISCOVER).unwrap();
        topology.adapters.into_iter().map(Arc::new).collect()
    }

    fn synthetic(n: usize) -> Vec<Arc<Device>> {
        (0..n)
            .map(|i| {
                let mut uplinks = BTreeMap::new();
                uplinks.insert(
                    "1".to_string(),
                    crate::model::Uplink {
                        kind: NodeKind::Switch,
                        lid: "1".into(),
                        port_number: format!("{}", i + 1),
                        guid: "0x1".into(),
                        name: "spine".into(),
                    },
                );
                Arc::new(Device {
                    kind: NodeKind::Adapter,
                    lid: format!("{}", 100 + i),
                    guid: format!("0x{:016x}", 100 + i),
                    rate: 0.0,
                    raw_rate: 0.0,
                    name: format!("node{}", i),
                    uplinks,
                })
            })
            .collect()
    }

    fn settings(family: PortFamily) -> PortCounterSettings {
        PortCounterSettings::from_config(&ExporterConfig::default(), family)
    }

    fn find<'a>(records: &'a [PortCounters], guid: &str, port: &str, field: CounterField) -> Vec<&'a PortCounters> {
        records
            .iter()
            .filter(|r| r.device.guid == guid && r.port_select == port && !r.get(field).is_nan())
            .collect()
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = ExporterConfig::default();
        config.hca.base_metrics = false;
        config.hca.rcv_err_details = true;
        config.perfquery.max_concurrent = 4;

        let switch = PortCounterSettings::from_config(&config, PortFamily::Switch);
        assert!(switch.base_metrics);
        assert!(!switch.rcv_err_details);
        assert_eq!(switch.perfquery.max_concurrent, 4);

        let hca = PortCounterSettings::from_config(&config, PortFamily::Hca);
        assert!(!hca.base_metrics);
        assert!(hca.rcv_err_details);
        assert_eq!(hca.family.name(), "hca");
    }

    #[tokio::test]
    async fn test_collect_switch_counters() {
        let runner = Arc::new(MockRunner::healthy_fabric());
        let outcome =
            collect_port_counters(runner.clone(), &switches(), &settings(PortFamily::Switch)).await;
        assert_eq!(outcome.errors, 0);
        assert_eq!(outcome.timeouts, 0);
        assert_eq!(outcome.records.len(), 3);
        assert_eq!(runner.call_count(), 2);

        let port = find(&outcome.records, SWITCH_2052_GUID, "1", CounterField::PortXmitWait);
        assert_eq!(port.len(), 1);
        assert_eq!(port[0].port_xmit_wait, 1234567.0);
        assert_eq!(port[0].port_rcv_switch_relay_errors, 7.0);
        assert!(port[0].port_looping_errors.is_nan());
    }

    #[tokio::test]
    async fn test_collect_switch_rcv_err_details() {
        let runner = Arc::new(MockRunner::healthy_fabric());
        let mut settings = settings(PortFamily::Switch);
        settings.rcv_err_details = true;
        let outcome = collect_port_counters(runner.clone(), &switches(), &settings).await;
        assert_eq!(outcome.errors, 0);
        assert_eq!(outcome.records.len(), 6);
        assert_eq!(runner.call_count(), 5);

        let detail = find(&outcome.records, SWITCH_1719_GUID, "2", CounterField::PortLocalPhysicalErrors);
        assert_eq!(detail.len(), 1);
        assert_eq!(detail[0].port_local_physical_errors, 3.0);
        assert_eq!(detail[0].port_looping_errors, 1.0);
        assert!(detail[0].port_xmit_data.is_nan());

        let base = find(&outcome.records, SWITCH_1719_GUID, "2", CounterField::PortXmitData);
        assert_eq!(base.len(), 1);
        assert!(base[0].port_local_physical_errors.is_nan());
    }

    #[tokio::test]
    async fn test_collect_detail_timeout_keeps_other_records() {
        let runner = Arc::new(
            MockRunner::healthy_fabric()
                .with_timeout(format!("perfquery -E -G {} 2", SWITCH_1719_GUID)),
        );
        let mut settings = settings(PortFamily::Switch);
        settings.rcv_err_details = true;
        let outcome = collect_port_counters(runner, &switches(), &settings).await;
        assert_eq!(outcome.timeouts, 1);
        assert_eq!(outcome.errors, 0);
        assert_eq!(outcome.records.len(), 5);
    }

    #[tokio::test]
    async fn test_collect_hca_details_without_base_metrics() {
        let runner = Arc::new(MockRunner::healthy_fabric());
        let mut settings = settings(PortFamily::Hca);
        settings.base_metrics = false;
        settings.rcv_err_details = true;
        let outcome = collect_port_counters(runner.clone(), &adapters(), &settings).await;
        assert_eq!(outcome.errors, 0);
        assert_eq!(outcome.records.len(), 3);
        assert_eq!(runner.call_count(), 6);
        for record in &outcome.records {
            assert!(record.port_xmit_data.is_nan());
            assert_eq!(record.port_looping_errors, 0.0);
        }
    }

    #[tokio::test]
    async fn test_collect_hca_base_metrics() {
        let runner = Arc::new(MockRunner::healthy_fabric());
        let outcome = collect_port_counters(runner, &adapters(), &settings(PortFamily::Hca)).await;
        assert_eq!(outcome.records.len(), 3);
        for record in &outcome.records {
            assert_eq!(record.port_xmit_data, 1234567890123.0);
        }
    }

    #[tokio::test]
    async fn test_collect_respects_concurrency_limit() {
        for limit in [1, 2, 5] {
            let runner = Arc::new(
                MockRunner::new()
                    .with_fallback(MockResponse::Output(PERFQUERY_HCA.into()))
                    .with_delay(Duration::from_millis(20)),
            );
            let mut settings = settings(PortFamily::Hca);
            settings.perfquery.max_concurrent = limit;
            let outcome = collect_port_counters(runner.clone(), &synthetic(10), &settings).await;
            assert_eq!(outcome.records.len(), 10);
            assert!(runner.peak_in_flight() <= limit);
            assert_eq!(runner.peak_in_flight(), limit);
        }
    }

    #[tokio::test]
    async fn test_collect_all_timeouts() {
        let runner = Arc::new(MockRunner::new().with_fallback(MockResponse::Timeout));
        let devices = synthetic(6);
        let mut settings = settings(PortFamily::Hca);
        settings.rcv_err_details = true;
        let outcome = collect_port_counters(runner, &devices, &settings).await;
        assert_eq!(outcome.timeouts, devices.len() as u64);
        assert_eq!(outcome.errors, 0);
        assert!(outcome.records.is_empty());
    }

    #[tokio::test]
    async fn test_collect_failures_and_bad_values() {
        let runner = Arc::new(MockRunner::new().with_fallback(MockResponse::Failure("ibwarn".into())));
        let outcome = collect_port_counters(runner, &synthetic(3), &settings(PortFamily::Hca)).await;
        assert_eq!(outcome.errors, 3);
        assert_eq!(outcome.timeouts, 0);
        assert!(outcome.records.is_empty());

        let runner = Arc::new(
            MockRunner::new().with_fallback(MockResponse::Output(PERFQUERY_BAD_VALUES.into())),
        );
        let outcome = collect_port_counters(runner, &synthetic(2), &settings(PortFamily::Hca)).await;
        assert_eq!(outcome.errors, 4);
        assert_eq!(outcome.records.len(), 2);
    }
}
