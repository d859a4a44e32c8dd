//! Switch hardware health collection via `ibswinfo`.

use std::sync::Arc;

use tracing::{debug, error};

use crate::collector::ibswinfo::parse_switch_info;
use crate::collector::invocation::Invocation;
use crate::collector::pool::{CollectOutcome, Dispatcher, PassSink, fan_out};
use crate::collector::traits::CommandRunner;
use crate::config::{ExporterConfig, IbswinfoConfig};
use crate::model::{Device, SwitchHealth};

pub const COLLECTOR_NAME: &str = "ibswinfo";

#[derive(Debug, Clone)]
pub struct SwitchHealthSettings {
    pub ibswinfo: IbswinfoConfig,
    pub sudo: bool,
}

impl SwitchHealthSettings {
    pub fn from_config(config: &ExporterConfig) -> Self {
        Self {
            ibswinfo: config.ibswinfo.clone(),
            sudo: config.sudo,
        }
    }
}

async fn collect_device<R: CommandRunner>(
    dispatcher: Dispatcher<R>,
    settings: Arc<SwitchHealthSettings>,
    device: Arc<Device>,
    sink: PassSink<SwitchHealth>,
) {
    let invocation = Invocation::ibswinfo(&settings.ibswinfo, settings.sudo, &device.lid);
    let (result, elapsed) = dispatcher.invoke_timed(&invocation).await;
    let output = match result {
        Ok(output) => output,
        Err(e) if e.is_timeout() => {
            error!(guid = %device.guid, lid = %device.lid, timeout = ?dispatcher.timeout(), "timeout collecting ibswinfo data");
            sink.record_failure(&e);
            return;
        }
        Err(e) => {
            error!(guid = %device.guid, lid = %device.lid, error = %e, "error running ibswinfo");
            sink.record_failure(&e);
            return;
        }
    };

    match parse_switch_info(&output) {
        Ok(info) => {
            sink.add_errors(info.field_errors);
            sink.push(SwitchHealth {
                device,
                info,
                duration: elapsed.as_secs_f64(),
                error: false,
                timeout: false,
            });
        }
        Err(e) => {
            error!(guid = %device.guid, lid = %device.lid, error = %e, "error parsing ibswinfo output");
            sink.add_errors(1);
        }
    }
}

/// Collects `ibswinfo` health of every switch in `devices`.
pub async fn collect_switch_health<R: CommandRunner + 'static>(
    runner: Arc<R>,
    devices: &[Arc<Device>],
    settings: &SwitchHealthSettings,
) -> CollectOutcome<SwitchHealth> {
    debug!(devices = devices.len(), "collecting switch health");
    let dispatcher = Dispatcher::new(
        runner,
        settings.ibswinfo.max_concurrent,
        settings.ibswinfo.timeout,
    );
    let settings = Arc::new(settings.clone());
    fan_out(COLLECTOR_NAME, devices, |device, sink| {
        collect_device(dispatcher.clone(), settings.clone(), device, sink)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::ibnetdiscover::parse_topology;
    use crate::collector::mock::scenarios::{
        IBNETDISCOVER, IBSWINFO_BAD_TEMPERATURE, IBSWINFO_SB7790, SWITCH_1719_GUID, SWITCH_2052_GUID,
    };
    use crate::collector::mock::{MockResponse, MockRunner};
    use std::time::Duration;

    fn switches() -> Vec<Arc<Device>> {
        let topology = parse_topology(IBNETDISCOVER).unwrap();
        topology.switches.into_iter().map(Arc::new).collect()
    }

    fn settings() -> SwitchHealthSettings {
        SwitchHealthSettings::from_config(&ExporterConfig::default())
    }

    #[tokio::test]
    async fn test_collect_switch_health() {
        let runner = Arc::new(MockRunner::healthy_fabric());
        let outcome = collect_switch_health(runner.clone(), &switches(), &settings()).await;
        assert_eq!(outcome.errors, 0);
        assert_eq!(outcome.timeouts, 0);
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(runner.call_count(), 2);

        let sb7790 = outcome
            .records
            .iter()
            .find(|r| r.device.guid == SWITCH_1719_GUID)
            .unwrap();
        assert_eq!(sb7790.info.part_number, "MSB7790-ES2F");
        assert_eq!(sb7790.info.fan_status, "ERROR");
        assert_eq!(sb7790.info.uptime, 13862333.0);
        assert!(!sb7790.error);
        assert!(!sb7790.timeout);
        assert!(sb7790.duration >= 0.0);

        let qm8790 = outcome
            .records
            .iter()
            .find(|r| r.device.guid == SWITCH_2052_GUID)
            .unwrap();
        assert_eq!(qm8790.info.fans.len(), 9);
        assert_eq!(qm8790.info.temperature, 53.0);
    }

    #[tokio::test]
    async fn test_collect_switch_health_failures() {
        let runner = Arc::new(
            MockRunner::new()
                .with_timeout("ibswinfo -d lid-1719")
                .with_output("ibswinfo -d lid-2052", IBSWINFO_BAD_TEMPERATURE),
        );
        let outcome = collect_switch_health(runner, &switches(), &settings()).await;
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.timeouts, 1);
        assert_eq!(outcome.errors, 1);
    }

    #[tokio::test]
    async fn test_collect_switch_health_counts_field_errors() {
        let output = IBSWINFO_SB7790.replace("160d-10:38:53", "soon");
        let runner = Arc::new(MockRunner::new().with_fallback(MockResponse::Output(output)));
        let outcome = collect_switch_health(runner, &switches(), &settings()).await;
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.errors, 2);
        assert!(outcome.records.iter().all(|r| r.info.uptime == 0.0));
    }

    #[tokio::test]
    async fn test_collect_switch_health_duration_excludes_queueing() {
        let runner = Arc::new(
            MockRunner::new()
                .with_fallback(MockResponse::Output(IBSWINFO_SB7790.into()))
                .with_delay(Duration::from_millis(30)),
        );
        let outcome = collect_switch_health(runner.clone(), &switches(), &settings()).await;
        assert_eq!(runner.peak_in_flight(), 1);
        assert!(outcome.duration >= Duration::from_millis(60));
        for record in &outcome.records {
            assert!(record.duration >= 0.03);
            assert!(record.duration < outcome.duration.as_secs_f64());
        }
    }
}
