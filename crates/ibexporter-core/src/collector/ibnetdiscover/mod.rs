//! Fabric topology discovery via `ibnetdiscover`.

mod parser;

use std::time::Instant;

use tracing::{debug, error};

pub use parser::{TopologyError, parse_names, parse_topology};

use crate::collector::invocation::Invocation;
use crate::collector::pool::CollectorStats;
use crate::collector::traits::CommandRunner;
use crate::config::ExporterConfig;
use crate::model::Topology;

pub const COLLECTOR_NAME: &str = "ibnetdiscover";

/// Result of one discovery run.
#[derive(Debug)]
pub struct DiscoveryOutcome {
    /// `None` when the tool failed or its output could not be parsed.
    pub topology: Option<Topology>,
    pub stats: CollectorStats,
}

/// Runs `ibnetdiscover` once and parses the fabric.
pub async fn discover<R: CommandRunner>(runner: &R, config: &ExporterConfig) -> DiscoveryOutcome {
    let invocation = Invocation::ibnetdiscover(&config.ibnetdiscover, config.sudo);
    let timeout = config.ibnetdiscover.timeout;
    let start = Instant::now();
    let mut stats = CollectorStats {
        collector: COLLECTOR_NAME.to_string(),
        duration: 0.0,
        errors: 0,
        timeouts: 0,
    };

    let topology = match runner
        .run(&invocation.command, &invocation.args, timeout)
        .await
    {
        Ok(output) => match parse_topology(&output) {
            Ok(topology) => {
                debug!(
                    switches = topology.switches.len(),
                    adapters = topology.adapters.len(),
                    "fabric discovered"
                );
                Some(topology)
            }
            Err(e) => {
                error!(error = %e, "error parsing ibnetdiscover output");
                stats.errors = 1;
                None
            }
        },
        Err(e) if e.is_timeout() => {
            error!(timeout = ?timeout, "timeout collecting ibnetdiscover data");
            stats.timeouts = 1;
            None
        }
        Err(e) => {
            error!(error = %e, "error running ibnetdiscover");
            stats.errors = 1;
            None
        }
    };

    stats.duration = start.elapsed().as_secs_f64();
    DiscoveryOutcome { topology, stats }
}
