//! ibexporterd - InfiniBand fabric exporter daemon.
//!
//! Discovers the fabric with `ibnetdiscover`, polls port counters with
//! `perfquery` and switch health with `ibswinfo`, and writes each collection
//! cycle as a JSON snapshot.

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

/// Releases unused memory back to the operating system.
/// A cycle allocates the whole snapshot, so RSS is trimmed after each one.
fn release_memory_to_os() {
    // SAFETY: We're calling jemalloc's mallctl with valid arguments.
    // arena.0.purge tells jemalloc to return unused pages to the OS.
    unsafe {
        tikv_jemalloc_sys::mallctl(
            c"arena.0.purge".as_ptr().cast(),
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            0,
        );
    }
}

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use tempfile::NamedTempFile;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use ibexporter_core::collector::{Collector, FabricSnapshot, SystemRunner};
use ibexporter_core::config::ExporterConfig;
use ibexporter_core::fmt::{FmtStyle, format_elapsed, format_link_rate, format_uptime};

/// InfiniBand fabric exporter daemon.
#[derive(Parser)]
#[command(name = "ibexporterd", about = "InfiniBand fabric exporter daemon", version = ibexporter_core::VERSION)]
struct Args {
    /// Collection interval (e.g., "60s", "2m", "500ms").
    #[arg(short, long, default_value = "60s", value_parser = parse_duration)]
    interval: Duration,

    /// Collect a single snapshot and exit.
    #[arg(long)]
    once: bool,

    /// File to write the JSON snapshot to, replaced atomically on every cycle.
    /// With --once and no output the snapshot goes to stdout.
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Run the InfiniBand tools through sudo.
    #[arg(long)]
    sudo: bool,

    /// Path to ibnetdiscover.
    #[arg(long, default_value = "ibnetdiscover")]
    ibnetdiscover_path: String,

    /// Node name map passed to ibnetdiscover. An empty value means none.
    #[arg(long, value_name = "PATH", value_parser = parse_path)]
    node_name_map: Option<PathBuf>,

    /// Timeout of the ibnetdiscover call.
    #[arg(long, default_value = "20s", value_parser = parse_duration)]
    ibnetdiscover_timeout: Duration,

    /// Path to perfquery.
    #[arg(long, default_value = "perfquery")]
    perfquery_path: String,

    /// Timeout of each perfquery call.
    #[arg(long, default_value = "5s", value_parser = parse_duration)]
    perfquery_timeout: Duration,

    /// Maximum number of concurrent perfquery calls per collector.
    #[arg(long, default_value = "1")]
    perfquery_max_concurrent: usize,

    /// Collect switch port counters. Disable with --collector-switch=false.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    collector_switch: bool,

    /// Also collect receive error details of switch ports.
    #[arg(long)]
    collector_switch_rcv_err_details: bool,

    /// Collect HCA port counters.
    #[arg(long)]
    collector_hca: bool,

    /// Record HCA base counters. Disable with --collector-hca-base-metrics=false.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    collector_hca_base_metrics: bool,

    /// Also collect receive error details of HCA ports.
    #[arg(long)]
    collector_hca_rcv_err_details: bool,

    /// Collect switch health with ibswinfo.
    #[arg(long)]
    collector_ibswinfo: bool,

    /// Path to ibswinfo.
    #[arg(long, default_value = "ibswinfo")]
    ibswinfo_path: String,

    /// Timeout of each ibswinfo call.
    #[arg(long, default_value = "10s", value_parser = parse_duration)]
    ibswinfo_timeout: Duration,

    /// Maximum number of concurrent ibswinfo calls.
    #[arg(long, default_value = "1")]
    ibswinfo_max_concurrent: usize,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Unlike clap's `PathBuf` parser, accepts an empty value.
fn parse_path(s: &str) -> Result<PathBuf, String> {
    Ok(PathBuf::from(s))
}

/// Parses a human-readable duration ("500ms", "20s", "2m", "1h") into a
/// `Duration`. A bare number is taken as seconds.
fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let (num_str, millis_per_unit) = if let Some(num) = s.strip_suffix("ms") {
        (num, 1)
    } else if let Some(num) = s.strip_suffix('s') {
        (num, 1000)
    } else if let Some(num) = s.strip_suffix('m') {
        (num, 60 * 1000)
    } else if let Some(num) = s.strip_suffix('h') {
        (num, 60 * 60 * 1000)
    } else {
        (s, 1000)
    };

    num_str
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("invalid duration '{}': {}", s, e))?
        .checked_mul(millis_per_unit)
        .map(Duration::from_millis)
        .ok_or_else(|| format!("duration '{}' is too large", s))
}

fn build_config(args: &Args) -> ExporterConfig {
    let mut config = ExporterConfig {
        sudo: args.sudo,
        ..Default::default()
    };

    config.ibnetdiscover.path = args.ibnetdiscover_path.clone();
    config.ibnetdiscover.node_name_map = args
        .node_name_map
        .clone()
        .filter(|path| !path.as_os_str().is_empty());
    config.ibnetdiscover.timeout = args.ibnetdiscover_timeout;

    config.perfquery.path = args.perfquery_path.clone();
    config.perfquery.timeout = args.perfquery_timeout;
    config.perfquery.max_concurrent = args.perfquery_max_concurrent;

    config.ibswinfo.enabled = args.collector_ibswinfo;
    config.ibswinfo.path = args.ibswinfo_path.clone();
    config.ibswinfo.timeout = args.ibswinfo_timeout;
    config.ibswinfo.max_concurrent = args.ibswinfo_max_concurrent;

    config.switch.enabled = args.collector_switch;
    config.switch.rcv_err_details = args.collector_switch_rcv_err_details;

    config.hca.enabled = args.collector_hca;
    config.hca.base_metrics = args.collector_hca_base_metrics;
    config.hca.rcv_err_details = args.collector_hca_rcv_err_details;

    config
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["ibexporterd", "ibexporter_core"] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Describes the contents of a snapshot for logging.
fn describe_snapshot(snapshot: &FabricSnapshot) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(topology) = &snapshot.topology {
        parts.push(format!("{} switches", topology.switches.len()));
        parts.push(format!("{} adapters", topology.adapters.len()));
    }
    for stats in &snapshot.collectors {
        let records = match stats.collector.as_str() {
            "switch" => Some(snapshot.switch_counters.len()),
            "hca" => Some(snapshot.hca_counters.len()),
            "ibswinfo" => Some(snapshot.switch_health.len()),
            _ => None,
        };
        let mut part = match records {
            Some(n) => format!("{} {} records", n, stats.collector),
            None => stats.collector.clone(),
        };
        part.push_str(&format!(
            " in {}",
            format_elapsed(Duration::from_secs_f64(stats.duration))
        ));
        if stats.errors > 0 || stats.timeouts > 0 {
            part.push_str(&format!(
                " ({} errors, {} timeouts)",
                stats.errors, stats.timeouts
            ));
        }
        parts.push(part);
    }

    parts.join(", ")
}

/// Logs one line per switch at debug level.
fn log_switches(snapshot: &FabricSnapshot) {
    let Some(topology) = &snapshot.topology else {
        return;
    };
    for switch in &topology.switches {
        let uptime = snapshot
            .switch_health
            .iter()
            .find(|h| h.device.guid == switch.guid)
            .map(|h| format_uptime(h.info.uptime, FmtStyle::Compact));
        debug!(
            guid = %switch.guid,
            lid = %switch.lid,
            name = %switch.name,
            ports = switch.uplinks.len(),
            rate = %format_link_rate(switch.rate, FmtStyle::Detail),
            uptime = uptime.as_deref().unwrap_or("-"),
            "switch"
        );
    }
}

/// Writes the snapshot as JSON, replacing `path` atomically.
fn write_snapshot(snapshot: &FabricSnapshot, path: &Path) -> io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut file, snapshot)?;
    file.write_all(b"\n")?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn print_snapshot(snapshot: &FabricSnapshot) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, snapshot)?;
    stdout.write_all(b"\n")?;
    stdout.flush()
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    let config = build_config(&args);
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        std::process::exit(2);
    }

    info!("ibexporterd {} starting", ibexporter_core::VERSION);
    info!(
        "Config: interval={}, sudo={}, perfquery max_concurrent={}, ibswinfo max_concurrent={}",
        format_elapsed(args.interval),
        config.sudo,
        config.perfquery.max_concurrent,
        config.ibswinfo.max_concurrent
    );
    info!(
        "Collectors: switch={} (rcv_err_details={}), hca={} (base_metrics={}, rcv_err_details={}), ibswinfo={}",
        config.switch.enabled,
        config.switch.rcv_err_details,
        config.hca.enabled,
        config.hca.base_metrics,
        config.hca.rcv_err_details,
        config.ibswinfo.enabled
    );

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };
    let collector = Collector::new(SystemRunner::new(), config);

    if args.once {
        let snapshot = runtime.block_on(collector.collect_cycle());
        info!("Snapshot: {}", describe_snapshot(&snapshot));
        log_switches(&snapshot);
        let written = match &args.output {
            Some(path) => write_snapshot(&snapshot, path),
            None => print_snapshot(&snapshot),
        };
        if let Err(e) = written {
            error!("Failed to write snapshot: {}", e);
            std::process::exit(1);
        }
        return;
    }

    if args.output.is_none() {
        warn!("No --output given, snapshots are only logged");
    }

    // Setup graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let mut cycle_count: u64 = 0;
    info!("Starting collection loop");

    while running.load(Ordering::SeqCst) {
        let snapshot = runtime.block_on(collector.collect_cycle());
        cycle_count += 1;
        info!("Cycle #{}: {}", cycle_count, describe_snapshot(&snapshot));
        log_switches(&snapshot);

        if let Some(path) = &args.output {
            match write_snapshot(&snapshot, path) {
                Ok(()) => debug!("Snapshot written to {}", path.display()),
                Err(e) => error!("Failed to write snapshot to {}: {}", path.display(), e),
            }
        }

        drop(snapshot);
        release_memory_to_os();

        // Sleep with periodic checks for shutdown signal
        let sleep_interval = Duration::from_millis(100);
        let mut remaining = args.interval;
        while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
            let sleep_time = remaining.min(sleep_interval);
            std::thread::sleep(sleep_time);
            remaining = remaining.saturating_sub(sleep_time);
        }
    }

    info!("Shutdown complete");
}

#[cfg(test)]
mod tests {
    use super::*;
    use ibexporter_core::collector::MockRunner;

    fn snapshot(config: ExporterConfig) -> FabricSnapshot {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let collector = Collector::new(MockRunner::healthy_fabric(), config);
        runtime.block_on(collector.collect_cycle())
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("500ms"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_duration("20s"), Ok(Duration::from_secs(20)));
        assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
        assert_eq!(parse_duration(" 15 "), Ok(Duration::from_secs(15)));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("fast").is_err());
        assert!(parse_duration("-5s").is_err());
        assert!(parse_duration("18446744073709551615h").is_err());
        assert!(parse_duration("18446744073709551615s").is_err());
        assert_eq!(
            parse_duration("18446744073709551615ms"),
            Ok(Duration::from_millis(u64::MAX))
        );
    }

    #[test]
    fn test_build_config_defaults() {
        let args = Args::parse_from(["ibexporterd"]);
        let config = build_config(&args);
        assert_eq!(args.interval, Duration::from_secs(60));
        assert!(!config.sudo);
        assert!(config.switch.enabled);
        assert!(!config.hca.enabled);
        assert!(config.hca.base_metrics);
        assert!(!config.ibswinfo.enabled);
        assert_eq!(config.ibnetdiscover.timeout, Duration::from_secs(20));
        assert_eq!(config.perfquery.timeout, Duration::from_secs(5));
        assert_eq!(config.ibswinfo.timeout, Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_build_config_flags() {
        let args = Args::parse_from([
            "ibexporterd",
            "--sudo",
            "--collector-switch=false",
            "--collector-hca",
            "--collector-hca-base-metrics=false",
            "--collector-hca-rcv-err-details",
            "--collector-ibswinfo",
            "--perfquery-max-concurrent",
            "8",
            "--perfquery-timeout",
            "750ms",
            "--node-name-map",
            "/etc/ib-node-name-map",
        ]);
        let config = build_config(&args);
        assert!(config.sudo);
        assert!(!config.switch.enabled);
        assert!(config.hca.enabled);
        assert!(!config.hca.base_metrics);
        assert!(config.hca.rcv_err_details);
        assert!(config.ibswinfo.enabled);
        assert_eq!(config.perfquery.max_concurrent, 8);
        assert_eq!(config.perfquery.timeout, Duration::from_millis(750));
        assert_eq!(
            config.ibnetdiscover.node_name_map,
            Some(PathBuf::from("/etc/ib-node-name-map"))
        );
    }

    #[test]
    fn test_build_config_empty_node_name_map() {
        let args = Args::try_parse_from(["ibexporterd", "--node-name-map", ""]).unwrap();
        let config = build_config(&args);
        assert_eq!(config.ibnetdiscover.node_name_map, None);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let args = Args::parse_from(["ibexporterd", "--ibswinfo-max-concurrent", "0"]);
        assert!(build_config(&args).validate().is_err());
    }

    #[test]
    fn test_describe_snapshot() {
        let mut config = ExporterConfig::default();
        config.ibswinfo.enabled = true;
        let desc = describe_snapshot(&snapshot(config));
        assert!(desc.contains("2 switches"));
        assert!(desc.contains("3 adapters"));
        assert!(desc.contains("3 switch records"));
        assert!(desc.contains("2 ibswinfo records"));
        assert!(desc.contains("ibnetdiscover in"));
        assert!(!desc.contains("errors"));
    }

    #[test]
    fn test_write_snapshot_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fabric.json");
        std::fs::write(&path, "stale").unwrap();

        write_snapshot(&snapshot(ExporterConfig::default()), &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["switch_counters"].as_array().unwrap().len(), 3);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
