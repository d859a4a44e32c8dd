//! Exporter configuration.
//!
//! Built once at startup (from CLI flags in the daemon, from `Default` in
//! tests) and passed by reference into every collector.

use std::path::PathBuf;
use std::time::Duration;

/// Settings of the `ibnetdiscover` tool.
#[derive(Debug, Clone)]
pub struct IbnetdiscoverConfig {
    pub path: String,
    /// Passed as `--node-name-map` when set.
    pub node_name_map: Option<PathBuf>,
    /// Default: 20s.
    pub timeout: Duration,
}

impl Default for IbnetdiscoverConfig {
    fn default() -> Self {
        Self {
            path: "ibnetdiscover".to_string(),
            node_name_map: None,
            timeout: Duration::from_secs(20),
        }
    }
}

/// Settings of the `perfquery` tool.
#[derive(Debug, Clone)]
pub struct PerfqueryConfig {
    pub path: String,
    /// Default: 5s.
    pub timeout: Duration,
    /// Maximum number of concurrent `perfquery` calls per pass. Default: 1.
    pub max_concurrent: usize,
}

impl Default for PerfqueryConfig {
    fn default() -> Self {
        Self {
            path: "perfquery".to_string(),
            timeout: Duration::from_secs(5),
            max_concurrent: 1,
        }
    }
}

/// Settings of the `ibswinfo` tool and its collector.
#[derive(Debug, Clone)]
pub struct IbswinfoConfig {
    pub enabled: bool,
    pub path: String,
    /// Default: 10s.
    pub timeout: Duration,
    /// Default: 1.
    pub max_concurrent: usize,
}

impl Default for IbswinfoConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: "ibswinfo".to_string(),
            timeout: Duration::from_secs(10),
            max_concurrent: 1,
        }
    }
}

/// Switch port counter collector.
#[derive(Debug, Clone)]
pub struct SwitchCollectorConfig {
    pub enabled: bool,
    /// Also query `-E` receive error details per port.
    pub rcv_err_details: bool,
}

impl Default for SwitchCollectorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rcv_err_details: false,
        }
    }
}

/// HCA port counter collector.
#[derive(Debug, Clone)]
pub struct HcaCollectorConfig {
    pub enabled: bool,
    /// Record the base (`-x`) counters. The base query always runs since its
    /// port selectors drive the detail round.
    pub base_metrics: bool,
    pub rcv_err_details: bool,
}

impl Default for HcaCollectorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_metrics: true,
            rcv_err_details: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExporterConfig {
    /// Run every tool through `sudo`.
    pub sudo: bool,
    pub ibnetdiscover: IbnetdiscoverConfig,
    pub perfquery: PerfqueryConfig,
    pub ibswinfo: IbswinfoConfig,
    pub switch: SwitchCollectorConfig,
    pub hca: HcaCollectorConfig,
}

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Concurrency limit of zero for the named tool.
    ZeroConcurrency(&'static str),
    /// Timeout of zero for the named tool.
    ZeroTimeout(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ZeroConcurrency(tool) => {
                write!(f, "{}: max concurrent must be at least 1", tool)
            }
            ConfigError::ZeroTimeout(tool) => write!(f, "{}: timeout must be greater than zero", tool),
        }
    }
}

impl std::error::Error for ConfigError {}

impl ExporterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.perfquery.max_concurrent == 0 {
            return Err(ConfigError::ZeroConcurrency("perfquery"));
        }
        if self.ibswinfo.max_concurrent == 0 {
            return Err(ConfigError::ZeroConcurrency("ibswinfo"));
        }
        for (tool, timeout) in [
            ("ibnetdiscover", self.ibnetdiscover.timeout),
            ("perfquery", self.perfquery.timeout),
            ("ibswinfo", self.ibswinfo.timeout),
        ] {
            if timeout.is_zero() {
                return Err(ConfigError::ZeroTimeout(tool));
            }
        }
        Ok(())
    }
}
