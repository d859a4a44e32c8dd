//! ibexporter-core: InfiniBand fabric discovery and counter collection.
//!
//! Provides:
//! - `collector`: external tool invocation, output parsers and bounded fan-out collectors
//! - `model`: fabric devices, port counters and switch health records
//! - `rates`: link speed table (lane rate per generation, width scaling)
//! - `config`: exporter configuration shared by all collectors
//! - `fmt`: formatting helpers for log output

pub mod collector;
pub mod config;
pub mod fmt;
pub mod model;
pub mod rates;

/// Crate version with the short git commit of the build.
pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("IBEXPORTER_GIT_SHA"), ")");
