//! InfiniBand fabric collector.
//!
//! This module runs the InfiniBand diagnostic tools, parses their text output
//! and aggregates the results of one collection cycle into a [`FabricSnapshot`].
//! Tool execution goes through the [`CommandRunner`] trait so the whole
//! pipeline can be tested against captured output.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                            Collector                             │
//! │  ┌───────────────┐                                               │
//! │  │ ibnetdiscover │──► Topology (switches, adapters)              │
//! │  └───────────────┘            │                                  │
//! │            ┌──────────────────┼──────────────────┐               │
//! │     ┌──────▼──────┐    ┌──────▼──────┐    ┌──────▼──────┐        │
//! │     │ ports       │    │ ports       │    │ switch_     │        │
//! │     │ (switch)    │    │ (hca)       │    │ health      │        │
//! │     │ perfquery   │    │ perfquery   │    │ ibswinfo    │        │
//! │     └──────┬──────┘    └──────┬──────┘    └──────┬──────┘        │
//! │            └──────────────────┼──────────────────┘               │
//! │                        ┌──────▼──────┐                           │
//! │                        │ pool        │ Dispatcher (semaphore)    │
//! │                        │             │ fan_out (JoinSet)         │
//! │                        └──────┬──────┘                           │
//! │                        ┌──────▼──────┐                           │
//! │                        │CommandRunner│ (trait)                   │
//! │                        └──────┬──────┘                           │
//! └───────────────────────────────┼──────────────────────────────────┘
//!                                 │
//!              ┌──────────────────┼──────────────────┐
//!              │                  │                  │
//!       ┌──────▼──────┐    ┌──────▼──────┐    ┌──────▼──────┐
//!       │SystemRunner │    │ MockRunner  │    │  Scenarios  │
//!       │(tokio proc) │    │ (Testing)   │    │ (Fixtures)  │
//!       └─────────────┘    └─────────────┘    └─────────────┘
//! ```
//!
//! # Usage
//!
//! ## Production
//!
//! ```ignore
//! use ibexporter_core::collector::{Collector, SystemRunner};
//! use ibexporter_core::config::ExporterConfig;
//!
//! let collector = Collector::new(SystemRunner::new(), ExporterConfig::default());
//! let snapshot = collector.collect_cycle().await;
//! ```
//!
//! ## Testing (with MockRunner)
//!
//! ```
//! use ibexporter_core::collector::{Collector, MockRunner};
//! use ibexporter_core::config::ExporterConfig;
//!
//! let runtime = tokio::runtime::Builder::new_current_thread()
//!     .enable_all()
//!     .build()
//!     .unwrap();
//! let collector = Collector::new(MockRunner::healthy_fabric(), ExporterConfig::default());
//! let snapshot = runtime.block_on(collector.collect_cycle());
//! assert_eq!(snapshot.switch_counters.len(), 3);
//! ```

#[allow(clippy::module_inception)]
mod collector;
pub mod ibnetdiscover;
pub mod ibswinfo;
pub mod invocation;
pub mod mock;
pub mod perfquery;
pub mod pool;
pub mod ports;
pub mod switch_health;
pub mod traits;

pub use collector::{Collector, FabricSnapshot};
pub use mock::{MockResponse, MockRunner};
pub use pool::{CollectOutcome, CollectorStats};
pub use traits::{CommandRunner, RunError, SystemRunner};
