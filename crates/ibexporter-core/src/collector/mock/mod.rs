//! Mock command runner and captured tool output for tests.

mod runner;
pub mod scenarios;

pub use runner::{MockResponse, MockRunner};
