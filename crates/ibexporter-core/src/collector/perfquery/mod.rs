//! `perfquery` port counters.

mod parser;

pub use parser::{counter_field, parse_counters};
