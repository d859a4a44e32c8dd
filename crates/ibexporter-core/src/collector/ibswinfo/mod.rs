//! `ibswinfo` switch hardware health.

mod parser;

pub use parser::{SwitchInfoError, parse_switch_info};
