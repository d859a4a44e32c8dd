//! Command lines of the InfiniBand diagnostic tools.

use std::fmt;

use crate::config::{IbnetdiscoverConfig, IbswinfoConfig, PerfqueryConfig};

/// A fully built command: program plus arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: String,
    pub args: Vec<String>,
}

impl Invocation {
    /// Starts a command for `path`, wrapped in `sudo` when requested.
    fn tool(path: &str, sudo: bool) -> Self {
        if sudo {
            Self {
                command: "sudo".to_string(),
                args: vec![path.to_string()],
            }
        } else {
            Self {
                command: path.to_string(),
                args: Vec::new(),
            }
        }
    }

    fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// `ibnetdiscover --ports [--node-name-map <file>]`
    pub fn ibnetdiscover(config: &IbnetdiscoverConfig, sudo: bool) -> Self {
        let mut inv = Self::tool(&config.path, sudo).arg("--ports");
        if let Some(map) = &config.node_name_map
            && !map.as_os_str().is_empty()
        {
            inv = inv
                .arg("--node-name-map")
                .arg(map.to_string_lossy().into_owned());
        }
        inv
    }

    /// `perfquery <extra...> -G <guid> <ports>`
    pub fn perfquery(
        config: &PerfqueryConfig,
        sudo: bool,
        extra: &[&str],
        guid: &str,
        ports: &str,
    ) -> Self {
        let mut inv = Self::tool(&config.path, sudo);
        inv.args.extend(extra.iter().map(|a| a.to_string()));
        inv.arg("-G").arg(guid).arg(ports)
    }

    /// `ibswinfo -d lid-<LID>`
    pub fn ibswinfo(config: &IbswinfoConfig, sudo: bool, lid: &str) -> Self {
        Self::tool(&config.path, sudo)
            .arg("-d")
            .arg(format!("lid-{}", lid))
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
