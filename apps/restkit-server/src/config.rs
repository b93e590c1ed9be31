use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

/// Server configuration, merged from defaults, an optional YAML file and
/// `RESTKIT_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8080,
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = config_path {
            figment = figment.merge(Yaml::file(path));
        }
        figment
            .merge(Env::prefixed("RESTKIT_"))
            .extract()
            .context("loading server configuration")
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }

    /// Effective configuration, pretty-printed for `check` / `--print-config`.
    pub fn render(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("rendering configuration")
    }
}
