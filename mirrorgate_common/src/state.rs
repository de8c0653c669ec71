use std::{net::SocketAddr, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    error::Result,
    proxy::{fetcher::Fetcher, util::parse_origin},
    rewriting::text::url_rewriter::UrlRewriter,
};

/// Environment variable that overrides the listening port.
pub const PORT_ENV: &str = "PORT";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("PORT must be a port number, got {0:?}")]
    InvalidPort(String),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The listen address for the proxy server
    pub host: SocketAddr,
    /// The upstream site every request under `/proxy` is forwarded to, e.g. `https://movies.do`
    pub origin: String,
    /// How many redirects the fetch layer follows before it gives up
    pub max_redirects: usize,
    /// Upper bound for a single upstream request, in seconds. Unset means the transport default.
    pub timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: SocketAddr::from(([0, 0, 0, 0], 3000)),
            origin: "https://movies.do".to_string(),
            max_redirects: 5,
            timeout_secs: None,
        }
    }
}

impl Config {
    /// Apply `PORT` from the environment on top of the loaded configuration.
    pub fn with_env_overrides(self) -> std::result::Result<Self, ConfigError> {
        self.with_port_override(std::env::var(PORT_ENV).ok())
    }

    fn with_port_override(
        mut self,
        port: Option<String>,
    ) -> std::result::Result<Self, ConfigError> {
        if let Some(port) = port {
            let parsed = port
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(port.clone()))?;
            self.host.set_port(parsed);
        }

        Ok(self)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Clone)]
/// The state that is passed to the proxy handler
pub struct ProxyState {
    pub fetcher: Fetcher,
    pub rewriter: Arc<UrlRewriter>,
}

impl ProxyState {
    /// Parse the upstream origin and compile the rewrite rules. Both are fixed from here on.
    pub fn new(config: &Config) -> Result<Self> {
        let origin = parse_origin(&config.origin)?;

        let rewriter = Arc::new(UrlRewriter::new(&origin)?);
        let fetcher = Fetcher::new(origin, config)?;

        Ok(Self {
            fetcher,
            rewriter,
        })
    }
}
