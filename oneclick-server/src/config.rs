//! Deploy service configuration

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to
    pub bind_addr: String,

    /// Number of deployment records kept in memory
    pub history_limit: usize,
}

impl ServerConfig {
    pub fn new() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            history_limit: 100,
        }
    }

    /// Reads ONECLICK_BIND_ADDR and ONECLICK_HISTORY_LIMIT
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::new();

        if let Ok(addr) = std::env::var("ONECLICK_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(limit) = std::env::var("ONECLICK_HISTORY_LIMIT") {
            config.history_limit = limit
                .parse()
                .context("ONECLICK_HISTORY_LIMIT must be a positive integer")?;
        }

        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }
        if self.history_limit == 0 {
            anyhow::bail!("history_limit must be greater than 0");
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}
