use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::api::Econet300Api;
use crate::cache::MemCache;
use crate::client::EconetClient;
use crate::{Error, Result};

/// Connection settings handed over by the host platform.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Controller address, with or without scheme.
    pub host: String,

    pub username: String,

    pub password: String,

    #[serde(default = "default_update_interval")]
    pub update_interval_secs: u64,

    /// Mixer circuits probed during fan-out.
    #[serde(default = "default_mixers")]
    pub mixers: usize,

    /// ecoSTER room thermostats probed during fan-out.
    #[serde(default = "default_ecosters")]
    pub ecosters: usize,
}

fn default_update_interval() -> u64 {
    60
}
fn default_mixers() -> usize {
    4
}
fn default_ecosters() -> usize {
    3
}

impl Config {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
            update_interval_secs: default_update_interval(),
            mixers: default_mixers(),
            ecosters: default_ecosters(),
        }
    }

    /// Parse and validate the host's config blob.
    pub fn from_json(value: Value) -> Result<Self> {
        let config: Config =
            serde_json::from_value(value).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::InvalidConfig("host is empty".to_string()));
        }
        if self.update_interval_secs == 0 {
            return Err(Error::InvalidConfig(
                "update_interval_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    pub fn client(&self) -> Result<EconetClient> {
        EconetClient::builder(&self.host)
            .credentials(&self.username, &self.password)
            .build()
    }

    /// Build the client and api and read the device identity.
    pub async fn connect(&self) -> Result<Econet300Api> {
        self.validate()?;
        Econet300Api::create(self.client()?, Arc::new(MemCache::new())).await
    }
}
