//! Configuration for the Consul recipes.
//!
//! Values are resolved in priority order:
//! 1. Hardcoded defaults (mirroring the Consul agent conventions)
//! 2. Optional TOML file pointed at by `CONSUL_RECIPES_CONFIG`
//! 3. Explicit override file passed to [`RecipesConfig::with_override_config`]
//! 4. Environment variables with the `CONSUL_RECIPES` prefix (highest priority,
//!    e.g. `CONSUL_RECIPES__WATCH__ALLOW_STALE=false`)

mod agent;
mod leader;
mod session;
mod watch;
pub use agent::*;
pub use leader::*;
pub use session::*;
pub use watch::*;

#[cfg(test)]
mod config_test;

use std::env;

use config::Config;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

pub(crate) const ENV_PREFIX: &str = "CONSUL_RECIPES";
pub(crate) const CONFIG_PATH_VAR: &str = "CONSUL_RECIPES_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipesConfig {
    /// Agent address and HTTP transport limits
    #[serde(default)]
    pub agent: AgentConfig,

    /// Long-poll watch engine settings
    #[serde(default)]
    pub watch: WatchConfig,

    /// TTL session settings
    #[serde(default)]
    pub session: SessionConfig,

    /// Leader election settings
    #[serde(default)]
    pub leader: LeaderConfig,
}

impl RecipesConfig {
    /// Loads configuration from the optional file named by
    /// `CONSUL_RECIPES_CONFIG` plus environment overrides.
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder();
        if let Ok(path) = env::var(CONFIG_PATH_VAR) {
            builder = builder.add_source(File::with_name(&path));
        }
        let merged = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?;

        let config: RecipesConfig = merged.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Merges an explicit TOML file on top of the current values. Environment
    /// variables still win over the file.
    pub fn with_override_config(
        self,
        path: &str,
    ) -> Result<Self> {
        let merged = Config::builder()
            .add_source(Config::try_from(&self)?)
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?;

        let config: RecipesConfig = merged.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.watch.recent_stats_window_ms < 1000 {
            return Err(ConfigError::Message(format!(
                "watch.recent_stats_window_ms needs to be at least 1 second. {}ms provided.",
                self.watch.recent_stats_window_ms
            ))
            .into());
        }
        if self.watch.initial_backoff_ms > self.watch.max_backoff_ms {
            return Err(ConfigError::Message(format!(
                "watch.initial_backoff_ms ({}) must not exceed watch.max_backoff_ms ({})",
                self.watch.initial_backoff_ms, self.watch.max_backoff_ms
            ))
            .into());
        }
        if self.session.ttl_seconds < 10 {
            return Err(ConfigError::Message(format!(
                "session.ttl_seconds must be at least 10 (Consul enforces a 10s minimum). {} provided.",
                self.session.ttl_seconds
            ))
            .into());
        }
        if self.agent.max_watched_endpoints == 0 {
            return Err(ConfigError::Message(
                "agent.max_watched_endpoints must be greater than zero".to_string(),
            )
            .into());
        }
        Ok(())
    }
}
