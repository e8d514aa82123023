//! Crate entry point binding the recipes to one shared agent transport.

use std::sync::Arc;

use crate::catalog_services_watcher;
use crate::catalog_service_instances_watcher;
use crate::health_service_instances_watcher;
use crate::ConsulTransport;
use crate::ConsulWatcher;
use crate::EndpointWatcher;
use crate::HttpTransport;
use crate::LeaderElector;
use crate::RecipesConfig;
use crate::Result;
use crate::ServiceInstances;
use crate::Services;
use crate::Session;

/// Factory for all the coordination recipes, sharing one transport and one
/// configuration.
///
/// Build it once per Consul agent and hand out watchers, sessions and
/// electors from it. Each recipe owns its background tasks; closing one does
/// not affect the others.
pub struct ConsulRecipes {
    transport: Arc<dyn ConsulTransport>,
    config: RecipesConfig,
}

impl ConsulRecipes {
    /// Validates the configuration and connects the HTTP transport to the
    /// configured agent.
    pub fn from_config(config: RecipesConfig) -> Result<Self> {
        config.validate()?;
        let transport = Arc::new(HttpTransport::new(&config.agent)?);
        Ok(Self { transport, config })
    }

    /// Same as [`from_config`](Self::from_config), with a caller-supplied
    /// transport. Mostly useful for tests.
    pub fn with_transport(
        config: RecipesConfig,
        transport: Arc<dyn ConsulTransport>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self { transport, config })
    }

    pub fn config(&self) -> &RecipesConfig {
        &self.config
    }

    /// A raw watch engine over the shared transport
    pub fn consul_watcher(&self) -> Result<ConsulWatcher> {
        ConsulWatcher::builder(self.transport.clone())
            .with_config(&self.config.watch)
            .build()
    }

    /// Watch over the full service catalog
    pub fn catalog_services_watcher(&self) -> Result<EndpointWatcher<Services>> {
        Ok(catalog_services_watcher(Arc::new(self.consul_watcher()?)))
    }

    /// Watch over the registered instances of one service
    pub fn catalog_service_instances_watcher(
        &self,
        service_name: &str,
    ) -> Result<EndpointWatcher<ServiceInstances>> {
        Ok(catalog_service_instances_watcher(
            service_name,
            Arc::new(self.consul_watcher()?),
        ))
    }

    /// Watch over the healthy instances of one service
    pub fn health_service_instances_watcher(
        &self,
        service_name: &str,
    ) -> Result<EndpointWatcher<ServiceInstances>> {
        Ok(health_service_instances_watcher(
            service_name,
            Arc::new(self.consul_watcher()?),
        ))
    }

    /// A TTL session named after the owning service. Call
    /// [`Session::start`] to create it on the agent.
    pub fn session(
        &self,
        name: impl Into<String>,
    ) -> Session {
        Session::new(name, self.transport.clone(), &self.config.session)
    }

    /// A leader elector for the named service
    pub fn leader_elector(
        &self,
        name: impl Into<String>,
    ) -> Result<LeaderElector> {
        LeaderElector::builder(name, self.transport.clone())
            .with_leader_config(&self.config.leader)
            .with_session_config(&self.config.session)
            .with_watch_config(&self.config.watch)
            .build()
    }
}

