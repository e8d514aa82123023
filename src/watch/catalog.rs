//! Typed watches over the Consul catalog and health endpoints.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::error;

use super::EndpointWatcher;
use crate::ConsulWatcher;
use crate::DecodeError;
use crate::Result;

/// Service names and their tags, as returned by `/v1/catalog/services`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Services {
    names_to_tags: HashMap<String, Vec<String>>,
}

impl Services {
    pub fn new(names_to_tags: HashMap<String, Vec<String>>) -> Self {
        Self { names_to_tags }
    }

    pub fn contains_service(
        &self,
        service_name: &str,
    ) -> bool {
        self.names_to_tags.contains_key(service_name)
    }

    pub fn tags_for_service(
        &self,
        service_name: &str,
    ) -> Option<&[String]> {
        self.names_to_tags.get(service_name).map(Vec::as_slice)
    }

    pub fn service_names(&self) -> impl Iterator<Item = &str> {
        self.names_to_tags.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names_to_tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names_to_tags.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInstance {
    pub service_id: String,
    pub service_tags: Vec<String>,
    pub service_address: Option<String>,
    pub service_port: Option<u16>,
}

/// All known instances of one service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInstances {
    pub service_name: String,
    pub instances: Vec<ServiceInstance>,
}

pub fn decode_services(body: &str) -> Result<Services> {
    let names_to_tags: HashMap<String, Vec<String>> =
        serde_json::from_str(body).map_err(DecodeError::from)?;
    Ok(Services::new(names_to_tags))
}

pub fn decode_catalog_instances(
    service_name: &str,
    body: &str,
) -> Result<ServiceInstances> {
    #[derive(Deserialize)]
    struct CatalogEntry {
        #[serde(rename = "ServiceID")]
        service_id: String,
        #[serde(rename = "ServiceTags")]
        service_tags: Option<Vec<String>>,
        #[serde(rename = "ServiceAddress")]
        service_address: Option<String>,
        #[serde(rename = "ServicePort")]
        service_port: Option<u16>,
    }

    let entries: Vec<CatalogEntry> = serde_json::from_str(body).map_err(DecodeError::from)?;
    let instances = entries
        .into_iter()
        .map(|entry| ServiceInstance {
            service_id: entry.service_id,
            service_tags: entry.service_tags.unwrap_or_default(),
            service_address: entry.service_address,
            service_port: entry.service_port,
        })
        .collect();
    Ok(ServiceInstances {
        service_name: service_name.to_string(),
        instances,
    })
}

/// Health entries whose nested `Service` object is missing are logged and
/// skipped rather than failing the whole result.
pub fn decode_health_instances(
    service_name: &str,
    body: &str,
) -> Result<ServiceInstances> {
    #[derive(Deserialize)]
    struct HealthEntry {
        #[serde(rename = "Service")]
        service: Option<HealthService>,
    }

    #[derive(Deserialize)]
    struct HealthService {
        #[serde(rename = "ID")]
        id: String,
        #[serde(rename = "Tags")]
        tags: Option<Vec<String>>,
        #[serde(rename = "Address")]
        address: Option<String>,
        #[serde(rename = "Port")]
        port: Option<u16>,
    }

    let entries: Vec<HealthEntry> = serde_json::from_str(body).map_err(DecodeError::from)?;
    let instances = entries
        .into_iter()
        .filter_map(|entry| match entry.service {
            Some(service) => Some(ServiceInstance {
                service_id: service.id,
                service_tags: service.tags.unwrap_or_default(),
                service_address: service.address,
                service_port: service.port,
            }),
            None => {
                error!(service_name, "health entry without Service object, skipping");
                None
            }
        })
        .collect();
    Ok(ServiceInstances {
        service_name: service_name.to_string(),
        instances,
    })
}

/// Watch over the full service catalog
pub fn catalog_services_watcher(watcher: Arc<ConsulWatcher>) -> EndpointWatcher<Services> {
    EndpointWatcher::new("/v1/catalog/services", watcher, decode_services)
}

/// Watch over the catalog entry of one service
pub fn catalog_service_instances_watcher(
    service_name: &str,
    watcher: Arc<ConsulWatcher>,
) -> EndpointWatcher<ServiceInstances> {
    let endpoint = format!("/v1/catalog/service/{service_name}");
    let service_name = service_name.to_string();
    EndpointWatcher::new(endpoint, watcher, move |body| {
        decode_catalog_instances(&service_name, body)
    })
}

/// Watch over the healthy (`passing=true`) instances of one service
pub fn health_service_instances_watcher(
    service_name: &str,
    watcher: Arc<ConsulWatcher>,
) -> EndpointWatcher<ServiceInstances> {
    let endpoint = format!("/v1/health/service/{service_name}?passing=true");
    let service_name = service_name.to_string();
    EndpointWatcher::new(endpoint, watcher, move |body| {
        decode_health_instances(&service_name, body)
    })
}
