use std::sync::Arc;

use crate::ConsulRecipes;
use crate::MockConsulTransport;
use crate::RecipesConfig;

fn recipes() -> ConsulRecipes {
    ConsulRecipes::with_transport(
        RecipesConfig::default(),
        Arc::new(MockConsulTransport::new()),
    )
    .unwrap()
}

#[test]
fn should_reject_invalid_configuration() {
    let mut config = RecipesConfig::default();
    config.watch.initial_backoff_ms = 10_000;
    config.watch.max_backoff_ms = 100;

    assert!(ConsulRecipes::with_transport(
        config,
        Arc::new(MockConsulTransport::new())
    )
    .is_err());
}

#[test]
fn typed_watchers_should_target_the_documented_endpoints() {
    let recipes = recipes();

    assert_eq!(
        recipes.catalog_services_watcher().unwrap().endpoint(),
        "/v1/catalog/services"
    );
    assert_eq!(
        recipes
            .catalog_service_instances_watcher("billing")
            .unwrap()
            .endpoint(),
        "/v1/catalog/service/billing"
    );
    assert_eq!(
        recipes
            .health_service_instances_watcher("billing")
            .unwrap()
            .endpoint(),
        "/v1/health/service/billing?passing=true"
    );
}

#[test]
fn session_should_carry_the_configured_name() {
    assert_eq!(recipes().session("billing").name(), "billing");
}

#[test]
fn elector_should_use_the_configured_node_id() {
    let mut config = RecipesConfig::default();
    config.leader.node_id = Some("node-42".to_string());
    let recipes =
        ConsulRecipes::with_transport(config, Arc::new(MockConsulTransport::new())).unwrap();

    assert_eq!(
        recipes.leader_elector("billing").unwrap().node_id(),
        "node-42"
    );
}
