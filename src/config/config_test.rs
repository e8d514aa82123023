use serial_test::serial;
use temp_env::with_vars;

use super::*;

fn cleanup_all_recipes_env_vars() {
    for (key, _) in std::env::vars() {
        if key.starts_with("CONSUL_RECIPES__") || key == CONFIG_PATH_VAR {
            std::env::remove_var(&key);
        }
    }
}

#[test]
#[serial]
fn default_config_should_initialize_with_hardcoded_values() {
    let config = RecipesConfig::default();

    assert_eq!(config.agent.address, "http://localhost:8500");
    assert_eq!(config.agent.max_watched_endpoints, 1000);
    assert_eq!(config.watch.wait, "5m");
    assert!(config.watch.allow_stale);
    assert_eq!(config.watch.initial_backoff_ms, 100);
    assert_eq!(config.watch.max_backoff_ms, 60_000);
    assert_eq!(config.session.ttl_seconds, 60);
    assert_eq!(config.session.lock_delay_seconds, 15);
    assert_eq!(config.leader.lock_delay_seconds, 16);
    assert_eq!(config.leader.lock_rescue_interval_seconds, 300);
    assert!(config.leader.node_id.is_none());
}

#[test]
#[serial]
fn new_should_merge_environment_overrides() {
    cleanup_all_recipes_env_vars();
    with_vars(
        vec![
            ("CONSUL_RECIPES__WATCH__ALLOW_STALE", Some("false")),
            ("CONSUL_RECIPES__AGENT__ADDRESS", Some("http://consul:8501")),
        ],
        || {
            let config = RecipesConfig::new().unwrap();

            assert!(!config.watch.allow_stale);
            assert_eq!(config.agent.address, "http://consul:8501");
            // untouched fields keep their defaults
            assert_eq!(config.watch.wait, "5m");
        },
    );
}

#[test]
#[serial]
fn with_override_config_should_merge_file_settings() {
    cleanup_all_recipes_env_vars();
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("recipes.toml");

    std::fs::write(
        &config_path,
        r#"
        [watch]
        initial_backoff_ms = 250

        [session]
        ttl_seconds = 30

        [leader]
        node_id = "node-7"
        "#,
    )
    .unwrap();

    let empty_vars: Vec<(&str, Option<&str>)> = vec![];
    with_vars(empty_vars, || {
        let config = RecipesConfig::default()
            .with_override_config(config_path.to_str().unwrap())
            .unwrap();

        assert_eq!(config.watch.initial_backoff_ms, 250);
        assert_eq!(config.session.ttl_seconds, 30);
        assert_eq!(config.leader.node_id.as_deref(), Some("node-7"));
        // untouched fields keep their defaults
        assert_eq!(config.watch.max_backoff_ms, 60_000);
    });
}

#[test]
#[serial]
fn validate_should_reject_sub_second_stats_window() {
    let mut config = RecipesConfig::default();
    config.watch.recent_stats_window_ms = 999;

    assert!(config.validate().is_err());
}

#[test]
#[serial]
fn validate_should_reject_inverted_backoff_range() {
    let mut config = RecipesConfig::default();
    config.watch.initial_backoff_ms = 60_001;

    assert!(config.validate().is_err());
}

#[test]
#[serial]
fn validate_should_reject_too_small_session_ttl() {
    let mut config = RecipesConfig::default();
    config.session.ttl_seconds = 5;

    assert!(config.validate().is_err());
}
