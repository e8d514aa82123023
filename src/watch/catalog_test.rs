use super::catalog::decode_catalog_instances;
use super::catalog::decode_health_instances;
use super::catalog::decode_services;
use super::catalog::ServiceInstance;

#[test]
fn decode_services_should_map_names_to_tags() {
    let body = r#"{"consul": [], "orders": ["primary", "v2"]}"#;

    let services = decode_services(body).unwrap();

    assert_eq!(services.len(), 2);
    assert!(services.contains_service("orders"));
    assert_eq!(
        services.tags_for_service("orders"),
        Some(&["primary".to_string(), "v2".to_string()][..])
    );
    assert_eq!(services.tags_for_service("consul"), Some(&[][..]));
    assert_eq!(services.tags_for_service("missing"), None);
}

#[test]
fn decode_services_should_fail_on_malformed_json() {
    assert!(decode_services("not json").is_err());
}

#[test]
fn decode_catalog_instances_should_map_consul_fields() {
    let body = r#"[
        {
            "ServiceID": "orders-1",
            "ServiceTags": ["primary"],
            "ServiceAddress": "10.0.0.7",
            "ServicePort": 8080
        },
        {
            "ServiceID": "orders-2",
            "ServiceTags": null,
            "ServiceAddress": null,
            "ServicePort": null
        }
    ]"#;

    let instances = decode_catalog_instances("orders", body).unwrap();

    assert_eq!(instances.service_name, "orders");
    assert_eq!(
        instances.instances[0],
        ServiceInstance {
            service_id: "orders-1".to_string(),
            service_tags: vec!["primary".to_string()],
            service_address: Some("10.0.0.7".to_string()),
            service_port: Some(8080),
        }
    );
    assert_eq!(instances.instances[1].service_tags, Vec::<String>::new());
    assert_eq!(instances.instances[1].service_address, None);
}

#[test]
fn decode_health_instances_should_read_nested_service_object() {
    let body = r#"[
        {
            "Node": {"Node": "worker-3"},
            "Service": {
                "ID": "orders-1",
                "Tags": ["primary"],
                "Address": "10.0.0.7",
                "Port": 8080
            }
        }
    ]"#;

    let instances = decode_health_instances("orders", body).unwrap();

    assert_eq!(instances.instances.len(), 1);
    assert_eq!(instances.instances[0].service_id, "orders-1");
    assert_eq!(instances.instances[0].service_port, Some(8080));
}

#[test]
fn decode_health_instances_should_skip_entries_without_service_object() {
    let body = r#"[
        {"Node": {"Node": "worker-3"}},
        {
            "Service": {"ID": "orders-2", "Tags": [], "Address": null, "Port": 8081}
        }
    ]"#;

    let instances = decode_health_instances("orders", body).unwrap();

    assert_eq!(instances.instances.len(), 1);
    assert_eq!(instances.instances[0].service_id, "orders-2");
}
