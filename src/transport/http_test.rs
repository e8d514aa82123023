use crate::AgentConfig;
use crate::BlockingQuery;
use crate::HttpTransport;

fn transport() -> HttpTransport {
    HttpTransport::new(&AgentConfig::default()).unwrap()
}

#[test]
fn blocking_url_should_carry_wait_stale_and_index() {
    let url = transport()
        .blocking_url(
            "/v1/catalog/services",
            &BlockingQuery {
                index: 42,
                wait: "5m".to_string(),
                allow_stale: true,
            },
        )
        .unwrap();

    assert_eq!(
        url.as_str(),
        "http://localhost:8500/v1/catalog/services?wait=5m&stale=&index=42"
    );
}

#[test]
fn blocking_url_should_omit_stale_when_consistency_required() {
    let url = transport()
        .blocking_url(
            "/v1/catalog/services",
            &BlockingQuery {
                index: 0,
                wait: "5m".to_string(),
                allow_stale: false,
            },
        )
        .unwrap();

    assert_eq!(
        url.as_str(),
        "http://localhost:8500/v1/catalog/services?wait=5m&index=0"
    );
}

#[test]
fn blocking_url_should_keep_existing_query_parameters() {
    let url = transport()
        .blocking_url(
            "/v1/health/service/orders?passing=true",
            &BlockingQuery {
                index: 7,
                wait: "5m".to_string(),
                allow_stale: true,
            },
        )
        .unwrap();

    assert_eq!(
        url.as_str(),
        "http://localhost:8500/v1/health/service/orders?passing=true&wait=5m&stale=&index=7"
    );
}

#[test]
fn new_should_reject_malformed_agent_address() {
    let config = AgentConfig {
        address: "not a url".to_string(),
        ..AgentConfig::default()
    };

    assert!(HttpTransport::new(&config).is_err());
}
