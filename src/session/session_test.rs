use std::sync::Arc;
use std::time::Duration;

use mockall::Sequence;
use tokio::time::sleep;

use crate::Error;
use crate::MockConsulTransport;
use crate::QueryResponse;
use crate::Session;
use crate::SessionConfig;
use crate::SessionError;

fn response(
    status: u16,
    body: &str,
) -> QueryResponse {
    QueryResponse {
        status,
        index: None,
        body: body.as_bytes().to_vec(),
    }
}

fn config() -> SessionConfig {
    SessionConfig {
        ttl_seconds: 60,
        lock_delay_seconds: 15,
    }
}

fn expect_create(
    mock: &mut MockConsulTransport,
    sequence: &mut Sequence,
    id: &str,
) {
    let reply = format!(r#"{{"ID": "{id}"}}"#);
    mock.expect_put()
        .withf(|path, query, body| {
            path == "/v1/session/create"
                && query.is_empty()
                && serde_json::from_slice::<serde_json::Value>(body).is_ok_and(|payload| {
                    payload["Name"] == "orders"
                        && payload["LockDelay"] == "15s"
                        && payload["TTL"] == "60s"
                })
        })
        .times(1)
        .in_sequence(sequence)
        .returning(move |_, _, _| Ok(response(200, &reply)));
}

#[tokio::test]
async fn current_id_should_fail_before_first_creation() {
    let session = Session::new("orders", Arc::new(MockConsulTransport::new()), &config());

    assert!(matches!(
        session.current_id(),
        Err(Error::Session(SessionError::Uninitialized))
    ));
}

#[tokio::test]
async fn recreate_should_store_the_returned_id() {
    let mut mock = MockConsulTransport::new();
    let mut sequence = Sequence::new();
    expect_create(&mut mock, &mut sequence, "s-1");

    let session = Session::new("orders", Arc::new(mock), &config());
    session.inner().recreate().await;

    assert_eq!(session.current_id().unwrap(), "s-1");
}

#[tokio::test]
async fn failed_creation_should_leave_the_id_absent() {
    let mut mock = MockConsulTransport::new();
    mock.expect_put()
        .times(1)
        .returning(|_, _, _| Ok(response(500, "agent unavailable")));

    let session = Session::new("orders", Arc::new(mock), &config());
    session.inner().recreate().await;

    assert!(session.current_id().is_err());
}

#[tokio::test]
async fn renew_should_keep_the_id_on_success() {
    let mut mock = MockConsulTransport::new();
    let mut sequence = Sequence::new();
    expect_create(&mut mock, &mut sequence, "s-1");
    mock.expect_put()
        .withf(|path, _, _| path == "/v1/session/renew/s-1")
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_, _, _| Ok(response(200, "{}")));

    let session = Session::new("orders", Arc::new(mock), &config());
    session.inner().recreate().await;
    session.inner().renew_once().await;

    assert_eq!(session.current_id().unwrap(), "s-1");
}

#[tokio::test]
async fn renew_404_should_recreate_the_session() {
    let mut mock = MockConsulTransport::new();
    let mut sequence = Sequence::new();
    expect_create(&mut mock, &mut sequence, "s-1");
    mock.expect_put()
        .withf(|path, _, _| path == "/v1/session/renew/s-1")
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_, _, _| Ok(response(404, "session expired")));
    expect_create(&mut mock, &mut sequence, "s-2");

    let session = Session::new("orders", Arc::new(mock), &config());
    session.inner().recreate().await;
    session.inner().renew_once().await;

    assert_eq!(session.current_id().unwrap(), "s-2");
}

#[tokio::test]
async fn renew_other_failures_should_keep_the_id() {
    let mut mock = MockConsulTransport::new();
    let mut sequence = Sequence::new();
    expect_create(&mut mock, &mut sequence, "s-1");
    mock.expect_put()
        .withf(|path, _, _| path == "/v1/session/renew/s-1")
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_, _, _| Ok(response(500, "internal")));

    let session = Session::new("orders", Arc::new(mock), &config());
    session.inner().recreate().await;
    session.inner().renew_once().await;

    assert_eq!(session.current_id().unwrap(), "s-1");
}

#[tokio::test]
async fn renew_without_a_session_should_create_one() {
    let mut mock = MockConsulTransport::new();
    let mut sequence = Sequence::new();
    expect_create(&mut mock, &mut sequence, "s-1");

    let session = Session::new("orders", Arc::new(mock), &config());
    session.inner().renew_once().await;

    assert_eq!(session.current_id().unwrap(), "s-1");
}

#[tokio::test]
async fn close_should_destroy_the_session() {
    let mut mock = MockConsulTransport::new();
    let mut sequence = Sequence::new();
    expect_create(&mut mock, &mut sequence, "s-1");
    mock.expect_put()
        .withf(|path, _, _| path == "/v1/session/destroy/s-1")
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_, _, _| Ok(response(200, "true")));

    let session = Session::new("orders", Arc::new(mock), &config());
    session.inner().recreate().await;
    session.close().await;
}

#[tokio::test]
async fn close_without_a_session_should_not_call_the_agent() {
    // no expectations: any call would panic the mock
    let session = Session::new("orders", Arc::new(MockConsulTransport::new()), &config());
    session.close().await;
}

#[tokio::test(start_paused = true)]
async fn started_session_should_renew_on_the_ttl_cadence() {
    let mut mock = MockConsulTransport::new();
    let mut sequence = Sequence::new();
    expect_create(&mut mock, &mut sequence, "s-1");
    mock.expect_put()
        .withf(|path, _, _| path == "/v1/session/renew/s-1")
        .times(2)
        .in_sequence(&mut sequence)
        .returning(|_, _, _| Ok(response(200, "{}")));
    mock.expect_put()
        .withf(|path, _, _| path == "/v1/session/destroy/s-1")
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_, _, _| Ok(response(200, "true")));

    let session = Session::new("orders", Arc::new(mock), &config());
    session.start().await;

    // ttl 60s renews every 58s
    sleep(Duration::from_secs(58 * 2 + 1)).await;
    session.close().await;
}

#[tokio::test(start_paused = true)]
async fn refresh_should_replace_the_session() {
    let mut mock = MockConsulTransport::new();
    let mut sequence = Sequence::new();
    expect_create(&mut mock, &mut sequence, "s-1");
    expect_create(&mut mock, &mut sequence, "s-2");
    mock.expect_put()
        .withf(|path, _, _| path == "/v1/session/destroy/s-2")
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_, _, _| Ok(response(200, "true")));

    let session = Session::new("orders", Arc::new(mock), &config());
    session.start().await;

    session.refresh().await;
    sleep(Duration::from_millis(10)).await;
    assert_eq!(session.current_id().unwrap(), "s-2");

    session.close().await;
}

#[test]
fn renew_interval_should_clamp_to_one_second() {
    let transport = || Arc::new(MockConsulTransport::new());
    let interval = |ttl_seconds| {
        Session::new(
            "orders",
            transport(),
            &SessionConfig {
                ttl_seconds,
                lock_delay_seconds: 15,
            },
        )
        .inner()
        .renew_interval()
    };

    assert_eq!(interval(60), Duration::from_secs(58));
    assert_eq!(interval(3), Duration::from_secs(1));
    assert_eq!(interval(2), Duration::from_secs(1));
    assert_eq!(interval(0), Duration::from_secs(1));
}
