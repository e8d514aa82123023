use super::poll::PollState;
use super::poll::Reconciled;

#[test]
fn first_response_should_dispatch_even_with_empty_body() {
    let mut state = PollState::new();

    let outcome = state.reconcile(Some(5), Vec::new());

    assert_eq!(
        outcome,
        Reconciled::Dispatch {
            index: 5,
            body: Vec::new()
        }
    );
    assert_eq!(state.current_index(), 5);
}

#[test]
fn same_index_should_not_dispatch() {
    let mut state = PollState::new();
    state.reconcile(Some(5), b"A".to_vec());

    let outcome = state.reconcile(Some(5), b"A".to_vec());

    assert_eq!(outcome, Reconciled::IndexUnchanged);
    assert_eq!(state.current_index(), 5);
}

#[test]
fn advanced_index_with_identical_body_should_not_dispatch() {
    let mut state = PollState::new();
    state.reconcile(Some(5), b"A".to_vec());

    let outcome = state.reconcile(Some(9), b"A".to_vec());

    assert_eq!(outcome, Reconciled::ContentUnchanged);
    assert_eq!(state.current_index(), 9);
}

#[test]
fn advanced_index_with_new_body_should_dispatch() {
    let mut state = PollState::new();
    state.reconcile(Some(5), b"A".to_vec());

    let outcome = state.reconcile(Some(9), b"B".to_vec());

    assert_eq!(
        outcome,
        Reconciled::Dispatch {
            index: 9,
            body: b"B".to_vec()
        }
    );
}

#[test]
fn lower_index_should_reset_tracked_index_to_zero() {
    let mut state = PollState::new();
    state.reconcile(Some(9), b"A".to_vec());

    let outcome = state.reconcile(Some(3), b"B".to_vec());

    assert_eq!(
        outcome,
        Reconciled::IndexReset {
            previous: 9,
            received: 3
        }
    );
    assert_eq!(state.current_index(), 0);
}

#[test]
fn missing_index_should_not_touch_state() {
    let mut state = PollState::new();
    state.reconcile(Some(9), b"A".to_vec());

    let outcome = state.reconcile(None, b"B".to_vec());

    assert_eq!(outcome, Reconciled::MissingIndex);
    assert_eq!(state.current_index(), 9);
}

#[test]
fn failure_should_reset_index_and_advance_retry_counter() {
    let mut state = PollState::new();
    state.reconcile(Some(9), b"A".to_vec());

    assert_eq!(state.poll_failed(), 0);
    assert_eq!(state.current_index(), 0);
    assert_eq!(state.poll_failed(), 1);
    assert_eq!(state.poll_failed(), 2);

    state.poll_succeeded();
    assert_eq!(state.poll_failed(), 0);
}

#[test]
fn retry_counter_should_saturate() {
    let mut state = PollState::new();
    for _ in 0..5 {
        state.poll_failed();
    }
    assert_eq!(state.poll_failed(), 5);
}
