use std::cmp::Ordering;

/// Sentinel distinct from any legitimate body, including an empty one, so the
/// very first response always counts as a content change.
const INITIAL_CONTENT: [u8; 1] = [0];

/// What one reconciled long-poll response means for the watch
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Reconciled {
    /// Index advanced and the body differs from the last dispatched one
    Dispatch { index: u64, body: Vec<u8> },
    /// Index advanced but the body is byte-identical to the last one
    ContentUnchanged,
    /// The agent answered with the index we already hold (wait timeout)
    IndexUnchanged,
    /// The agent reported an index lower than the one we hold; tracked index
    /// drops to 0 so the next poll fetches latest state
    IndexReset { previous: u64, received: u64 },
    /// 2xx response without a usable consistency index; the body cannot be
    /// trusted
    MissingIndex,
}

/// Per-watch poll state. Owned exclusively by one watch loop: the next request
/// is not issued until the previous response finished reconciling, so no
/// locking is needed.
#[derive(Debug)]
pub(crate) struct PollState {
    current_index: u64,
    last_content: Vec<u8>,
    retry_count: u32,
}

impl PollState {
    pub(crate) fn new() -> Self {
        Self {
            current_index: 0,
            last_content: INITIAL_CONTENT.to_vec(),
            retry_count: 0,
        }
    }

    pub(crate) fn current_index(&self) -> u64 {
        self.current_index
    }

    pub(crate) fn reconcile(
        &mut self,
        index: Option<u64>,
        body: Vec<u8>,
    ) -> Reconciled {
        let Some(new_index) = index else {
            return Reconciled::MissingIndex;
        };

        match new_index.cmp(&self.current_index) {
            Ordering::Equal => Reconciled::IndexUnchanged,
            Ordering::Less => {
                let previous = self.current_index;
                self.current_index = 0;
                Reconciled::IndexReset {
                    previous,
                    received: new_index,
                }
            }
            Ordering::Greater => {
                self.current_index = new_index;
                if self.last_content == body {
                    Reconciled::ContentUnchanged
                } else {
                    self.last_content = body.clone();
                    Reconciled::Dispatch {
                        index: new_index,
                        body,
                    }
                }
            }
        }
    }

    /// Called after any successfully reconciled response; clears the retry
    /// counter so the next failure starts backoff from the beginning.
    pub(crate) fn poll_succeeded(&mut self) {
        self.retry_count = 0;
    }

    /// Called on any failed poll. Drops the tracked index to 0 and returns the
    /// retry counter to key the backoff with, post-incrementing it.
    pub(crate) fn poll_failed(&mut self) -> u32 {
        self.current_index = 0;
        let retry = self.retry_count;
        self.retry_count = self.retry_count.saturating_add(1);
        retry
    }
}
