//! Shared queue of candidates waiting for a worker.
//!
//! Candidates are ordered by the instant they become ready, then by
//! insertion. Workers park on a [`Notify`] until either a push arrives or the
//! earliest candidate becomes ready, so backoff costs no CPU.
//!
//! The frontier counts candidates handed out but not yet completed. Once it
//! is empty with nothing in flight, no further work can appear and every
//! waiting worker is released with `None`.

use super::node::Node;
use parking_lot::Mutex;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use tokio::sync::Notify;
use tokio::time::Instant;

struct Entry {
    ready_at: Instant,
    seq: u64,
    node: Node,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.ready_at, self.seq).cmp(&(other.ready_at, other.seq))
    }
}

#[derive(Default)]
struct State {
    heap: BinaryHeap<Reverse<Entry>>,
    next_seq: u64,
    in_flight: usize,
    closed: bool,
}

impl State {
    fn is_exhausted(&self) -> bool {
        self.heap.is_empty() && self.in_flight == 0
    }
}

/// Delay-ordered candidate queue with in-flight accounting.
#[derive(Default)]
pub struct Frontier {
    state: Mutex<State>,
    notify: Notify,
}

impl Frontier {
    /// Empty, open frontier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `node`, ready at its retry time. Returns `false` once closed.
    pub fn push(&self, node: Node) -> bool {
        {
            let mut state = self.state.lock();
            if state.closed {
                return false;
            }
            let seq = state.next_seq;
            state.next_seq += 1;
            state.heap.push(Reverse(Entry {
                ready_at: node.ready_at().unwrap_or_else(Instant::now),
                seq,
                node,
            }));
        }
        self.notify.notify_waiters();
        true
    }

    /// Wait for the next ready candidate.
    ///
    /// Returns `None` once the frontier is closed or exhausted. Every
    /// `Some` must be paired with a [`complete`](Self::complete) call.
    pub async fn pop(&self) -> Option<Node> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before inspecting state so a push in between is not lost.
            notified.as_mut().enable();

            let wake_at = {
                let mut state = self.state.lock();
                if state.closed {
                    return None;
                }
                if state.is_exhausted() {
                    state.closed = true;
                    drop(state);
                    self.notify.notify_waiters();
                    return None;
                }

                match state.heap.peek().map(|Reverse(entry)| entry.ready_at) {
                    Some(ready_at) if ready_at <= Instant::now() => {
                        if let Some(Reverse(entry)) = state.heap.pop() {
                            state.in_flight += 1;
                            return Some(entry.node);
                        }
                        None
                    }
                    next => next,
                }
            };

            match wake_at {
                Some(deadline) => {
                    tokio::select! {
                        _ = &mut notified => {}
                        _ = tokio::time::sleep_until(deadline) => {}
                    }
                }
                None => notified.await,
            }
        }
    }

    /// Mark one popped candidate as finished. Any re-push for it must
    /// happen before this call.
    pub fn complete(&self) {
        let exhausted = {
            let mut state = self.state.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
            state.is_exhausted()
        };
        if exhausted {
            self.notify.notify_waiters();
        }
    }

    /// Refuse further pushes, drop queued candidates and release waiters.
    pub fn close(&self) {
        {
            let mut state = self.state.lock();
            state.closed = true;
            state.heap.clear();
        }
        self.notify.notify_waiters();
    }

    /// Queued candidates.
    pub fn len(&self) -> usize {
        self.state.lock().heap.len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Candidates popped but not completed.
    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight
    }
}
