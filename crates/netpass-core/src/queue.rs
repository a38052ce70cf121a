//! Lock-guarded hand-off queues between the orchestrator and its workers.
//!
//! Both queue types use swap-and-clear draining: the consumer takes the
//! whole backlog in one short critical section and processes it without
//! holding the lock. The lock is never held across a blocking call.
//!
//! ```text
//!   orchestrator ──submit──► [pending]  ──take_pending──► worker
//!   orchestrator ◄─drain──── [completed] ◄──complete───── worker
//! ```
//!
//! The pending and completed sides are guarded by separate locks so a
//! submission never waits behind a drain.
//!
//! Neither queue is bounded. The producer is either a human scanning tokens
//! or the orchestrator submitting at most one task per slot, so the backlog
//! stays small in practice.

use std::collections::VecDeque;
use std::mem;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A mutex-guarded FIFO with swap-and-clear draining.
#[derive(Debug)]
pub struct SwapQueue<T> {
    items: Mutex<VecDeque<T>>,
}

impl<T> SwapQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
        }
    }

    // Queue contents stay consistent even if a holder panicked mid-push,
    // so a poisoned lock is recovered rather than propagated.
    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an item at the back of the queue.
    pub fn push(&self, item: T) {
        self.lock().push_back(item);
    }

    /// Take every queued item in submission order, leaving the queue empty.
    ///
    /// Returns an empty vector when nothing is queued.
    ///
    /// # Examples
    ///
    /// ```
    /// use netpass_core::SwapQueue;
    ///
    /// let queue = SwapQueue::new();
    /// queue.push(1);
    /// queue.push(2);
    /// assert_eq!(queue.drain(), vec![1, 2]);
    /// assert!(queue.drain().is_empty());
    /// ```
    pub fn drain(&self) -> Vec<T> {
        let taken = mem::take(&mut *self.lock());
        Vec::from(taken)
    }

    /// Put items back at the front of the queue, ahead of anything pushed
    /// since they were drained, keeping their relative order.
    pub fn requeue(&self, items: Vec<T>) {
        let mut queue = self.lock();
        for item in items.into_iter().rev() {
            queue.push_front(item);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl<T> Default for SwapQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Pending and completed request containers shared with a worker.
///
/// `P` is the request type submitted by the orchestrator, `C` the completed
/// type pushed back by the worker.
#[derive(Debug)]
pub struct TaskQueue<P, C> {
    pending: SwapQueue<P>,
    completed: SwapQueue<C>,
}

impl<P, C> TaskQueue<P, C> {
    pub fn new() -> Self {
        Self {
            pending: SwapQueue::new(),
            completed: SwapQueue::new(),
        }
    }

    /// Queue a request for the worker. Never blocks beyond lock acquisition.
    pub fn submit(&self, request: P) {
        self.pending.push(request);
    }

    /// Take every pending request, in submission order.
    pub fn take_pending(&self) -> Vec<P> {
        self.pending.drain()
    }

    /// Return requests taken with [`take_pending`](Self::take_pending) but
    /// not started. They run before anything submitted since.
    pub fn requeue_pending(&self, requests: Vec<P>) {
        if !requests.is_empty() {
            self.pending.requeue(requests);
        }
    }

    /// Hand a finished request back to the orchestrator.
    pub fn complete(&self, completed: C) {
        self.completed.push(completed);
    }

    /// Take every completed request, in completion order.
    ///
    /// Non-blocking; returns an empty vector when nothing is ready.
    pub fn drain_completed(&self) -> Vec<C> {
        self.completed.drain()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn completed_len(&self) -> usize {
        self.completed.len()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

impl<P, C> Default for TaskQueue<P, C> {
    fn default() -> Self {
        Self::new()
    }
}
