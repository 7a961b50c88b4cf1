//! Single-slot observable state shared by the session and modal stores.
//!
//! A `StateCell` holds exactly one value. Subscribers get the current value on
//! subscription and then every later transition, in mutation order, exactly once.
//! Notification happens while the cell lock is held, so two writers can never
//! interleave their deliveries.

use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, error::TryRecvError};

struct Inner<T> {
    value: T,
    subscribers: Vec<UnboundedSender<T>>,
}

impl<T: Clone> Inner<T> {
    fn notify(&mut self) {
        let current = &self.value;
        self.subscribers.retain(|tx| tx.send(current.clone()).is_ok());
    }
}

pub struct StateCell<T> {
    inner: Mutex<Inner<T>>,
}

impl<T: Clone + PartialEq> StateCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(Inner {
                value,
                subscribers: Vec::new(),
            }),
        }
    }

    // Values are plain data; a panic elsewhere cannot leave them half-written.
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self) -> T {
        self.lock().value.clone()
    }

    /// Registers a subscriber. The returned handle yields the current value first.
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        // Cannot fail: the receiver is still in scope.
        let _ = tx.send(inner.value.clone());
        inner.subscribers.push(tx);
        Subscription { receiver: rx }
    }

    /// Stores `value` and notifies every live subscriber.
    pub fn replace(&self, value: T) {
        let mut inner = self.lock();
        inner.value = value;
        inner.notify();
    }

    /// Like `replace`, but a write equal to the current value is not a transition.
    /// Returns whether the value changed.
    pub fn replace_if_changed(&self, value: T) -> bool {
        let mut inner = self.lock();
        if inner.value == value {
            return false;
        }
        inner.value = value;
        inner.notify();
        true
    }

    /// Applies `f` to the current value and stores the result if it differs.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> bool {
        let mut inner = self.lock();
        let next = f(&inner.value);
        if inner.value == next {
            return false;
        }
        inner.value = next;
        inner.notify();
        true
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        let mut inner = self.lock();
        inner.subscribers.retain(|tx| !tx.is_closed());
        inner.subscribers.len()
    }
}

/// Subscription
///
/// Handle for one registered listener. Dropping it unsubscribes; the cell prunes the
/// slot on its next notification.
pub struct Subscription<T> {
    receiver: UnboundedReceiver<T>,
}

impl<T> Subscription<T> {
    /// Waits for the next value. `None` once the owning store is gone.
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    /// Returns the next pending value without waiting.
    pub fn try_recv(&mut self) -> Option<T> {
        match self.receiver.try_recv() {
            Ok(value) => Some(value),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Drains every pending value, oldest first.
    pub fn drain(&mut self) -> Vec<T> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    pub fn unsubscribe(mut self) {
        self.receiver.close();
    }
}
