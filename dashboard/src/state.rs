//! Observable state
//!
//! `Subject` holds the current value of a piece of shared state and pushes every change to its
//! subscribers. A fresh `Subscription` first yields the value current at the time of subscribing,
//! and then every subsequent value in the order they were emitted, until it is dropped.

use std::sync::Arc;

use derivative::Derivative;
use tokio::sync::{Mutex, mpsc};

struct Inner<T> {
    /// Current value
    value: T,
    /// Live subscriptions, pruned on emission
    subscribers: Vec<mpsc::UnboundedSender<T>>,
}

impl<T: Clone> Inner<T> {
    fn emit(&mut self) {
        let value = &self.value;
        self.subscribers
            .retain(|subscriber| subscriber.send(value.clone()).is_ok());
    }
}

/// Shared, observable value
#[derive(Derivative)]
#[derivative(Clone(bound = ""))]
pub struct Subject<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T: Clone + Send + 'static> Subject<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                value,
                subscribers: vec![],
            })),
        }
    }

    /// Returns a copy of the current value
    pub async fn get(&self) -> T {
        self.inner.lock().await.value.clone()
    }

    /// Reads the current value without copying it
    pub async fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.lock().await.value)
    }

    /// Replaces the value, notifying subscribers
    pub async fn set(&self, value: T) {
        let mut inner = self.inner.lock().await;
        inner.value = value;
        inner.emit();
    }

    /// Mutates the value in place, notifying subscribers
    pub async fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut inner = self.inner.lock().await;
        let result = f(&mut inner.value);
        inner.emit();
        result
    }

    /// Fallible mutation
    ///
    /// The closure works on a copy of the value. The copy replaces the value and gets broadcast
    /// only if the closure succeeds, so on error the state is exactly what it was before.
    pub async fn try_update<R, E>(
        &self,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Result<R, E> {
        let mut inner = self.inner.lock().await;
        let mut value = inner.value.clone();
        let result = f(&mut value)?;
        inner.value = value;
        inner.emit();
        Ok(result)
    }

    /// Replaces the value only if `f` returns a new one
    pub async fn replace_if(&self, f: impl FnOnce(&T) -> Option<T>) -> bool {
        let mut inner = self.inner.lock().await;
        match f(&inner.value) {
            Some(value) => {
                inner.value = value;
                inner.emit();
                true
            }
            None => false,
        }
    }

    /// Subscribes to the value
    pub async fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock().await;

        // Receiver is alive at this point, so the send cannot fail
        let _ = tx.send(inner.value.clone());
        inner.subscribers.push(tx);

        Subscription { rx }
    }

    /// Number of subscriptions still alive
    pub async fn subscribers(&self) -> usize {
        let mut inner = self.inner.lock().await;
        inner.subscribers.retain(|subscriber| !subscriber.is_closed());
        inner.subscribers.len()
    }
}

impl<T: Clone + Send + Default + 'static> Default for Subject<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Stream of values emitted by a `Subject`
///
/// Dropping the subscription unsubscribes.
#[derive(Debug)]
pub struct Subscription<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> Subscription<T> {
    /// Waits for the next value
    ///
    /// Returns `None` once the subject is gone.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Returns the next value if one is already waiting
    pub fn try_next(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Drains all the values waiting, returning the most recent one
    pub fn latest(&mut self) -> Option<T> {
        let mut latest = None;
        while let Some(value) = self.try_next() {
            latest = Some(value);
        }
        latest
    }
}
