#![forbid(unsafe_code)]

//! Notification channels that publishers embed.
//!
//! # Design
//!
//! A [`Channel<F>`] is an ordered list of strongly held listeners of type
//! `Arc<F>`. Two shapes are provided:
//!
//! - [`Event<P, A>`]: listeners receive `(sender, args)`.
//! - [`Signal<A>`]: listeners receive `args` only.
//!
//! Raising snapshots the listener list, releases the lock, then invokes each
//! listener in registration order. A listener may therefore add or remove
//! listeners (including itself) while it runs; the change takes effect on
//! the next raise.
//!
//! # Failure Modes
//!
//! - **Strong edges**: a channel keeps every listener alive until it is
//!   removed. Listeners that close over long-lived objects should go through
//!   a [`Subscription`](crate::Subscription), which only hands the channel a
//!   thin entry point.
//! - **Panicking listener**: the panic propagates out of `raise`; later
//!   listeners in the snapshot are not invoked.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// Channel delivering `(sender, args)`.
pub type Event<P, A> = Channel<dyn Fn(&P, &A) + Send + Sync>;

/// Channel delivering `args` only.
pub type Signal<A> = Channel<dyn Fn(&A) + Send + Sync>;

/// Ordered, internally locked list of listeners.
///
/// # Invariants
///
/// 1. Listeners are invoked in registration order.
/// 2. `remove` matches by pointer identity, never by value.
/// 3. The lock is never held while a listener runs.
pub struct Channel<F: ?Sized> {
    listeners: Mutex<Vec<Arc<F>>>,
}

impl<F: ?Sized> Channel<F> {
    /// Create an empty channel.
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Append a listener. The same `Arc` may be added more than once.
    pub fn add(&self, listener: Arc<F>) {
        self.listeners.lock().push(listener);
    }

    /// Remove the most recently added occurrence of `listener`.
    ///
    /// Returns `false` when the listener was not attached.
    pub fn remove(&self, listener: &Arc<F>) -> bool {
        let mut listeners = self.listeners.lock();
        match listeners.iter().rposition(|l| Arc::ptr_eq(l, listener)) {
            Some(index) => {
                listeners.remove(index);
                true
            }
            None => false,
        }
    }

    /// Number of attached listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// True when no listener is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.lock().is_empty()
    }

    /// Detach every listener.
    pub fn clear(&self) {
        self.listeners.lock().clear();
    }

    /// Copy of the listener list, taken under the lock.
    fn snapshot(&self) -> Vec<Arc<F>> {
        self.listeners.lock().clone()
    }
}

impl<P: ?Sized + 'static, A: ?Sized + 'static> Channel<dyn Fn(&P, &A) + Send + Sync> {
    /// Invoke every listener with `(sender, args)`.
    pub fn raise(&self, sender: &P, args: &A) {
        for listener in self.snapshot() {
            listener(sender, args);
        }
    }
}

impl<A: ?Sized + 'static> Channel<dyn Fn(&A) + Send + Sync> {
    /// Invoke every listener with `args`.
    pub fn emit(&self, args: &A) {
        for listener in self.snapshot() {
            listener(args);
        }
    }
}

impl<F: ?Sized> Default for Channel<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized> fmt::Debug for Channel<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("listener_count", &self.listener_count())
            .finish()
    }
}
