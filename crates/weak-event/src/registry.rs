#![forbid(unsafe_code)]

//! Owner-scoped collection of weak subscriptions.
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use weak_event::{ChannelTable, Event, Publisher, Registry};
//!
//! struct Document {
//!     saved: Event<Document, u64>,
//! }
//!
//! impl Publisher for Document {
//!     fn describe_channels(table: &mut ChannelTable<Self>) {
//!         table.event("Saved", |d| &d.saved);
//!     }
//! }
//!
//! let doc = Arc::new(Document { saved: Event::new() });
//! let saves = Arc::new(AtomicUsize::new(0));
//! let mut registry = Registry::new();
//!
//! let counter = Arc::clone(&saves);
//! registry
//!     .subscribe(&doc, "Saved", move |_: &Document, _: &u64| {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!     })
//!     .unwrap();
//!
//! doc.saved.raise(&doc, &1);
//! registry.unsubscribe(&doc);
//! doc.saved.raise(&doc, &2);
//! assert_eq!(saves.load(Ordering::SeqCst), 1);
//! ```
//!
//! # Entry lifecycle
//!
//! ```text
//! subscribe ──► Attached ──┬── unsubscribe(publisher) ──► Detached
//!                          ├── clear()                ──► Detached
//!                          └── dispatch, handler gone ──► Detached
//! ```
//!
//! `Detached` is terminal. Entries whose publisher (or bound target) has
//! been dropped stay in the map until the next `unsubscribe`, `clear`,
//! `purge_dead` (or, with `sweep_on_subscribe`, the next `subscribe`)
//! visits them. Dropping the registry detaches everything it still holds
//! unless `detach_on_drop` is turned off.
//!
//! # Threading
//!
//! All mutating operations take `&mut self`. A registry shared between
//! threads must be wrapped in a lock by its owner.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use tracing::debug;

use crate::error::WeakEventError;
use crate::handler::{Handler, SignalFn, bind};
use crate::notify::{
    CollectionChanged, NotifyCollectionChanged, NotifyPropertyChanged, PropertyChanged,
};
use crate::resolve::Publisher;
use crate::subscription::Subscription;

/// Configuration for a [`Registry`].
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Detach every live subscription when the registry is dropped
    /// (default `true`).
    ///
    /// When `false`, a dropped registry only releases its callbacks; each
    /// entry point stays in its channel until the next raise detaches it.
    pub detach_on_drop: bool,
    /// Prune dead entries before inserting a new one.
    pub sweep_on_subscribe: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            detach_on_drop: true,
            sweep_on_subscribe: true,
        }
    }
}

impl RegistryConfig {
    /// Set whether dropping the registry detaches eagerly.
    #[must_use]
    pub fn with_detach_on_drop(mut self, enabled: bool) -> Self {
        self.detach_on_drop = enabled;
        self
    }

    /// Set whether `subscribe` prunes dead entries first.
    #[must_use]
    pub fn with_sweep_on_subscribe(mut self, enabled: bool) -> Self {
        self.sweep_on_subscribe = enabled;
        self
    }
}

/// Identity of a publisher: its type plus its allocation address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PublisherKey {
    type_id: TypeId,
    addr: usize,
}

impl PublisherKey {
    fn of<P: 'static>(publisher: &Arc<P>) -> Self {
        Self {
            type_id: TypeId::of::<P>(),
            addr: Arc::as_ptr(publisher) as *const () as usize,
        }
    }
}

/// Type-erased view of a [`Subscription`].
trait Tracked: Send + Sync {
    fn is_alive(&self) -> bool;
    fn detach(&self);
    fn publisher_key(&self) -> PublisherKey;
    fn describe(&self) -> (&'static str, &str);
}

impl<P: Send + Sync + 'static, A: 'static> Tracked for Subscription<P, A> {
    fn is_alive(&self) -> bool {
        Subscription::is_alive(self)
    }

    fn detach(&self) {
        Subscription::detach(self);
    }

    fn publisher_key(&self) -> PublisherKey {
        PublisherKey {
            type_id: TypeId::of::<P>(),
            addr: self.publisher_addr(),
        }
    }

    fn describe(&self) -> (&'static str, &str) {
        (type_name::<P>(), self.channel())
    }
}

struct Entry {
    subscription: Box<dyn Tracked>,
    /// The callback as supplied; keeps the subscription's `Weak` handler
    /// resolvable for as long as the entry exists.
    _handler: Box<dyn Any + Send + Sync>,
}

/// Collection of weak subscriptions owned by one listener.
///
/// # Invariants
///
/// 1. Every entry was created by this registry and not yet removed.
/// 2. An entry is detached at most once; removal always follows detach.
/// 3. A failed subscribe inserts nothing.
pub struct Registry {
    entries: HashMap<u64, Entry>,
    next_id: u64,
    config: RegistryConfig,
}

impl Registry {
    /// Empty registry with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Empty registry with `config`.
    #[must_use]
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            entries: HashMap::new(),
            next_id: 0,
            config,
        }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Subscribe `handler` to the channel named `channel` on `publisher`.
    ///
    /// # Errors
    ///
    /// [`WeakEventError::UnknownChannel`] or
    /// [`WeakEventError::ShapeMismatch`]; the registry is unchanged.
    pub fn subscribe<P, A, F>(
        &mut self,
        publisher: &Arc<P>,
        channel: &str,
        handler: F,
    ) -> Result<(), WeakEventError>
    where
        P: Publisher,
        A: 'static,
        F: Fn(&P, &A) + Send + Sync + 'static,
    {
        let handler: Handler<P, A> = Arc::new(handler);
        self.subscribe_handler(publisher, channel, handler)
    }

    /// Like [`subscribe`](Self::subscribe), for an already shared
    /// [`Handler`]. The registry keeps its own clone of the `Arc`.
    ///
    /// # Errors
    ///
    /// See [`subscribe`](Self::subscribe).
    pub fn subscribe_handler<P, A>(
        &mut self,
        publisher: &Arc<P>,
        channel: &str,
        handler: Handler<P, A>,
    ) -> Result<(), WeakEventError>
    where
        P: Publisher,
        A: 'static,
    {
        self.sweep_before_insert();
        let subscription =
            Subscription::by_name(&Arc::downgrade(publisher), channel, &Arc::downgrade(&handler))?;
        self.insert(subscription, handler);
        Ok(())
    }

    /// Subscribe `method` on `target` to the channel named `channel`.
    ///
    /// `target` is held weakly and also guards the subscription: once it is
    /// dropped the entry counts as dead, detaches on the next raise and is
    /// pruned by the next registry pass.
    ///
    /// # Errors
    ///
    /// See [`subscribe`](Self::subscribe).
    pub fn subscribe_bound<P, A, T>(
        &mut self,
        publisher: &Arc<P>,
        channel: &str,
        target: &Arc<T>,
        method: fn(&T, &P, &A),
    ) -> Result<(), WeakEventError>
    where
        P: Publisher,
        A: 'static,
        T: Send + Sync + 'static,
    {
        self.sweep_before_insert();
        let handler = bind(target, method);
        let subscription =
            Subscription::by_name(&Arc::downgrade(publisher), channel, &Arc::downgrade(&handler))?;
        let guard: Weak<dyn Any + Send + Sync> = Arc::downgrade(target) as Weak<T>;
        subscription.guard_with(guard);
        self.insert(subscription, handler);
        Ok(())
    }

    /// Subscribe through explicit attach/detach closures for a
    /// `(sender, args)` channel.
    ///
    /// # Errors
    ///
    /// Only [`WeakEventError::InvalidArgument`], which cannot occur for a
    /// live `publisher`.
    pub fn subscribe_with<P, A, Attach, Detach, F>(
        &mut self,
        publisher: &Arc<P>,
        attach: Attach,
        detach: Detach,
        handler: F,
    ) -> Result<(), WeakEventError>
    where
        P: Send + Sync + 'static,
        A: 'static,
        Attach: FnOnce(&P, Handler<P, A>),
        Detach: Fn(&P, &Handler<P, A>) + Send + Sync + 'static,
        F: Fn(&P, &A) + Send + Sync + 'static,
    {
        self.sweep_before_insert();
        let handler: Handler<P, A> = Arc::new(handler);
        let subscription = Subscription::explicit(
            &Arc::downgrade(publisher),
            &Arc::downgrade(&handler),
            attach,
            detach,
        )?;
        self.insert(subscription, handler);
        Ok(())
    }

    /// Subscribe through explicit attach/detach closures for an args-only
    /// channel. The publisher is passed to `handler` as the sender.
    ///
    /// # Errors
    ///
    /// Only [`WeakEventError::InvalidArgument`].
    pub fn subscribe_signal_with<P, A, Attach, Detach, F>(
        &mut self,
        publisher: &Arc<P>,
        attach: Attach,
        detach: Detach,
        handler: F,
    ) -> Result<(), WeakEventError>
    where
        P: Send + Sync + 'static,
        A: 'static,
        Attach: FnOnce(&P, Arc<SignalFn<A>>),
        Detach: Fn(&P, &Arc<SignalFn<A>>) + Send + Sync + 'static,
        F: Fn(&P, &A) + Send + Sync + 'static,
    {
        self.sweep_before_insert();
        let handler: Handler<P, A> = Arc::new(handler);
        let subscription = Subscription::explicit_signal(
            &Arc::downgrade(publisher),
            &Arc::downgrade(&handler),
            attach,
            detach,
        )?;
        self.insert(subscription, handler);
        Ok(())
    }

    /// Subscribe to [`NotifyPropertyChanged::property_changed`].
    ///
    /// # Errors
    ///
    /// Only [`WeakEventError::InvalidArgument`].
    pub fn subscribe_property_changed<P, F>(
        &mut self,
        publisher: &Arc<P>,
        handler: F,
    ) -> Result<(), WeakEventError>
    where
        P: NotifyPropertyChanged,
        F: Fn(&P, &PropertyChanged) + Send + Sync + 'static,
    {
        self.subscribe_with(
            publisher,
            |p: &P, entry: Handler<P, PropertyChanged>| p.property_changed().add(entry),
            |p: &P, entry: &Handler<P, PropertyChanged>| {
                p.property_changed().remove(entry);
            },
            handler,
        )
    }

    /// Subscribe to [`NotifyCollectionChanged::collection_changed`].
    ///
    /// # Errors
    ///
    /// Only [`WeakEventError::InvalidArgument`].
    pub fn subscribe_collection_changed<P, F>(
        &mut self,
        publisher: &Arc<P>,
        handler: F,
    ) -> Result<(), WeakEventError>
    where
        P: NotifyCollectionChanged,
        F: Fn(&P, &CollectionChanged) + Send + Sync + 'static,
    {
        self.subscribe_with(
            publisher,
            |p: &P, entry: Handler<P, CollectionChanged>| p.collection_changed().add(entry),
            |p: &P, entry: &Handler<P, CollectionChanged>| {
                p.collection_changed().remove(entry);
            },
            handler,
        )
    }

    /// Detach and drop every live subscription to `publisher` (by
    /// identity), and drop every dead subscription regardless of publisher.
    ///
    /// Returns the number of subscriptions detached.
    pub fn unsubscribe<P: 'static>(&mut self, publisher: &Arc<P>) -> usize {
        let key = PublisherKey::of(publisher);
        let before = self.entries.len();
        let mut detached = 0;
        self.entries.retain(|_, entry| {
            if !entry.subscription.is_alive() {
                return false;
            }
            if entry.subscription.publisher_key() == key {
                entry.subscription.detach();
                detached += 1;
                return false;
            }
            true
        });
        debug!(
            publisher = type_name::<P>(),
            detached,
            pruned = before - self.entries.len() - detached,
            remaining = self.entries.len(),
            "unsubscribed publisher"
        );
        detached
    }

    /// Detach every live subscription and empty the registry.
    pub fn clear(&mut self) {
        let mut detached = 0usize;
        let total = self.entries.len();
        for (_, entry) in self.entries.drain() {
            if entry.subscription.is_alive() {
                entry.subscription.detach();
                detached += 1;
            }
        }
        debug!(total, detached, "cleared registry");
    }

    /// Drop dead entries without detaching anything. Returns the number
    /// pruned.
    pub fn purge_dead(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.subscription.is_alive());
        let pruned = before - self.entries.len();
        if pruned > 0 {
            debug!(pruned, remaining = self.entries.len(), "pruned dead subscriptions");
        }
        pruned
    }

    /// Number of entries, including dead ones not yet pruned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the registry holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries whose publisher and callback are both reachable.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.subscription.is_alive())
            .count()
    }

    fn sweep_before_insert(&mut self) {
        if self.config.sweep_on_subscribe {
            self.purge_dead();
        }
    }

    fn insert<P, A>(&mut self, subscription: Subscription<P, A>, handler: Handler<P, A>)
    where
        P: Send + Sync + 'static,
        A: 'static,
    {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(
            id,
            Entry {
                subscription: Box::new(subscription),
                _handler: Box::new(handler),
            },
        );
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        if self.config.detach_on_drop {
            self.clear();
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channels: Vec<_> = self
            .entries
            .values()
            .map(|entry| entry.subscription.describe())
            .collect();
        f.debug_struct("Registry")
            .field("len", &self.entries.len())
            .field("entries", &channels)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{Event, Signal};
    use crate::resolve::ChannelTable;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Publisher1 {
        changed: Event<Publisher1, u32>,
        closed: Signal<()>,
    }

    impl Publisher for Publisher1 {
        fn describe_channels(table: &mut ChannelTable<Self>) {
            table
                .event("Changed", |p| &p.changed)
                .signal("Closed", |p| &p.closed);
        }
    }

    fn publisher() -> Arc<Publisher1> {
        Arc::new(Publisher1 {
            changed: Event::new(),
            closed: Signal::new(),
        })
    }

    fn tally() -> (Arc<AtomicUsize>, impl Fn(&Publisher1, &u32) + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        (count, move |_: &Publisher1, _: &u32| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn subscribe_then_raise() {
        let p = publisher();
        let (count, handler) = tally();
        let mut registry = Registry::new();
        registry.subscribe(&p, "Changed", handler).expect("subscribe");

        p.changed.raise(&p, &1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn unknown_channel_leaves_registry_unchanged() {
        let p = publisher();
        let (_, handler) = tally();
        let mut registry = Registry::new();
        let err = registry.subscribe(&p, "Missing", handler).expect_err("unknown");
        assert!(matches!(err, WeakEventError::UnknownChannel { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn unsubscribe_only_touches_matching_publisher() {
        let p1 = publisher();
        let p2 = publisher();
        let (c1, h1) = tally();
        let (c2, h2) = tally();
        let mut registry = Registry::new();
        registry.subscribe(&p1, "Changed", h1).expect("subscribe");
        registry.subscribe(&p2, "Changed", h2).expect("subscribe");

        assert_eq!(registry.unsubscribe(&p1), 1);
        p1.changed.raise(&p1, &1);
        p2.changed.raise(&p2, &1);
        assert_eq!(c1.load(Ordering::SeqCst), 0);
        assert_eq!(c2.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unsubscribe_prunes_dead_entries_elsewhere() {
        let p1 = publisher();
        let p2 = publisher();
        let other = publisher();
        let mut registry = Registry::new();
        registry.subscribe(&p1, "Changed", tally().1).expect("subscribe");
        registry.subscribe(&p2, "Changed", tally().1).expect("subscribe");

        drop(p2);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.unsubscribe(&other), 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unsubscribe_twice_is_a_noop() {
        let p = publisher();
        let mut registry = Registry::new();
        registry.subscribe(&p, "Changed", tally().1).expect("subscribe");
        assert_eq!(registry.unsubscribe(&p), 1);
        assert_eq!(registry.unsubscribe(&p), 0);
        assert!(p.changed.is_empty());
    }

    #[test]
    fn clear_detaches_all_publishers() {
        let p1 = publisher();
        let p2 = publisher();
        let (count, _) = tally();
        let mut registry = Registry::new();
        for p in [&p1, &p2] {
            let count = Arc::clone(&count);
            registry
                .subscribe(p, "Changed", move |_: &Publisher1, _: &u32| {
                    count.fetch_add(1, Ordering::SeqCst);
                })
                .expect("subscribe");
        }

        registry.clear();
        registry.clear();
        p1.changed.raise(&p1, &1);
        p2.changed.raise(&p2, &1);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(registry.is_empty());
        assert!(p1.changed.is_empty() && p2.changed.is_empty());
    }

    #[test]
    fn signal_channels_resolve_by_name() {
        let p = publisher();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = Arc::clone(&hits);
        let mut registry = Registry::new();
        registry
            .subscribe(&p, "Closed", move |_: &Publisher1, _: &()| {
                hits_clone.fetch_add(1, Ordering::SeqCst);
            })
            .expect("subscribe");

        p.closed.emit(&());
        registry.unsubscribe(&p);
        p.closed.emit(&());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn sweep_on_subscribe_prunes_before_insert() {
        let p1 = publisher();
        let p2 = publisher();
        let mut registry = Registry::new();
        registry.subscribe(&p1, "Changed", tally().1).expect("subscribe");
        drop(p1);
        registry.subscribe(&p2, "Changed", tally().1).expect("subscribe");
        assert_eq!(registry.len(), 1);

        let p3 = publisher();
        let mut lazy = Registry::with_config(RegistryConfig::default().with_sweep_on_subscribe(false));
        lazy.subscribe(&p2, "Changed", tally().1).expect("subscribe");
        drop(p2);
        lazy.subscribe(&p3, "Changed", tally().1).expect("subscribe");
        assert_eq!(lazy.len(), 2);
        assert_eq!(lazy.purge_dead(), 1);
    }

    fn lazy() -> Registry {
        Registry::with_config(RegistryConfig::default().with_detach_on_drop(false))
    }

    #[test]
    fn lazy_drop_releases_handlers() {
        let p = publisher();
        let (count, handler) = tally();
        let registry = {
            let mut registry = lazy();
            registry.subscribe(&p, "Changed", handler).expect("subscribe");
            registry
        };
        assert_eq!(p.changed.listener_count(), 1);

        drop(registry);
        p.changed.raise(&p, &1);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(p.changed.is_empty());
    }

    #[test]
    fn drop_detaches_by_default() {
        let p = publisher();
        assert!(RegistryConfig::default().detach_on_drop);
        for _ in 0..100 {
            let mut registry = Registry::new();
            registry.subscribe(&p, "Changed", tally().1).expect("subscribe");
        }
        assert_eq!(p.changed.listener_count(), 0);
    }

    #[test]
    fn panicking_attach_leaves_no_entry() {
        let p = publisher();
        let mut registry = Registry::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            registry.subscribe_with(
                &p,
                |_: &Publisher1, _: Handler<Publisher1, u32>| panic!("attach failed"),
                |p: &Publisher1, entry: &Handler<Publisher1, u32>| {
                    p.changed.remove(entry);
                },
                tally().1,
            )
        }));
        assert!(result.is_err());
        assert!(registry.is_empty());
        assert!(p.changed.is_empty());

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            registry.subscribe_signal_with(
                &p,
                |_: &Publisher1, _: Arc<SignalFn<()>>| panic!("attach failed"),
                |p: &Publisher1, entry: &Arc<SignalFn<()>>| {
                    p.closed.remove(entry);
                },
                |_: &Publisher1, _: &()| {},
            )
        }));
        assert!(result.is_err());
        assert!(registry.is_empty());
        assert!(p.closed.is_empty());
    }

    struct Owner {
        hits: AtomicUsize,
    }

    impl Owner {
        fn on_changed(&self, _sender: &Publisher1, _value: &u32) {
            self.hits.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn bound_target_drop_kills_entry() {
        let p = publisher();
        let other = publisher();
        let owner = Arc::new(Owner {
            hits: AtomicUsize::new(0),
        });
        let mut registry = Registry::new();
        registry
            .subscribe_bound(&p, "Changed", &owner, Owner::on_changed)
            .expect("subscribe");

        p.changed.raise(&p, &1);
        assert_eq!(owner.hits.load(Ordering::SeqCst), 1);
        assert_eq!(registry.live_count(), 1);

        drop(owner);
        assert_eq!(registry.live_count(), 0);
        p.changed.raise(&p, &1);
        assert!(p.changed.is_empty());
        assert_eq!(registry.unsubscribe(&other), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn bound_target_pruned_without_raise() {
        let p = publisher();
        let owner = Arc::new(Owner {
            hits: AtomicUsize::new(0),
        });
        let mut registry = Registry::new();
        registry
            .subscribe_bound(&p, "Changed", &owner, Owner::on_changed)
            .expect("subscribe");

        drop(owner);
        assert_eq!(registry.purge_dead(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn explicit_registration_round_trip() {
        let p = publisher();
        let (count, handler) = tally();
        let mut registry = Registry::new();
        registry
            .subscribe_with(
                &p,
                |p: &Publisher1, entry| p.changed.add(entry),
                |p: &Publisher1, entry: &Handler<Publisher1, u32>| {
                    p.changed.remove(entry);
                },
                handler,
            )
            .expect("subscribe");

        p.changed.raise(&p, &1);
        assert_eq!(registry.unsubscribe(&p), 1);
        p.changed.raise(&p, &1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn explicit_signal_registration() {
        let p = publisher();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = Arc::clone(&hits);
        let mut registry = Registry::new();
        registry
            .subscribe_signal_with(
                &p,
                |p: &Publisher1, entry| p.closed.add(entry),
                |p: &Publisher1, entry: &Arc<SignalFn<()>>| {
                    p.closed.remove(entry);
                },
                move |_: &Publisher1, _: &()| {
                    hits_clone.fetch_add(1, Ordering::SeqCst);
                },
            )
            .expect("subscribe");

        p.closed.emit(&());
        registry.clear();
        p.closed.emit(&());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[tracing_test::traced_test]
    fn reclaimed_handler_logs_detach() {
        let p = publisher();
        let registry = {
            let mut registry = lazy();
            registry.subscribe(&p, "Changed", tally().1).expect("subscribe");
            registry
        };
        drop(registry);
        p.changed.raise(&p, &1);
        assert!(logs_contain("reclaimed; detaching on dispatch"));
        assert!(logs_contain("detached subscription"));
    }

    #[test]
    fn debug_lists_channels() {
        let p = publisher();
        let mut registry = Registry::new();
        registry.subscribe(&p, "Changed", tally().1).expect("subscribe");
        let dbg = format!("{registry:?}");
        assert!(dbg.contains("Registry"));
        assert!(dbg.contains("Changed"));
    }
}
