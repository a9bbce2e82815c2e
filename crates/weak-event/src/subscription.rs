#![forbid(unsafe_code)]

//! A single weakly held link between one publisher channel and one callback.
//!
//! # Design
//!
//! ```text
//!   publisher ──owns──► channel ──Arc──► entry point ──Arc──► Link
//!        ▲                                                    │
//!        └──────────────────────── Weak ──────────────────────┤
//!   handler (owned by the Registry) ◄──────── Weak ───────────┤
//!   entry point ◄─────────────────────────── Weak ────────────┘
//! ```
//!
//! The channel's strong edge stops at the entry point and its `Link`; the
//! publisher and the callback are only reachable through `Weak`. Dropping
//! either endpoint therefore never waits on the other.
//!
//! # Invariants
//!
//! 1. `is_alive` is recomputed on every call; it may flip to `false`
//!    between two observations when another thread drops the last `Arc`.
//! 2. A subscription is detached from its channel at most once.
//! 3. After `detach` returns, no dispatch reaches the callback.
//! 4. Dispatching with a reclaimed callback detaches instead of invoking.
//! 5. An optional guard (see [`Subscription::guard_with`]) joins the
//!    liveness check: once it is reclaimed the link counts as dead even if
//!    the callback itself is still held.
//!
//! # Variants
//!
//! | Binding           | Attach                        | Entry point shape  |
//! |-------------------|-------------------------------|--------------------|
//! | by name           | cached [`ChannelTable`] lookup | `Event` or `Signal` |
//! | explicit          | caller-supplied closures      | `Event`            |
//! | explicit signal   | caller-supplied closures      | `Signal`           |

use std::any::{Any, type_name};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use tracing::{debug, trace};

use crate::channel::{Event, Signal};
use crate::error::WeakEventError;
use crate::handler::{Handler, HandlerFn, SignalFn};
use crate::resolve::{ChannelShape, ChannelTable, Publisher, channel_table};

type DetachEvent<P, A> = Box<dyn Fn(&P, &Handler<P, A>) + Send + Sync>;
type DetachSignal<P, A> = Box<dyn Fn(&P, &Arc<SignalFn<A>>) + Send + Sync>;

/// How a subscription finds its way back out of the channel.
enum Binding<P, A> {
    /// Resolved through the publisher type's channel table.
    Named {
        table: Arc<ChannelTable<P>>,
        index: usize,
    },
    /// Caller-supplied detach for a `(sender, args)` entry point.
    Explicit(DetachEvent<P, A>),
    /// Caller-supplied detach for an args-only entry point.
    ExplicitSignal(DetachSignal<P, A>),
}

impl<P, A> Binding<P, A> {
    fn kind(&self) -> &'static str {
        match self {
            Binding::Named { .. } => "named",
            Binding::Explicit(_) => "explicit",
            Binding::ExplicitSignal(_) => "explicit_signal",
        }
    }
}

/// Channel resolved by name, ahead of building the link.
enum NamedTarget<'a, P, A> {
    Event(&'a Event<P, A>),
    Signal(&'a Signal<A>),
}

/// The entry point the channel holds, seen weakly from the link.
enum EntryPoint<P, A> {
    Event(Weak<HandlerFn<P, A>>),
    Signal(Weak<SignalFn<A>>),
}

/// State shared between the [`Subscription`] and its entry point.
struct Link<P, A> {
    publisher: Weak<P>,
    handler: Weak<HandlerFn<P, A>>,
    binding: Binding<P, A>,
    entry: OnceLock<EntryPoint<P, A>>,
    guard: OnceLock<Weak<dyn Any + Send + Sync>>,
    channel: String,
    detached: AtomicBool,
}

impl<P: Send + Sync + 'static, A: 'static> Link<P, A> {
    fn is_alive(&self) -> bool {
        self.publisher.strong_count() > 0
            && self.handler.strong_count() > 0
            && self.guard_alive()
    }

    fn guard_alive(&self) -> bool {
        self.guard.get().is_none_or(|guard| guard.strong_count() > 0)
    }

    fn dispatch(&self, sender: &P, args: &A) {
        if self.detached.load(Ordering::Acquire) {
            return;
        }
        match self.handler.upgrade().filter(|_| self.guard_alive()) {
            Some(handler) => {
                trace!(channel = %self.channel, "dispatching notification");
                handler(sender, args);
            }
            None => {
                debug!(
                    publisher = type_name::<P>(),
                    channel = %self.channel,
                    "handler or guard reclaimed; detaching on dispatch"
                );
                self.detach();
            }
        }
    }

    fn detach(&self) {
        let Some(publisher) = self.publisher.upgrade() else {
            // The channel went away with its publisher.
            self.detached.store(true, Ordering::Release);
            return;
        };
        if self.detached.swap(true, Ordering::AcqRel) {
            return;
        }
        let removed = match self.entry.get() {
            Some(entry) => self.remove_entry(&publisher, entry),
            None => false,
        };
        debug!(
            publisher = type_name::<P>(),
            channel = %self.channel,
            binding = self.binding.kind(),
            removed,
            "detached subscription"
        );
    }

    /// Returns whether the entry point was still attached.
    fn remove_entry(&self, publisher: &P, entry: &EntryPoint<P, A>) -> bool {
        match (&self.binding, entry) {
            (Binding::Named { table, index }, EntryPoint::Event(weak)) => {
                let Some(entry) = weak.upgrade() else {
                    return false;
                };
                table
                    .get(*index)
                    .and_then(|descriptor| descriptor.event::<A>(publisher))
                    .is_some_and(|channel| channel.remove(&entry))
            }
            (Binding::Named { table, index }, EntryPoint::Signal(weak)) => {
                let Some(entry) = weak.upgrade() else {
                    return false;
                };
                table
                    .get(*index)
                    .and_then(|descriptor| descriptor.signal::<A>(publisher))
                    .is_some_and(|channel| channel.remove(&entry))
            }
            (Binding::Explicit(detach), EntryPoint::Event(weak)) => match weak.upgrade() {
                Some(entry) => {
                    detach(publisher, &entry);
                    true
                }
                None => false,
            },
            (Binding::ExplicitSignal(detach), EntryPoint::Signal(weak)) => match weak.upgrade() {
                Some(entry) => {
                    detach(publisher, &entry);
                    true
                }
                None => false,
            },
            (binding, _) => {
                debug_assert!(
                    false,
                    "{} binding paired with the wrong entry point shape",
                    binding.kind()
                );
                false
            }
        }
    }
}

/// Weakly held subscription of one callback to one publisher channel.
///
/// Neither the publisher nor the callback is kept alive by a subscription.
/// The [`Registry`](crate::Registry) is the usual way to create and own
/// these; the constructors are public for callers managing a single link.
pub struct Subscription<P, A> {
    link: Arc<Link<P, A>>,
}

impl<P: Send + Sync + 'static, A: 'static> Subscription<P, A> {
    /// Subscribe `handler` to the channel registered as `channel` on `P`.
    ///
    /// # Errors
    ///
    /// - [`WeakEventError::InvalidArgument`] if `publisher` or `handler`
    ///   no longer resolves.
    /// - [`WeakEventError::UnknownChannel`] if `P` has no such channel.
    /// - [`WeakEventError::ShapeMismatch`] if the channel does not deliver
    ///   `A`.
    pub fn by_name(
        publisher: &Weak<P>,
        channel: &str,
        handler: &Weak<HandlerFn<P, A>>,
    ) -> Result<Self, WeakEventError>
    where
        P: Publisher,
    {
        let strong = resolve_endpoints(publisher, handler)?;
        let table = channel_table::<P>();
        let (index, descriptor) =
            table
                .lookup(channel)
                .ok_or_else(|| WeakEventError::UnknownChannel {
                    publisher: type_name::<P>(),
                    channel: channel.to_string(),
                })?;
        let mismatch = || WeakEventError::ShapeMismatch {
            publisher: type_name::<P>(),
            channel: channel.to_string(),
            expected: type_name::<A>(),
        };

        let target = match descriptor.shape() {
            ChannelShape::SenderArgs => descriptor.event::<A>(&strong).map(NamedTarget::Event),
            ChannelShape::ArgsOnly => descriptor.signal::<A>(&strong).map(NamedTarget::Signal),
        }
        .ok_or_else(mismatch)?;

        let link = Self::link(publisher, handler, channel, Binding::Named {
            table: Arc::clone(&table),
            index,
        });
        match target {
            NamedTarget::Event(channel) => channel.add(event_entry(&link)),
            NamedTarget::Signal(channel) => channel.add(signal_entry(&link)),
        }
        Ok(Self::attached(link))
    }

    /// Subscribe through caller-supplied attach/detach closures for a
    /// `(sender, args)` channel.
    ///
    /// `attach` runs once, before this returns; `detach` runs at most once,
    /// with the same entry point `attach` received.
    ///
    /// # Errors
    ///
    /// [`WeakEventError::InvalidArgument`] if `publisher` or `handler` no
    /// longer resolves. `attach` is not called in that case.
    pub fn explicit<Attach, Detach>(
        publisher: &Weak<P>,
        handler: &Weak<HandlerFn<P, A>>,
        attach: Attach,
        detach: Detach,
    ) -> Result<Self, WeakEventError>
    where
        Attach: FnOnce(&P, Handler<P, A>),
        Detach: Fn(&P, &Handler<P, A>) + Send + Sync + 'static,
    {
        let strong = resolve_endpoints(publisher, handler)?;
        let link = Self::link(
            publisher,
            handler,
            "<explicit>",
            Binding::Explicit(Box::new(detach)),
        );
        attach(&*strong, event_entry(&link));
        Ok(Self::attached(link))
    }

    /// Subscribe through caller-supplied attach/detach closures for an
    /// args-only channel.
    ///
    /// The entry point supplies the weakly held publisher as the sender.
    ///
    /// # Errors
    ///
    /// [`WeakEventError::InvalidArgument`] if `publisher` or `handler` no
    /// longer resolves.
    pub fn explicit_signal<Attach, Detach>(
        publisher: &Weak<P>,
        handler: &Weak<HandlerFn<P, A>>,
        attach: Attach,
        detach: Detach,
    ) -> Result<Self, WeakEventError>
    where
        Attach: FnOnce(&P, Arc<SignalFn<A>>),
        Detach: Fn(&P, &Arc<SignalFn<A>>) + Send + Sync + 'static,
    {
        let strong = resolve_endpoints(publisher, handler)?;
        let link = Self::link(
            publisher,
            handler,
            "<explicit>",
            Binding::ExplicitSignal(Box::new(detach)),
        );
        attach(&*strong, signal_entry(&link));
        Ok(Self::attached(link))
    }

    fn link(
        publisher: &Weak<P>,
        handler: &Weak<HandlerFn<P, A>>,
        channel: &str,
        binding: Binding<P, A>,
    ) -> Arc<Link<P, A>> {
        Arc::new(Link {
            publisher: publisher.clone(),
            handler: handler.clone(),
            binding,
            entry: OnceLock::new(),
            guard: OnceLock::new(),
            channel: channel.to_string(),
            detached: AtomicBool::new(false),
        })
    }

    fn attached(link: Arc<Link<P, A>>) -> Self {
        debug!(
            publisher = type_name::<P>(),
            channel = %link.channel,
            binding = link.binding.kind(),
            "attached subscription"
        );
        Self { link }
    }

    /// True while the publisher, the callback and the guard (if any) are
    /// all reachable.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.link.is_alive()
    }

    /// Tie this subscription's liveness to `guard`.
    ///
    /// Callbacks that reach their real target through a `Weak` (such as
    /// [`bind`](crate::bind)) stay reachable after the target is gone. Passing
    /// that target here makes the subscription report dead and self-detach
    /// once it is reclaimed. Returns `false` if a guard was already set.
    pub fn guard_with(&self, guard: Weak<dyn Any + Send + Sync>) -> bool {
        self.link.guard.set(guard).is_ok()
    }

    /// True once this subscription has been detached (explicitly, on
    /// dispatch, or because its publisher went away).
    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.link.detached.load(Ordering::Acquire)
    }

    /// Deliver one notification.
    ///
    /// Invokes the callback if it is still reachable; otherwise detaches.
    pub fn dispatch(&self, sender: &P, args: &A) {
        self.link.dispatch(sender, args);
    }

    /// Remove the entry point from the channel. Idempotent; a no-op once
    /// the publisher is gone.
    pub fn detach(&self) {
        self.link.detach();
    }

    /// The publisher, if it is still alive.
    #[must_use]
    pub fn publisher(&self) -> Option<Arc<P>> {
        self.link.publisher.upgrade()
    }

    /// True if `publisher` is the very object this subscription listens to.
    #[must_use]
    pub fn is_from(&self, publisher: &Arc<P>) -> bool {
        std::ptr::eq(self.link.publisher.as_ptr(), Arc::as_ptr(publisher))
    }

    /// Address of the publisher allocation, stable for as long as this
    /// subscription holds its `Weak`.
    pub(crate) fn publisher_addr(&self) -> usize {
        self.link.publisher.as_ptr() as *const () as usize
    }

    /// Name of the channel (`"<explicit>"` for explicit bindings).
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.link.channel
    }
}

impl<P, A> fmt::Debug for Subscription<P, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("publisher", &type_name::<P>())
            .field("channel", &self.link.channel)
            .field("binding", &self.link.binding.kind())
            .field("detached", &self.link.detached.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

fn resolve_endpoints<P, A>(
    publisher: &Weak<P>,
    handler: &Weak<HandlerFn<P, A>>,
) -> Result<Arc<P>, WeakEventError> {
    let publisher = publisher
        .upgrade()
        .ok_or(WeakEventError::InvalidArgument { what: "publisher" })?;
    if handler.strong_count() == 0 {
        return Err(WeakEventError::InvalidArgument { what: "handler" });
    }
    Ok(publisher)
}

/// Build the `(sender, args)` entry point and record it weakly on the link.
fn event_entry<P, A>(link: &Arc<Link<P, A>>) -> Handler<P, A>
where
    P: Send + Sync + 'static,
    A: 'static,
{
    let target = Arc::clone(link);
    let entry: Handler<P, A> = Arc::new(move |sender: &P, args: &A| target.dispatch(sender, args));
    let _ = link.entry.set(EntryPoint::Event(Arc::downgrade(&entry)));
    entry
}

/// Build the args-only entry point. The sender is the weakly held
/// publisher; if it is gone there is nobody to report as sender and the
/// notification is dropped.
fn signal_entry<P, A>(link: &Arc<Link<P, A>>) -> Arc<SignalFn<A>>
where
    P: Send + Sync + 'static,
    A: 'static,
{
    let target = Arc::clone(link);
    let entry: Arc<SignalFn<A>> = Arc::new(move |args: &A| {
        if let Some(sender) = target.publisher.upgrade() {
            target.dispatch(&sender, args);
        }
    });
    let _ = link.entry.set(EntryPoint::Signal(Arc::downgrade(&entry)));
    entry
}
