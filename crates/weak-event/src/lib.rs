#![forbid(unsafe_code)]

//! Weakly held notification subscriptions.
//!
//! # Role
//! A publisher that stores `Arc<dyn Fn>` callbacks keeps every subscriber
//! (and everything it references) alive for as long as the publisher lives.
//! `weak-event` puts a thin entry point in the publisher's channel instead
//! and reaches both the publisher and the callback only through `Weak`.
//! Dropping the listener's registry detaches its entry points; a callback
//! that disappears some other way is noticed on the next raise and the link
//! detaches itself.
//!
//! # Primary types
//! - [`Event`] / [`Signal`]: channels a publisher embeds.
//! - [`Publisher`] / [`ChannelTable`]: channels by name, resolved once per
//!   type.
//! - [`Subscription`]: one weak link; by name or through explicit
//!   attach/detach closures.
//! - [`Registry`]: the subscriptions one listener owns; unsubscribe by
//!   publisher identity or all at once.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use weak_event::{ChannelTable, Event, Publisher, Registry};
//!
//! struct Counter {
//!     changed: Event<Counter, i64>,
//! }
//!
//! impl Publisher for Counter {
//!     fn describe_channels(table: &mut ChannelTable<Self>) {
//!         table.event("Changed", |c| &c.changed);
//!     }
//! }
//!
//! struct View {
//!     renders: Arc<AtomicUsize>,
//!     subscriptions: Registry,
//! }
//!
//! let counter = Arc::new(Counter { changed: Event::new() });
//! let renders = Arc::new(AtomicUsize::new(0));
//! let mut view = View { renders: Arc::clone(&renders), subscriptions: Registry::new() };
//!
//! let hits = Arc::clone(&view.renders);
//! view.subscriptions
//!     .subscribe(&counter, "Changed", move |_: &Counter, _: &i64| {
//!         hits.fetch_add(1, Ordering::SeqCst);
//!     })
//!     .unwrap();
//!
//! counter.changed.raise(&counter, &1);
//! assert_eq!(renders.load(Ordering::SeqCst), 1);
//!
//! // Dropping the view drops its registry, which detaches from the counter.
//! drop(view);
//! assert!(counter.changed.is_empty());
//! counter.changed.raise(&counter, &2);
//! assert_eq!(renders.load(Ordering::SeqCst), 1);
//! ```

pub mod channel;
pub mod error;
pub mod handler;
pub mod notify;
pub mod registry;
pub mod resolve;
pub mod subscription;

pub use channel::{Channel, Event, Signal};
pub use error::WeakEventError;
pub use handler::{Handler, HandlerFn, SignalFn, bind, handler};
pub use notify::{
    CollectionChanged, NotifyCollectionChanged, NotifyPropertyChanged, PropertyChanged,
};
pub use registry::{Registry, RegistryConfig};
pub use resolve::{ChannelDescriptor, ChannelShape, ChannelTable, Publisher, channel_table};
pub use subscription::Subscription;
