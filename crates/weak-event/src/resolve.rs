#![forbid(unsafe_code)]

//! Channel lookup by name.
//!
//! A publisher type lists its channels once, in
//! [`Publisher::describe_channels`]. The resulting [`ChannelTable`] is built
//! on first use and cached in a process-wide map keyed by `TypeId`, so
//! subscribing by name costs one read-locked map lookup plus one hash lookup
//! per call.
//!
//! ```
//! use weak_event::{Event, Publisher, ChannelTable, Signal};
//!
//! struct Thermometer {
//!     reading: Event<Thermometer, f32>,
//!     overheated: Signal<()>,
//! }
//!
//! impl Publisher for Thermometer {
//!     fn describe_channels(table: &mut ChannelTable<Self>) {
//!         table
//!             .event("Reading", |t| &t.reading)
//!             .signal("Overheated", |t| &t.overheated);
//!     }
//! }
//!
//! let table = weak_event::channel_table::<Thermometer>();
//! assert!(table.lookup("Reading").is_some());
//! assert!(table.lookup("Missing").is_none());
//! ```

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::channel::{Event, Signal};

/// A type that exposes named notification channels.
pub trait Publisher: Send + Sync + Sized + 'static {
    /// Register every channel this type raises.
    ///
    /// Called at most once per type per process (the table is cached).
    fn describe_channels(table: &mut ChannelTable<Self>);
}

/// Callback shape a channel delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelShape {
    /// `(sender, args)`, an [`Event`].
    SenderArgs,
    /// `args` only, a [`Signal`].
    ArgsOnly,
}

/// Type-erased field accessor: `&P -> &Channel<_>`.
trait Accessor<P>: Send + Sync {
    fn channel<'a>(&self, publisher: &'a P) -> &'a dyn Any;
}

struct FieldAccessor<P: 'static, C: 'static>(fn(&P) -> &C);

impl<P: 'static, C: Any> Accessor<P> for FieldAccessor<P, C> {
    fn channel<'a>(&self, publisher: &'a P) -> &'a dyn Any {
        (self.0)(publisher)
    }
}

/// One named channel of a publisher type.
pub struct ChannelDescriptor<P> {
    name: &'static str,
    shape: ChannelShape,
    args: &'static str,
    accessor: Box<dyn Accessor<P>>,
}

impl<P: 'static> ChannelDescriptor<P> {
    /// Channel name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Callback shape delivered by this channel.
    #[must_use]
    pub fn shape(&self) -> ChannelShape {
        self.shape
    }

    /// Type name of the arguments this channel delivers.
    #[must_use]
    pub fn args_type(&self) -> &'static str {
        self.args
    }

    /// The channel on `publisher`, if it is an `Event<P, A>`.
    pub fn event<'a, A: 'static>(&self, publisher: &'a P) -> Option<&'a Event<P, A>> {
        self.accessor.channel(publisher).downcast_ref()
    }

    /// The channel on `publisher`, if it is a `Signal<A>`.
    pub fn signal<'a, A: 'static>(&self, publisher: &'a P) -> Option<&'a Signal<A>> {
        self.accessor.channel(publisher).downcast_ref()
    }
}

impl<P> fmt::Debug for ChannelDescriptor<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelDescriptor")
            .field("name", &self.name)
            .field("shape", &self.shape)
            .field("args", &self.args)
            .finish()
    }
}

/// Name → channel registration table for one publisher type.
pub struct ChannelTable<P> {
    channels: Vec<ChannelDescriptor<P>>,
    by_name: HashMap<&'static str, usize>,
}

impl<P: 'static> ChannelTable<P> {
    fn new() -> Self {
        Self {
            channels: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Register a `(sender, args)` channel.
    pub fn event<A: 'static>(
        &mut self,
        name: &'static str,
        accessor: fn(&P) -> &Event<P, A>,
    ) -> &mut Self {
        self.insert(ChannelDescriptor {
            name,
            shape: ChannelShape::SenderArgs,
            args: type_name::<A>(),
            accessor: Box::new(FieldAccessor(accessor)),
        })
    }

    /// Register an args-only channel.
    pub fn signal<A: 'static>(
        &mut self,
        name: &'static str,
        accessor: fn(&P) -> &Signal<A>,
    ) -> &mut Self {
        self.insert(ChannelDescriptor {
            name,
            shape: ChannelShape::ArgsOnly,
            args: type_name::<A>(),
            accessor: Box::new(FieldAccessor(accessor)),
        })
    }

    fn insert(&mut self, descriptor: ChannelDescriptor<P>) -> &mut Self {
        let name = descriptor.name;
        if let Some(&index) = self.by_name.get(name) {
            warn!(
                publisher = type_name::<P>(),
                channel = name,
                "channel registered twice; keeping the later registration"
            );
            self.channels[index] = descriptor;
        } else {
            self.by_name.insert(name, self.channels.len());
            self.channels.push(descriptor);
        }
        self
    }

    /// Resolve `name` to its index and descriptor.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<(usize, &ChannelDescriptor<P>)> {
        let index = *self.by_name.get(name)?;
        self.channels.get(index).map(|d| (index, d))
    }

    /// Descriptor at a previously resolved index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ChannelDescriptor<P>> {
        self.channels.get(index)
    }

    /// Channel names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.channels.iter().map(|d| d.name)
    }

    /// Number of registered channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// True when the publisher declared no channels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl<P> fmt::Debug for ChannelTable<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelTable")
            .field("publisher", &type_name::<P>())
            .field("channels", &self.channels)
            .finish()
    }
}

type TableCache = RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>;

fn tables() -> &'static TableCache {
    static TABLES: OnceLock<TableCache> = OnceLock::new();
    TABLES.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Channel table for `P`, built on first use and cached for the process.
pub fn channel_table<P: Publisher>() -> Arc<ChannelTable<P>> {
    let key = TypeId::of::<P>();
    if let Some(cached) = cached_table::<P>(key) {
        return cached;
    }

    // Built outside the lock: describe_channels is user code.
    let mut table = ChannelTable::new();
    P::describe_channels(&mut table);
    let built = Arc::new(table);
    debug!(
        publisher = type_name::<P>(),
        channels = built.len(),
        "built channel table"
    );

    let erased = {
        let mut cache = tables().write();
        let built_erased: Arc<dyn Any + Send + Sync> = built.clone();
        Arc::clone(cache.entry(key).or_insert(built_erased))
    };
    // Another thread may have won the race; both tables are equivalent.
    erased.downcast::<ChannelTable<P>>().unwrap_or(built)
}

fn cached_table<P: Publisher>(key: TypeId) -> Option<Arc<ChannelTable<P>>> {
    let cached = Arc::clone(tables().read().get(&key)?);
    cached.downcast::<ChannelTable<P>>().ok()
}
