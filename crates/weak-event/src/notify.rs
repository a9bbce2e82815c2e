#![forbid(unsafe_code)]

//! Well-known notification shapes.
//!
//! Publishers implementing [`NotifyPropertyChanged`] or
//! [`NotifyCollectionChanged`] can be subscribed to without a by-name
//! lookup: the [`Registry`](crate::Registry) attaches straight to the
//! accessor's channel.

use std::borrow::Cow;

use crate::channel::Event;

/// A named property of the sender changed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyChanged {
    /// Name of the property. Empty means "all properties".
    pub property: Cow<'static, str>,
}

impl PropertyChanged {
    /// Notification for a single property.
    pub fn new(property: impl Into<Cow<'static, str>>) -> Self {
        Self {
            property: property.into(),
        }
    }

    /// Notification that every property may have changed.
    #[must_use]
    pub fn all() -> Self {
        Self {
            property: Cow::Borrowed(""),
        }
    }

    /// True for the "all properties" notification or an exact name match.
    #[must_use]
    pub fn affects(&self, property: &str) -> bool {
        self.property.is_empty() || self.property == property
    }
}

/// Publisher with a property-changed channel.
pub trait NotifyPropertyChanged: Send + Sync + Sized + 'static {
    /// The channel raised after a property changes.
    fn property_changed(&self) -> &Event<Self, PropertyChanged>;
}

/// Change applied to an indexed collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionChanged {
    /// `count` items inserted starting at `index`.
    Added { index: usize, count: usize },
    /// `count` items removed starting at `index`.
    Removed { index: usize, count: usize },
    /// `count` items replaced starting at `index`.
    Replaced { index: usize, count: usize },
    /// One item moved from `from` to `to`.
    Moved { from: usize, to: usize },
    /// Contents changed wholesale.
    Reset,
}

/// Publisher with a collection-changed channel.
pub trait NotifyCollectionChanged: Send + Sync + Sized + 'static {
    /// The channel raised after the collection changes.
    fn collection_changed(&self) -> &Event<Self, CollectionChanged>;
}
