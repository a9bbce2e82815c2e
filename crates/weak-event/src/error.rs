#![forbid(unsafe_code)]

//! Errors raised while creating a subscription.
//!
//! Only construction can fail. Dispatch and detach treat a reclaimed
//! publisher or callback as an ordinary outcome and never surface it.

use thiserror::Error;

/// Failure to create a weak subscription.
///
/// A failed subscribe leaves nothing attached to the channel and no entry
/// in the [`Registry`](crate::Registry).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WeakEventError {
    /// The publisher or the callback was already gone when the
    /// subscription was constructed.
    #[error("invalid argument: {what} is no longer reachable")]
    InvalidArgument {
        /// Which endpoint was missing (`"publisher"` or `"handler"`).
        what: &'static str,
    },

    /// No channel with this name is registered for the publisher type.
    #[error("unknown channel `{channel}` on {publisher}")]
    UnknownChannel {
        /// Type name of the publisher.
        publisher: &'static str,
        /// Name that failed to resolve.
        channel: String,
    },

    /// The channel exists but carries a different argument type than the
    /// callback expects.
    #[error("channel `{channel}` on {publisher} does not deliver {expected}")]
    ShapeMismatch {
        /// Type name of the publisher.
        publisher: &'static str,
        /// Name of the channel.
        channel: String,
        /// Argument type the callback was written for.
        expected: &'static str,
    },
}

impl WeakEventError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// ```
    /// use weak_event::WeakEventError;
    ///
    /// let err = WeakEventError::InvalidArgument { what: "publisher" };
    /// assert_eq!(err.as_label(), "invalid_argument");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            WeakEventError::InvalidArgument { .. } => "invalid_argument",
            WeakEventError::UnknownChannel { .. } => "unknown_channel",
            WeakEventError::ShapeMismatch { .. } => "shape_mismatch",
        }
    }
}
