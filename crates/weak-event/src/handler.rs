#![forbid(unsafe_code)]

//! Callback types.

use std::sync::Arc;

/// Canonical callback shape: `(sender, args)`.
pub type HandlerFn<P, A> = dyn Fn(&P, &A) + Send + Sync;

/// Strongly held callback. The [`Registry`](crate::Registry) keeps this
/// `Arc`; subscriptions only ever see it through a `Weak`.
pub type Handler<P, A> = Arc<HandlerFn<P, A>>;

/// Entry point attached to an args-only [`Signal`](crate::Signal).
pub type SignalFn<A> = dyn Fn(&A) + Send + Sync;

/// Wrap a closure as a [`Handler`].
pub fn handler<P, A, F>(f: F) -> Handler<P, A>
where
    P: 'static,
    A: 'static,
    F: Fn(&P, &A) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Callback that holds `target` weakly and calls `method` on it.
///
/// Once `target` has been dropped the callback does nothing. Owners that
/// keep their [`Registry`](crate::Registry) as a field should subscribe with
/// a bound callback instead of a closure capturing `Arc<Self>`, which would
/// form a cycle through the registry.
///
/// The returned callback stays reachable after `target` is gone, so a
/// subscription holding it never reports dead on its own. Prefer
/// [`Registry::subscribe_bound`](crate::Registry::subscribe_bound), which
/// also guards the subscription with `target`.
pub fn bind<T, P, A>(target: &Arc<T>, method: fn(&T, &P, &A)) -> Handler<P, A>
where
    T: Send + Sync + 'static,
    P: 'static,
    A: 'static,
{
    let target = Arc::downgrade(target);
    Arc::new(move |sender: &P, args: &A| {
        if let Some(target) = target.upgrade() {
            method(&target, sender, args);
        }
    })
}
