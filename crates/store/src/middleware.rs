use std::{fmt, hash::Hash};

use crate::Snapshot;

/// What a middleware sees for one `set_state`.
pub struct MiddlewareContext<'a, K, V> {
    pub key: &'a K,
    pub old_value: Option<&'a V>,
    pub new_value: &'a V,
    /// Whole state, already including `new_value`.
    pub state: &'a Snapshot<K, V>,
}

/// Observer that runs before any subscriber of a single-key update.
///
/// Middleware cannot veto or rewrite the update. Any `Fn(&MiddlewareContext)`
/// closure is a middleware.
pub trait Middleware<K, V>: Send + Sync {
    fn on_set(&self, ctx: &MiddlewareContext<'_, K, V>);
}

impl<K, V, F> Middleware<K, V> for F
where
    F: Fn(&MiddlewareContext<'_, K, V>) + Send + Sync,
{
    fn on_set(&self, ctx: &MiddlewareContext<'_, K, V>) {
        self(ctx);
    }
}

/// Handle returned by `use_middleware`, needed to remove it again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MiddlewareId(pub(crate) u64);

/// Logs every update at debug level.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingMiddleware;

impl<K, V> Middleware<K, V> for LoggingMiddleware
where
    K: fmt::Debug + Eq + Hash,
{
    fn on_set(&self, ctx: &MiddlewareContext<'_, K, V>) {
        tracing::debug!(
            key = ?ctx.key,
            replaced = ctx.old_value.is_some(),
            slots = ctx.state.len(),
            "state updated"
        );
    }
}
