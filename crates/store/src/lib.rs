//! Keyed observable state container.
//!
//! A [`Store`] maps keys to values and tells interested parties about every
//! update:
//! - [`Store::set_state`] runs middleware, then subscribers of that key, then
//!   wildcard subscribers;
//! - [`Store::batch_update`] applies several keys and notifies only wildcard
//!   subscribers, once.
//!
//! Reads return independent copies ([`Snapshot`]), so nothing outside the
//! store can mutate it except through `set_state`/`batch_update`.

mod dispatch;
mod middleware;
mod snapshot;
mod store;
mod subscription;

pub use middleware::{LoggingMiddleware, Middleware, MiddlewareContext, MiddlewareId};
pub use snapshot::Snapshot;
pub use store::Store;
pub use subscription::{Change, Disposer};
