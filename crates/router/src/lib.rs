//! Fragment-driven router.
//!
//! The host owns a navigation fragment ([`Location`]) and tells the router
//! whenever it changes. Each change goes through the same pipeline: parse,
//! before-guards (any may cancel), commit, handler or not-found handler,
//! active marker, after-hooks.

mod fragment;
mod hooks;
mod location;
mod router;

pub use fragment::{DEFAULT_PATH, Params, Route, parse_fragment, percent_decode};
pub use hooks::{AfterHook, BeforeGuard, NotFoundHandler, RouteHandler, Transition};
pub use location::{FragmentChanges, Location, MemoryLocation};
pub use router::{Navigation, Router};
