//! Callbacks the router drives during a transition.
//!
//! Each trait is implemented for plain closures returning a future, so
//! `router.on("stats", |params: Params| async move { ... })` works without
//! a named type. Closures receive owned arguments.

use std::future::Future;

use crate::{Params, Route};

/// A transition about to happen, as seen by before-guards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub to: Route,
    /// Currently resolved path, `None` before the first transition.
    pub from: Option<String>,
}

#[async_trait::async_trait]
pub trait RouteHandler: Send + Sync {
    async fn handle(&self, params: &Params);
}

#[async_trait::async_trait]
impl<F, Fut> RouteHandler for F
where
    F: Fn(Params) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, params: &Params) {
        self(params.clone()).await;
    }
}

#[async_trait::async_trait]
pub trait NotFoundHandler: Send + Sync {
    async fn not_found(&self, path: &str);
}

#[async_trait::async_trait]
impl<F, Fut> NotFoundHandler for F
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn not_found(&self, path: &str) {
        self(path.to_string()).await;
    }
}

/// Runs before a transition commits. Returning `false` cancels it.
#[async_trait::async_trait]
pub trait BeforeGuard: Send + Sync {
    async fn allow(&self, transition: &Transition) -> bool;
}

#[async_trait::async_trait]
impl<F, Fut> BeforeGuard for F
where
    F: Fn(Transition) -> Fut + Send + Sync,
    Fut: Future<Output = bool> + Send + 'static,
{
    async fn allow(&self, transition: &Transition) -> bool {
        self(transition.clone()).await
    }
}

/// Runs after a transition committed; cannot cancel.
#[async_trait::async_trait]
pub trait AfterHook: Send + Sync {
    async fn after(&self, to: &str, from: Option<&str>);
}

#[async_trait::async_trait]
impl<F, Fut> AfterHook for F
where
    F: Fn(String, Option<String>) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn after(&self, to: &str, from: Option<&str>) {
        self(to.to_string(), from.map(str::to_string)).await;
    }
}
