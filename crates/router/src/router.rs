use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use crate::{
    AfterHook, BeforeGuard, DEFAULT_PATH, FragmentChanges, Location, NotFoundHandler,
    RouteHandler, Transition, parse_fragment,
};

/// What a resolved fragment led to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Navigation {
    /// A registered handler ran.
    Handled,
    /// No handler for the path; the not-found handler ran.
    NotFound,
    /// No handler and no not-found handler. The path still became current.
    Unmatched,
    /// A before-guard refused. Nothing changed.
    Cancelled,
}

/// Fragment-driven route table.
///
/// Registration takes `&mut self`; once built, share the router behind an
/// `Arc`. Transitions are serialized: a second `resolve` waits until the
/// running one (guards, handler, hooks) is over.
pub struct Router {
    location: Arc<dyn Location>,
    default_path: String,
    routes: HashMap<String, Arc<dyn RouteHandler>>,
    not_found: Option<Arc<dyn NotFoundHandler>>,
    guards: Vec<Arc<dyn BeforeGuard>>,
    hooks: Vec<Arc<dyn AfterHook>>,
    current: Mutex<Option<String>>,
    transition: tokio::sync::Mutex<()>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut paths: Vec<&String> = self.routes.keys().collect();
        paths.sort();
        f.debug_struct("Router")
            .field("default_path", &self.default_path)
            .field("routes", &paths)
            .field("guards", &self.guards.len())
            .field("hooks", &self.hooks.len())
            .field("current", &self.current_path())
            .finish_non_exhaustive()
    }
}

impl Router {
    pub fn new(location: Arc<dyn Location>) -> Self {
        Self {
            location,
            default_path: DEFAULT_PATH.to_string(),
            routes: HashMap::new(),
            not_found: None,
            guards: Vec::new(),
            hooks: Vec::new(),
            current: Mutex::new(None),
            transition: tokio::sync::Mutex::new(()),
        }
    }

    /// Path used for an empty fragment.
    pub fn with_default_path(mut self, path: impl Into<String>) -> Self {
        self.default_path = path.into();
        self
    }

    /// Registers the handler for `path`, replacing any previous one.
    pub fn on(&mut self, path: impl Into<String>, handler: impl RouteHandler + 'static) -> &mut Self {
        let path = path.into();
        if self.routes.insert(path.clone(), Arc::new(handler)).is_some() {
            tracing::debug!(%path, "route handler replaced");
        }
        self
    }

    pub fn not_found(&mut self, handler: impl NotFoundHandler + 'static) -> &mut Self {
        self.not_found = Some(Arc::new(handler));
        self
    }

    pub fn before_each(&mut self, guard: impl BeforeGuard + 'static) -> &mut Self {
        self.guards.push(Arc::new(guard));
        self
    }

    pub fn after_each(&mut self, hook: impl AfterHook + 'static) -> &mut Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    pub fn default_path(&self) -> &str {
        &self.default_path
    }

    /// Last committed path, `None` until the first transition commits.
    pub fn current_path(&self) -> Option<String> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Requests navigation to `path` by rewriting the fragment.
    ///
    /// The transition itself happens when the resulting change signal is
    /// resolved.
    pub fn navigate(&self, path: &str) {
        tracing::debug!(%path, "navigation requested");
        self.location.set_fragment(path);
    }

    /// Resolves the fragment the host booted with.
    pub async fn start(&self) -> Navigation {
        let fragment = self.location.fragment();
        tracing::info!(%fragment, "router started");
        self.resolve(&fragment).await
    }

    /// Resolves every fragment change until the stream closes.
    pub async fn run(&self, mut changes: FragmentChanges) {
        while let Some(fragment) = changes.recv().await {
            self.resolve(&fragment).await;
        }
        tracing::info!("fragment change stream closed");
    }

    /// Runs one full transition for `fragment`.
    ///
    /// Guards run first, one after the other; the first `false` cancels the
    /// transition before anything changes. Otherwise the path is committed,
    /// the handler (or not-found handler) runs, the path is marked active and
    /// after-hooks run with `(new, previous)`.
    pub async fn resolve(&self, fragment: &str) -> Navigation {
        let _transition = self.transition.lock().await;

        let route = parse_fragment(fragment, &self.default_path);
        let transition = Transition {
            to: route,
            from: self.current_path(),
        };

        for guard in &self.guards {
            if !guard.allow(&transition).await {
                tracing::debug!(
                    to = %transition.to.path,
                    from = ?transition.from,
                    "navigation cancelled by guard"
                );
                return Navigation::Cancelled;
            }
        }

        let Transition { to: route, from } = transition;
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(route.path.clone());

        let outcome = if let Some(handler) = self.routes.get(&route.path) {
            handler.handle(&route.params).await;
            Navigation::Handled
        } else if let Some(not_found) = &self.not_found {
            not_found.not_found(&route.path).await;
            Navigation::NotFound
        } else {
            tracing::warn!(path = %route.path, "no route and no not-found handler");
            Navigation::Unmatched
        };

        self.location.mark_active(&route.path);

        for hook in &self.hooks {
            hook.after(&route.path, from.as_deref()).await;
        }

        tracing::debug!(path = %route.path, ?from, ?outcome, "navigation committed");
        outcome
    }
}
