//! The initialization-once configuration context.
//!
//! An [`Api`] bundles the three process-wide concerns of the engine into one
//! explicit, cheaply-cloneable object: the default requester factory, the
//! global [`MethodRegistry`], and the before-hook pipeline. Resources are
//! created *through* the context and keep a handle to it, which is how
//! registry replay and factory resolution reach every node in a tree.
//!
//! The intended usage is "configure once at startup, dispatch concurrently
//! after": configure the factory and register global methods before the
//! first resource is created or the first operation dispatched. Mutation is
//! not guarded beyond interior locking; there is no protection against
//! racing registration with dispatch.
//!
//! A process that wants exactly one context stores it in its own `OnceLock`:
//!
//! ```rust
//! use std::sync::OnceLock;
//! use restree::Api;
//!
//! static API: OnceLock<Api<()>> = OnceLock::new();
//!
//! let api = API.get_or_init(|| {
//!     let api = Api::new();
//!     api.configure(|_path| ());
//!     api
//! });
//! let companies = api.resource("companies");
//! assert_eq!(companies.path(), "companies");
//! ```

use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;

use crate::endpoint::{BeforeHook, CallArgs};
use crate::registry::MethodRegistry;
use crate::resource::{Resource, ResourceOptions};

/// The requester provider contract: given a resource path, produce a
/// transport handle.
///
/// The engine never inspects the produced value; it only stores it in the
/// execution context for the handler to use. A fresh requester is built on
/// every invocation, so it always reflects the node's current path.
pub type RequesterFactory<R> = Arc<dyn Fn(&str) -> R + Send + Sync>;

struct ApiInner<R> {
    factory: RwLock<Option<RequesterFactory<R>>>,
    methods: MethodRegistry<R>,
    hooks: RwLock<Vec<BeforeHook>>,
}

/// The configuration context resources are created through.
///
/// `Api` is a handle (`Clone` shares the same context). The generic
/// parameter `R` is the requester type the configured factory produces;
/// handlers receive it through [`Context`](crate::Context) and know its
/// concrete shape — the engine does not.
pub struct Api<R> {
    inner: Arc<ApiInner<R>>,
}

impl<R> Clone for Api<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R> Default for Api<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Api<R> {
    /// Creates an empty context: no factory, no global methods, no hooks.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ApiInner {
                factory: RwLock::new(None),
                methods: MethodRegistry::new(),
                hooks: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Sets or replaces the default requester factory.
    ///
    /// Dispatching any operation before a factory is configured (and without
    /// a per-resource override) fails with
    /// [`Error::Misconfigured`](crate::Error::Misconfigured).
    pub fn configure<F>(&self, factory: F)
    where
        F: Fn(&str) -> R + Send + Sync + 'static,
    {
        *self
            .inner
            .factory
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(factory));
    }

    /// Returns `true` once a default factory has been configured.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.inner
            .factory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// The global method registry replayed onto every resource this context
    /// creates.
    #[must_use]
    pub fn methods(&self) -> &MethodRegistry<R> {
        &self.inner.methods
    }

    /// Appends a global before-hook.
    ///
    /// Hooks run in registration order on every dispatch; the first hook
    /// returning a value becomes the result and the handler is skipped.
    /// Useful for cross-cutting interception (test stubbing, auth
    /// injection) without touching individual handlers.
    pub fn before<H>(&self, hook: H)
    where
        H: Fn(&str, &CallArgs) -> Option<Value> + Send + Sync + 'static,
    {
        self.inner
            .hooks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(hook));
    }

    /// Creates a root resource node at `path` with default options.
    #[must_use]
    pub fn resource(&self, path: impl Into<String>) -> Resource<R> {
        self.resource_with(path, ResourceOptions::new())
    }

    /// Creates a root resource node with constructor parameters and an
    /// optional per-resource requester factory.
    #[must_use]
    pub fn resource_with(&self, path: impl Into<String>, options: ResourceOptions<R>) -> Resource<R> {
        Resource::create(self.clone(), path.into(), options)
    }

    pub(crate) fn default_factory(&self) -> Option<RequesterFactory<R>> {
        self.inner
            .factory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn hooks(&self) -> Vec<BeforeHook> {
        self.inner
            .hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<R> std::fmt::Debug for Api<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Api")
            .field("configured", &self.is_configured())
            .field("methods", &self.inner.methods)
            .finish_non_exhaustive()
    }
}

// Verify the context is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Api<()>>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_context_is_unconfigured() {
        let api: Api<()> = Api::new();
        assert!(!api.is_configured());
        assert!(api.methods().is_empty());
    }

    #[test]
    fn test_configure_sets_the_default_factory() {
        let api: Api<String> = Api::new();
        api.configure(|path| format!("requester for {path}"));
        assert!(api.is_configured());

        let factory = api.default_factory().unwrap();
        assert_eq!(factory("companies"), "requester for companies");
    }

    #[test]
    fn test_configure_replaces_the_previous_factory() {
        let api: Api<&'static str> = Api::new();
        api.configure(|_path| "first");
        api.configure(|_path| "second");

        let factory = api.default_factory().unwrap();
        assert_eq!(factory("companies"), "second");
    }

    #[test]
    fn test_hooks_keep_registration_order() {
        let api: Api<()> = Api::new();
        api.before(|_path, _args| Some(json!("a")));
        api.before(|_path, _args| Some(json!("b")));

        let hooks = api.hooks();
        let args = CallArgs::new();
        assert_eq!(hooks.len(), 2);
        assert_eq!(hooks[0]("p", &args), Some(json!("a")));
        assert_eq!(hooks[1]("p", &args), Some(json!("b")));
    }

    #[test]
    fn test_clones_share_the_same_context() {
        let api: Api<()> = Api::new();
        let clone = api.clone();
        clone.configure(|_path| ());
        assert!(api.is_configured());
    }
}
