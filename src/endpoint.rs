//! Named, rebindable units of request-issuing logic.
//!
//! An [`Endpoint`] holds exactly one user-supplied handler. Endpoints are
//! created as stubs, registered on resources, and given request logic later
//! via [`Endpoint::request`] — in any order. Cloning an endpoint clones a
//! *handle*: all clones share one handler slot, which is what lets a globally
//! registered method receive its handler after resources were already built
//! from it.
//!
//! At dispatch time the engine builds a [`Context`] carrying the transient
//! requester, the node's path, and the constructor parameters, and calls
//! [`Endpoint::execute`]. Before-hooks registered on the
//! [`Api`](crate::Api) context run first, in registration order; the first
//! hook returning a value short-circuits the handler entirely.
//!
//! # Example
//!
//! ```rust
//! use restree::{Api, Endpoint};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let api: Api<()> = Api::new();
//! api.configure(|_path| ());
//!
//! let mut companies = api.resource("companies");
//! let endpoint = companies.collection("index");
//!
//! // Attach the handler after registration; last write wins.
//! endpoint.request(|_ctx, _args| async move { Ok(json!(["acme"])) });
//!
//! let result = companies.invoke("index", vec![]).await.unwrap();
//! assert_eq!(result, json!(["acme"]));
//! # });
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::{Map, Value};

use crate::error::Error;

/// The argument vector passed from a generated operation to its handler.
pub type CallArgs = Vec<Value>;

/// Constructor parameters merged into every execution context.
pub type Params = Map<String, Value>;

/// The pending result a handler returns.
///
/// The engine never awaits anything else; the requester call inside the
/// handler is the only asynchronous boundary.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Value, Error>> + Send>>;

/// A global interception hook consulted before any handler runs.
///
/// Receives the node path and the call arguments. Returning `Some(value)`
/// short-circuits dispatch: the value becomes the operation's result and the
/// real handler is skipped.
pub type BeforeHook = Arc<dyn Fn(&str, &CallArgs) -> Option<Value> + Send + Sync>;

type HandlerFn<R> = Arc<dyn Fn(Context<R>, CallArgs) -> HandlerFuture + Send + Sync>;

/// The execution context handed to every handler.
///
/// Bundles the transient requester built for the node's current path with
/// the constructor parameters the resource was created with. The requester
/// is re-created on every invocation, so it always reflects the node's path
/// and any per-resource factory override.
pub struct Context<R> {
    requester: R,
    path: String,
    params: Params,
    hooks: Vec<BeforeHook>,
}

impl<R> Context<R> {
    pub(crate) fn new(requester: R, path: String, params: Params, hooks: Vec<BeforeHook>) -> Self {
        Self {
            requester,
            path,
            params,
            hooks,
        }
    }

    /// Returns the transport handle built for this invocation.
    #[must_use]
    pub const fn requester(&self) -> &R {
        &self.requester
    }

    /// Consumes the context and returns the transport handle.
    ///
    /// Convenient for handlers that move the requester into an async block.
    #[must_use]
    pub fn into_requester(self) -> R {
        self.requester
    }

    /// Returns the path of the node the operation was invoked on.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the constructor parameters of the resource.
    #[must_use]
    pub const fn params(&self) -> &Params {
        &self.params
    }

    /// Looks up a single constructor parameter by key.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }
}

impl<R: std::fmt::Debug> std::fmt::Debug for Context<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("requester", &self.requester)
            .field("path", &self.path)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// A named, bindable unit of request logic.
///
/// `Endpoint` is a shared handle: `clone()` produces another handle to the
/// same handler slot, and [`request`](Self::request) through any handle is
/// visible through all of them. An endpoint with no handler fails at execute
/// time with [`Error::Unconfigured`], not at creation time.
pub struct Endpoint<R> {
    handler: Arc<RwLock<Option<HandlerFn<R>>>>,
}

impl<R> Clone for Endpoint<R> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<R> Default for Endpoint<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Endpoint<R> {
    /// Creates an endpoint stub with no handler attached.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handler: Arc::new(RwLock::new(None)),
        }
    }

    /// Sets or replaces the handler. Chainable; last write wins.
    ///
    /// The handler receives the execution [`Context`] and the call
    /// arguments, and its result is propagated verbatim — the engine never
    /// awaits, wraps, or transforms it.
    pub fn request<F, Fut>(&self, handler: F) -> &Self
    where
        F: Fn(Context<R>, CallArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, Error>> + Send + 'static,
    {
        let wrapped: HandlerFn<R> = Arc::new(move |ctx, args| Box::pin(handler(ctx, args)));
        *self
            .handler
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(wrapped);
        self
    }

    /// Returns `true` once a handler has been attached.
    #[must_use]
    pub fn has_handler(&self) -> bool {
        self.handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Returns `true` if two handles point at the same handler slot.
    #[must_use]
    pub fn shares_handler_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.handler, &other.handler)
    }

    /// Runs before-hooks, then the attached handler.
    ///
    /// Hooks run in registration order; the first one returning a value
    /// becomes the result and the handler is skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unconfigured`] if no handler was ever attached.
    /// Handler errors propagate unchanged.
    pub async fn execute(&self, ctx: Context<R>, args: CallArgs) -> Result<Value, Error> {
        for hook in &ctx.hooks {
            if let Some(value) = hook(&ctx.path, &args) {
                tracing::debug!(path = %ctx.path, "before-hook short-circuited dispatch");
                return Ok(value);
            }
        }

        let handler = self
            .handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(Error::Unconfigured)?;

        handler(ctx, args).await
    }
}

impl<R> std::fmt::Debug for Endpoint<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("has_handler", &self.has_handler())
            .finish()
    }
}

// Verify handles are Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Endpoint<()>>();
    assert_send_sync::<Context<()>>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx_with_hooks(hooks: Vec<BeforeHook>) -> Context<()> {
        Context::new((), "companies".to_string(), Params::new(), hooks)
    }

    fn ctx() -> Context<()> {
        ctx_with_hooks(Vec::new())
    }

    #[tokio::test]
    async fn test_execute_without_handler_is_unconfigured() {
        let endpoint: Endpoint<()> = Endpoint::new();
        let result = endpoint.execute(ctx(), vec![]).await;
        assert!(matches!(result, Err(Error::Unconfigured)));
    }

    #[tokio::test]
    async fn test_execute_runs_attached_handler() {
        let endpoint: Endpoint<()> = Endpoint::new();
        endpoint.request(|_ctx, args| async move { Ok(json!({ "args": args })) });

        let result = endpoint.execute(ctx(), vec![json!(1)]).await.unwrap();
        assert_eq!(result, json!({ "args": [1] }));
    }

    #[tokio::test]
    async fn test_request_last_write_wins() {
        let endpoint: Endpoint<()> = Endpoint::new();
        endpoint.request(|_ctx, _args| async move { Ok(json!("first")) });
        endpoint.request(|_ctx, _args| async move { Ok(json!("second")) });

        let result = endpoint.execute(ctx(), vec![]).await.unwrap();
        assert_eq!(result, json!("second"));
    }

    #[tokio::test]
    async fn test_cloned_handles_share_handler_slot() {
        let endpoint: Endpoint<()> = Endpoint::new();
        let clone = endpoint.clone();
        assert!(!clone.has_handler());

        endpoint.request(|_ctx, _args| async move { Ok(json!("shared")) });
        assert!(clone.has_handler());
        assert!(endpoint.shares_handler_with(&clone));

        let result = clone.execute(ctx(), vec![]).await.unwrap();
        assert_eq!(result, json!("shared"));
    }

    #[tokio::test]
    async fn test_first_hook_result_short_circuits_handler() {
        let endpoint: Endpoint<()> = Endpoint::new();
        endpoint.request(|_ctx, _args| async move { Ok(json!("handler")) });

        let hooks: Vec<BeforeHook> = vec![
            Arc::new(|_path, _args| None),
            Arc::new(|_path, _args| Some(json!("hook-b"))),
            Arc::new(|_path, _args| Some(json!("hook-c"))),
        ];

        let result = endpoint
            .execute(ctx_with_hooks(hooks), vec![])
            .await
            .unwrap();
        assert_eq!(result, json!("hook-b"));
    }

    #[tokio::test]
    async fn test_hooks_receive_path_and_args() {
        let endpoint: Endpoint<()> = Endpoint::new();

        let hooks: Vec<BeforeHook> = vec![Arc::new(|path, args| {
            Some(json!({ "path": path, "args": args }))
        })];

        let result = endpoint
            .execute(ctx_with_hooks(hooks), vec![json!("x")])
            .await
            .unwrap();
        assert_eq!(result, json!({ "path": "companies", "args": ["x"] }));
    }

    #[tokio::test]
    async fn test_handler_error_propagates_verbatim() {
        let endpoint: Endpoint<()> = Endpoint::new();
        endpoint.request(|_ctx, _args| async move {
            Err(Error::transport(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "refused",
            )))
        });

        let result = endpoint.execute(ctx(), vec![]).await;
        match result {
            Err(Error::Transport(e)) => assert_eq!(e.to_string(), "refused"),
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[test]
    fn test_context_exposes_params() {
        let mut params = Params::new();
        params.insert("singular".to_string(), json!("company"));
        let ctx = Context::new((), "companies".to_string(), params, Vec::new());

        assert_eq!(ctx.path(), "companies");
        assert_eq!(ctx.param("singular"), Some(&json!("company")));
        assert_eq!(ctx.param("missing"), None);
    }
}
