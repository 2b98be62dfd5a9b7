//! Resource nodes and the composition algorithm.
//!
//! A [`Resource`] is a node in a tree of REST paths. Operations are
//! registered against it at two scopes: collection-scope endpoints are
//! directly invokable on the node, member-scope endpoints are stored as
//! definitions and bound onto every member node produced by
//! [`Resource::item`]. Subresource templates registered with
//! [`Resource::subresources`] are re-rooted under every member node.
//!
//! Paths are immutable: extending a path always builds a new node, so a node
//! held elsewhere (in a closure, in a cache) never changes underneath its
//! holder.
//!
//! # Example
//!
//! ```rust
//! use restree::Api;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let api: Api<()> = Api::new();
//! api.configure(|_path| ());
//!
//! let mut users = api.resource("users");
//! users.collection("index")
//!     .request(|ctx, _args| {
//!         let path = ctx.path().to_string();
//!         async move { Ok(json!(path)) }
//!     });
//!
//! let mut companies = api.resource("companies");
//! companies.subresources([("users", users)]);
//!
//! let nested = companies.item(1);
//! let users = nested.subresource("users").unwrap();
//! assert_eq!(users.path(), "companies/1/users");
//! assert_eq!(users.invoke("index", vec![]).await.unwrap(), json!("companies/1/users"));
//! # });
//! ```

use std::collections::BTreeMap;
use std::fmt::Display;
use std::future::Future;

use serde::Serialize;
use serde_json::Value;

use crate::api::{Api, RequesterFactory};
use crate::endpoint::{CallArgs, Context, Endpoint, Params};
use crate::error::Error;

/// Constructor options for a resource: parameters merged into every
/// execution context, plus an optional per-resource requester factory that
/// overrides the context-wide default.
///
/// Options thread through composition: member nodes inherit them, so a
/// factory override set on a root applies to the whole subtree derived from
/// it.
pub struct ResourceOptions<R> {
    params: Params,
    factory: Option<RequesterFactory<R>>,
}

impl<R> ResourceOptions<R> {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self {
            params: Params::new(),
            factory: None,
        }
    }

    /// Adds a constructor parameter, validated at registration time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParam`] if the value fails to serialize.
    pub fn param(mut self, key: impl Into<String>, value: impl Serialize) -> Result<Self, Error> {
        let key = key.into();
        let value = serde_json::to_value(value).map_err(|source| Error::InvalidParam {
            key: key.clone(),
            source,
        })?;
        self.params.insert(key, value);
        Ok(self)
    }

    /// Sets a per-resource requester factory.
    ///
    /// Takes precedence over the [`Api`] default for every endpoint bound on
    /// the resource and its descendants.
    #[must_use]
    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&str) -> R + Send + Sync + 'static,
    {
        self.factory = Some(std::sync::Arc::new(factory));
        self
    }

    pub(crate) const fn params(&self) -> &Params {
        &self.params
    }

    pub(crate) fn factory_override(&self) -> Option<RequesterFactory<R>> {
        self.factory.clone()
    }
}

impl<R> Default for ResourceOptions<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for ResourceOptions<R> {
    fn clone(&self) -> Self {
        Self {
            params: self.params.clone(),
            factory: self.factory.clone(),
        }
    }
}

impl<R> std::fmt::Debug for ResourceOptions<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceOptions")
            .field("params", &self.params)
            .field("has_factory", &self.factory.is_some())
            .finish()
    }
}

/// A node in the resource tree: one REST path segment, collection or member.
///
/// Created through [`Api::resource`] (fresh root) or [`Resource::item`]
/// (derived member node). Registration methods take `&mut self`;
/// composition and dispatch take `&self`, so a fully configured tree can be
/// shared freely.
pub struct Resource<R> {
    api: Api<R>,
    path: String,
    options: ResourceOptions<R>,
    collection: BTreeMap<String, Endpoint<R>>,
    member_defs: BTreeMap<String, Endpoint<R>>,
    subresources: BTreeMap<String, Resource<R>>,
}

impl<R> Clone for Resource<R> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            path: self.path.clone(),
            options: self.options.clone(),
            collection: self.collection.clone(),
            member_defs: self.member_defs.clone(),
            subresources: self.subresources.clone(),
        }
    }
}

impl<R> Resource<R> {
    // Registry replay runs here, before any local registration can execute,
    // which is what lets locals shadow globals by code.
    pub(crate) fn create(api: Api<R>, path: String, options: ResourceOptions<R>) -> Self {
        debug_assert!(!path.is_empty(), "resource path must be non-empty");
        let mut node = Self {
            api: api.clone(),
            path,
            options,
            collection: BTreeMap::new(),
            member_defs: BTreeMap::new(),
            subresources: BTreeMap::new(),
        };
        api.methods().apply(&mut node);
        node
    }

    /// Returns the node's immutable path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Registers a fresh collection-scope endpoint under `code`, directly
    /// invokable on this node. Returns the endpoint for `.request(…)`
    /// chaining.
    pub fn collection(&mut self, code: impl Into<String>) -> Endpoint<R> {
        self.collection_endpoint(code, Endpoint::new())
    }

    /// Registers a pre-built collection-scope endpoint under `code`.
    ///
    /// Registering the same code again replaces the binding.
    pub fn collection_endpoint(
        &mut self,
        code: impl Into<String>,
        endpoint: Endpoint<R>,
    ) -> Endpoint<R> {
        self.collection.insert(code.into(), endpoint.clone());
        endpoint
    }

    /// Registers a fresh member-scope endpoint definition under `code`,
    /// bound onto every future member node derived from this node — never
    /// invokable on the collection node itself.
    pub fn member(&mut self, code: impl Into<String>) -> Endpoint<R> {
        self.member_endpoint(code, Endpoint::new())
    }

    /// Registers a pre-built member-scope endpoint definition under `code`.
    pub fn member_endpoint(
        &mut self,
        code: impl Into<String>,
        endpoint: Endpoint<R>,
    ) -> Endpoint<R> {
        self.member_defs.insert(code.into(), endpoint.clone());
        endpoint
    }

    /// Merges subresource templates into this node's definitions.
    ///
    /// Merges are additive across calls; registering the same name twice
    /// keeps the most recent template.
    pub fn subresources<I, S>(&mut self, templates: I)
    where
        I: IntoIterator<Item = (S, Resource<R>)>,
        S: Into<String>,
    {
        for (name, template) in templates {
            self.subresources.insert(name.into(), template);
        }
    }

    /// Returns a re-rooted subresource of a member node by name.
    #[must_use]
    pub fn subresource(&self, name: &str) -> Option<&Resource<R>> {
        self.subresources.get(name)
    }

    /// Declares several operations in one block.
    ///
    /// The builder receives a [`Definition`] exposing `collection` and
    /// `member` shortcuts that register an endpoint and attach its handler
    /// in one call.
    pub fn define<F>(&mut self, build: F)
    where
        F: FnOnce(&mut Definition<'_, R>),
    {
        let mut definition = Definition { node: self };
        build(&mut definition);
    }

    /// The composition step: derives a member node for `id`.
    ///
    /// The member node's path is `{path}/{id}`. Every member-scope endpoint
    /// definition on this node becomes directly invokable on the member
    /// node, and every subresource template is re-rooted under the member
    /// path. Each derivation is a fresh composition — sibling member nodes
    /// never share mutable state, and this node is left untouched.
    #[must_use]
    pub fn item(&self, id: impl Display) -> Resource<R> {
        let member_path = format!("{}/{id}", self.path);
        let mut node = Self::create(self.api.clone(), member_path, self.options.clone());

        // Member definitions bind after registry replay, shadowing any
        // global registration of the same code.
        for (code, endpoint) in &self.member_defs {
            node.collection.insert(code.clone(), endpoint.clone());
        }

        for (name, template) in &self.subresources {
            node.subresources
                .insert(name.clone(), template.rerooted(&node.path));
        }

        node
    }

    /// Returns `true` if `code` is directly invokable on this node.
    #[must_use]
    pub fn has_operation(&self, code: &str) -> bool {
        self.collection.contains_key(code)
    }

    /// The operation codes directly invokable on this node.
    pub fn operations(&self) -> impl Iterator<Item = &str> {
        self.collection.keys().map(String::as_str)
    }

    /// Dispatches a directly-invokable operation.
    ///
    /// Resolves the requester factory (per-resource override first, then
    /// the [`Api`] default), builds a fresh requester for this node's path,
    /// assembles the execution context, and executes the endpoint. The
    /// handler's result is returned unchanged.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownOperation`] if `code` was never registered at this
    ///   scope — raised before any factory resolution.
    /// - [`Error::Misconfigured`] if no factory is available — raised before
    ///   any handler executes.
    /// - [`Error::Unconfigured`] if the endpoint has no handler.
    /// - Handler and transport errors propagate verbatim.
    pub async fn invoke(&self, code: &str, args: CallArgs) -> Result<Value, Error> {
        let endpoint = self
            .collection
            .get(code)
            .ok_or_else(|| Error::UnknownOperation {
                code: code.to_string(),
                path: self.path.clone(),
            })?;

        let factory = self.requester_factory()?;
        let requester = factory(&self.path);
        tracing::debug!(code, path = %self.path, "dispatching operation");

        let ctx = Context::new(
            requester,
            self.path.clone(),
            self.options.params().clone(),
            self.api.hooks(),
        );
        endpoint.execute(ctx, args).await
    }

    fn requester_factory(&self) -> Result<RequesterFactory<R>, Error> {
        if let Some(factory) = self.options.factory_override() {
            return Ok(factory);
        }
        self.api.default_factory().ok_or_else(|| {
            tracing::warn!(path = %self.path, "dispatch with no requester factory configured");
            Error::Misconfigured
        })
    }

    // A fresh copy of a template, rooted under `prefix`. Endpoint handles
    // are shared; maps are owned, so the template never mutates.
    fn rerooted(&self, prefix: &str) -> Resource<R> {
        let mut copy = self.clone();
        copy.path = format!("{prefix}/{}", self.path);
        copy
    }
}

impl<R> std::fmt::Debug for Resource<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("path", &self.path)
            .field("collection", &self.collection.keys().collect::<Vec<_>>())
            .field("member_defs", &self.member_defs.keys().collect::<Vec<_>>())
            .field(
                "subresources",
                &self.subresources.keys().collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

/// The declaration context passed to [`Resource::define`].
///
/// Shortcuts bound to one node: each call registers an endpoint at the named
/// scope and attaches its handler immediately.
pub struct Definition<'a, R> {
    node: &'a mut Resource<R>,
}

impl<R> Definition<'_, R> {
    /// Registers a collection-scope operation with its handler.
    pub fn collection<F, Fut>(&mut self, code: impl Into<String>, handler: F) -> Endpoint<R>
    where
        F: Fn(Context<R>, CallArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, Error>> + Send + 'static,
    {
        let endpoint = self.node.collection(code);
        endpoint.request(handler);
        endpoint
    }

    /// Registers a member-scope operation with its handler.
    pub fn member<F, Fut>(&mut self, code: impl Into<String>, handler: F) -> Endpoint<R>
    where
        F: Fn(Context<R>, CallArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, Error>> + Send + 'static,
    {
        let endpoint = self.node.member(code);
        endpoint.request(handler);
        endpoint
    }
}

// Verify nodes are Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Resource<()>>();
    assert_send_sync::<ResourceOptions<()>>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn api() -> Api<()> {
        let api = Api::new();
        api.configure(|_path| ());
        api
    }

    #[test]
    fn test_root_and_member_paths() {
        let companies = api().resource("companies");
        assert_eq!(companies.path(), "companies");
        assert_eq!(companies.item(1).path(), "companies/1");
        assert_eq!(companies.item("acme").path(), "companies/acme");
    }

    #[test]
    fn test_item_leaves_parent_untouched() {
        let mut companies = api().resource("companies");
        companies.member("show");
        let first = companies.item(1);
        let second = companies.item(2);

        assert_eq!(companies.path(), "companies");
        assert_eq!(first.path(), "companies/1");
        assert_eq!(second.path(), "companies/2");
        assert!(first.has_operation("show"));
        assert!(second.has_operation("show"));
    }

    #[test]
    fn test_member_operation_absent_on_collection_node() {
        let mut companies = api().resource("companies");
        companies.member("show");

        assert!(!companies.has_operation("show"));
        assert!(companies.item(1).has_operation("show"));
    }

    #[test]
    fn test_subresource_rerooting() {
        let ctx = api();
        let users = ctx.resource("users");
        let mut companies = ctx.resource("companies");
        companies.subresources([("users", users)]);

        let member = companies.item(1);
        let users = member.subresource("users").unwrap();
        assert_eq!(users.path(), "companies/1/users");
        assert_eq!(users.item(2).path(), "companies/1/users/2");
    }

    #[test]
    fn test_subresources_merge_is_additive() {
        let ctx = api();
        let mut companies = ctx.resource("companies");
        companies.subresources([("users", ctx.resource("users"))]);
        companies.subresources([("comments", ctx.resource("comments"))]);

        let member = companies.item(1);
        assert!(member.subresource("users").is_some());
        assert!(member.subresource("comments").is_some());
    }

    #[test]
    fn test_duplicate_subresource_name_keeps_latest() {
        let ctx = api();
        let mut companies = ctx.resource("companies");
        companies.subresources([("people", ctx.resource("users"))]);
        companies.subresources([("people", ctx.resource("members"))]);

        let member = companies.item(1);
        assert_eq!(
            member.subresource("people").unwrap().path(),
            "companies/1/members"
        );
    }

    #[tokio::test]
    async fn test_invoke_unknown_operation() {
        let companies = api().resource("companies");
        let result = companies.invoke("index", vec![]).await;
        assert!(matches!(
            result,
            Err(Error::UnknownOperation { code, path }) if code == "index" && path == "companies"
        ));
    }

    #[tokio::test]
    async fn test_invoke_without_factory_is_misconfigured() {
        let api: Api<()> = Api::new();
        let mut companies = api.resource("companies");
        companies
            .collection("index")
            .request(|_ctx, _args| async move { Ok(json!("handler ran")) });

        // The handler never runs; the error surfaces first.
        let result = companies.invoke("index", vec![]).await;
        assert!(matches!(result, Err(Error::Misconfigured)));
    }

    #[tokio::test]
    async fn test_constructor_params_reach_the_context() {
        let api: Api<()> = Api::new();
        api.configure(|_path| ());
        let options = ResourceOptions::new().param("singular", "company").unwrap();
        let mut companies = api.resource_with("companies", options);

        companies.collection("index").request(|ctx, _args| {
            let singular = ctx.param("singular").cloned();
            async move { Ok(json!({ "singular": singular })) }
        });

        let result = companies.invoke("index", vec![]).await.unwrap();
        assert_eq!(result, json!({ "singular": "company" }));
    }

    #[tokio::test]
    async fn test_define_registers_both_scopes() {
        let mut companies = api().resource("companies");
        companies.define(|d| {
            d.collection("index", |_ctx, _args| async move { Ok(json!("index")) });
            d.member("show", |ctx, _args| {
                let path = ctx.path().to_string();
                async move { Ok(json!(path)) }
            });
        });

        assert_eq!(
            companies.invoke("index", vec![]).await.unwrap(),
            json!("index")
        );
        assert_eq!(
            companies.item(7).invoke("show", vec![]).await.unwrap(),
            json!("companies/7")
        );
    }

    #[test]
    fn test_invalid_param_fails_at_registration() {
        // A map with non-string keys cannot become a JSON value.
        let mut bad = std::collections::HashMap::new();
        bad.insert(vec![1u8], "x");

        let result = ResourceOptions::<()>::new().param("bad", bad);
        assert!(matches!(result, Err(Error::InvalidParam { key, .. }) if key == "bad"));
    }
}
