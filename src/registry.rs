//! Global method registry: define an operation once, mix it into every
//! resource.
//!
//! A [`MethodRegistry`] maps an operation code and a [`Scope`] to an
//! [`Endpoint`]. Every node created through the owning [`Api`](crate::Api)
//! context replays the registry onto itself at creation time, *before* local
//! registrations run — so a resource-local registration of the same code
//! always shadows the global one.
//!
//! Replay shares the same `Endpoint` handle rather than copying it:
//! attaching a handler to the globally registered endpoint after resources
//! were created still affects every resource built from it.
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
//! // Define `index` for every future resource.
//! api.methods()
//!     .collection("index")
//!     .request(|ctx, _args| {
//!         let path = ctx.path().to_string();
//!         async move { Ok(json!({ "listing": path })) }
//!     });
//!
//! let companies = api.resource("companies");
//! let users = api.resource("users");
//!
//! let listed = companies.invoke("index", vec![]).await.unwrap();
//! assert_eq!(listed, json!({ "listing": "companies" }));
//! let listed = users.invoke("index", vec![]).await.unwrap();
//! assert_eq!(listed, json!({ "listing": "users" }));
//! # });
//! ```

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use crate::endpoint::Endpoint;
use crate::resource::Resource;

/// The two scopes an operation can be registered at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Directly callable on the resource node itself.
    Collection,
    /// Bound onto every member node produced from the resource.
    Member,
}

impl Scope {
    /// Returns the scope name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Collection => "collection",
            Self::Member => "member",
        }
    }
}

/// A table of globally defined operations, replayed onto every new resource.
///
/// Obtained via [`Api::methods`](crate::Api::methods). Registration is a
/// setup-phase activity: register and attach handlers before dispatching
/// concurrently.
pub struct MethodRegistry<R> {
    entries: RwLock<BTreeMap<String, (Scope, Endpoint<R>)>>,
}

impl<R> MethodRegistry<R> {
    pub(crate) fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Registers a collection-scope operation available on every future
    /// resource. Returns the endpoint handle for `.request(…)` chaining.
    pub fn collection(&self, code: impl Into<String>) -> Endpoint<R> {
        self.register(Scope::Collection, code.into())
    }

    /// Registers a member-scope operation available on every future member
    /// node. Returns the endpoint handle for `.request(…)` chaining.
    pub fn member(&self, code: impl Into<String>) -> Endpoint<R> {
        self.register(Scope::Member, code.into())
    }

    /// Returns the scope a code is registered at, if any.
    #[must_use]
    pub fn scope_of(&self, code: &str) -> Option<Scope> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(code)
            .map(|(scope, _)| *scope)
    }

    /// Returns the number of registered operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if no operations have been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Registering the same code twice replaces the entry; the endpoint
    // handle returned first is detached from the registry at that point.
    fn register(&self, scope: Scope, code: String) -> Endpoint<R> {
        let endpoint = Endpoint::new();
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(code, (scope, endpoint.clone()));
        endpoint
    }

    /// Replays every registered entry onto a node, sharing endpoint handles.
    ///
    /// Runs automatically at the end of node creation, before any local
    /// registration, so locals shadow globals by code.
    pub(crate) fn apply(&self, node: &mut Resource<R>) {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        for (code, (scope, endpoint)) in entries.iter() {
            match scope {
                Scope::Collection => {
                    node.collection_endpoint(code.clone(), endpoint.clone());
                }
                Scope::Member => {
                    node.member_endpoint(code.clone(), endpoint.clone());
                }
            }
        }
    }
}

impl<R> std::fmt::Debug for MethodRegistry<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_map()
            .entries(entries.iter().map(|(code, (scope, _))| (code, scope.as_str())))
            .finish()
    }
}

// Verify the registry is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<MethodRegistry<()>>();
    assert_send_sync::<Scope>();
};
