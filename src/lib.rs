//! # restree
//!
//! Declarative REST resource trees with injected transports.
//!
//! ## Overview
//!
//! This crate provides:
//! - Resource nodes composed into collection/member/subresource trees via
//!   [`Resource`] and [`Resource::item`]
//! - Named operations bound at two scopes ([`Resource::collection`],
//!   [`Resource::member`]) with rebindable handlers via [`Endpoint`]
//! - A global [`MethodRegistry`] mixing operations into every resource
//! - Requester injection through the [`Api`] context — the engine resolves
//!   the node's hierarchical path and hands a freshly built transport handle
//!   to the handler, but never speaks HTTP itself
//! - Global before-hooks for cross-cutting interception via [`Api::before`]
//!
//! ## Quick Start
//!
//! ```rust
//! use restree::Api;
//! use serde_json::json;
//!
//! // The requester type is yours: any value the handlers know how to use.
//! #[derive(Clone)]
//! struct Transport {
//!     base_url: String,
//! }
//!
//! # tokio_test::block_on(async {
//! let api: Api<Transport> = Api::new();
//! api.configure(|path| Transport {
//!     base_url: format!("https://api.example.com/{path}"),
//! });
//!
//! let mut companies = api.resource("companies");
//!
//! // Collection-scope: invokable on the node itself.
//! companies.collection("index").request(|ctx, _args| {
//!     let url = ctx.requester().base_url.clone();
//!     async move { Ok(json!({ "GET": url })) }
//! });
//!
//! // Member-scope: invokable only after instantiating with an id.
//! companies.member("show").request(|ctx, _args| {
//!     let url = ctx.requester().base_url.clone();
//!     async move { Ok(json!({ "GET": url })) }
//! });
//!
//! let listing = companies.invoke("index", vec![]).await.unwrap();
//! assert_eq!(listing, json!({ "GET": "https://api.example.com/companies" }));
//!
//! let shown = companies.item(1).invoke("show", vec![]).await.unwrap();
//! assert_eq!(shown, json!({ "GET": "https://api.example.com/companies/1" }));
//! # });
//! ```
//!
//! ## Subresources
//!
//! Subresource templates are re-rooted under every member node, recursively
//! and without shared mutable state:
//!
//! ```rust
//! use restree::Api;
//!
//! let api: Api<()> = Api::new();
//! let users = api.resource("users");
//! let mut companies = api.resource("companies");
//! companies.subresources([("users", users)]);
//!
//! let nested = companies.item(1);
//! assert_eq!(nested.subresource("users").unwrap().path(), "companies/1/users");
//! ```
//!
//! ## Design Principles
//!
//! - **No global state**: configuration lives in an explicit [`Api`] context,
//!   created once at startup and cloned (cheaply) wherever resources are built
//! - **Immutable paths**: extending a path always yields a new node
//! - **Opaque transport**: the requester is a generic parameter; the engine
//!   only builds it per-path and passes it along
//! - **Fail fast**: misconfiguration surfaces as typed errors before any
//!   transport work, never as a silent no-op
//! - **Pass-through errors**: transport failures cross the dispatch boundary
//!   unchanged

pub mod api;
pub mod endpoint;
pub mod error;
pub mod registry;
pub mod resource;

// Re-export the public surface at the crate root for convenience
pub use api::{Api, RequesterFactory};
pub use endpoint::{BeforeHook, CallArgs, Context, Endpoint, HandlerFuture, Params};
pub use error::{BoxError, Error};
pub use registry::{MethodRegistry, Scope};
pub use resource::{Definition, Resource, ResourceOptions};
