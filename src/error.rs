//! Error types for the resource tree engine.
//!
//! This module contains the error taxonomy used throughout the crate. The
//! engine fails fast and loud on configuration mistakes, and is a pure
//! pass-through for transport-level failures.
//!
//! # Error Handling
//!
//! Configuration errors (`Misconfigured`, `Unconfigured`, `UnknownOperation`)
//! surface before any transport work happens. Transport failures are never
//! caught, retried, or reinterpreted by the engine; handlers wrap them with
//! [`Error::transport`] and they cross the dispatch boundary unchanged.
//!
//! # Example
//!
//! ```rust
//! use restree::{Api, Error};
//!
//! # tokio_test::block_on(async {
//! let api: Api<()> = Api::new();
//! let companies = api.resource("companies");
//!
//! // No operation registered, no factory configured.
//! let result = companies.invoke("index", vec![]).await;
//! assert!(matches!(result, Err(Error::UnknownOperation { .. })));
//! # });
//! ```

use thiserror::Error;

/// A boxed, thread-safe error produced by an injected transport.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by resource composition and dispatch.
///
/// Each variant carries enough context to be actionable without inspecting
/// the call site. Dispatch-time variants are distinguishable from transport
/// failures, which always arrive as [`Error::Transport`].
#[derive(Debug, Error)]
pub enum Error {
    /// No requester factory was available at dispatch time.
    ///
    /// Raised before any handler executes, when neither a per-resource
    /// factory override nor a default factory on the [`Api`](crate::Api)
    /// context has been configured.
    #[error("no requester factory configured. Call `Api::configure` (or set `ResourceOptions::factory`) before dispatching operations.")]
    Misconfigured,

    /// An endpoint was executed with no handler ever attached.
    ///
    /// Endpoints are created as stubs and fail at execute time, not at
    /// registration time. Attach request logic with
    /// [`Endpoint::request`](crate::Endpoint::request).
    #[error("endpoint has no handler attached. Call `Endpoint::request` before invoking the operation.")]
    Unconfigured,

    /// The invoked operation code was never registered on the node.
    ///
    /// Member-scope operations only exist on member nodes, so invoking one
    /// on the collection node also reports this error.
    #[error("unknown operation '{code}' on resource '{path}'. The code was never registered at this scope.")]
    UnknownOperation {
        /// The operation code that was invoked.
        code: String,
        /// The path of the node the invocation was made on.
        path: String,
    },

    /// A constructor parameter could not be serialized.
    #[error("constructor parameter '{key}' is not serializable")]
    InvalidParam {
        /// The parameter key that failed.
        key: String,
        /// The underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// A failure produced by the injected transport, passed through verbatim.
    #[error(transparent)]
    Transport(BoxError),
}

impl Error {
    /// Wraps a transport failure for pass-through propagation.
    ///
    /// # Example
    ///
    /// ```rust
    /// use restree::Error;
    ///
    /// let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
    /// let err = Error::transport(io);
    /// assert!(matches!(err, Error::Transport(_)));
    /// ```
    pub fn transport(err: impl Into<BoxError>) -> Self {
        Self::Transport(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_misconfigured_error_message() {
        let message = Error::Misconfigured.to_string();
        assert!(message.contains("requester factory"));
        assert!(message.contains("Api::configure"));
    }

    #[test]
    fn test_unconfigured_error_message() {
        let message = Error::Unconfigured.to_string();
        assert!(message.contains("no handler attached"));
        assert!(message.contains("Endpoint::request"));
    }

    #[test]
    fn test_unknown_operation_error_message() {
        let error = Error::UnknownOperation {
            code: "archive".to_string(),
            path: "companies/1".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("archive"));
        assert!(message.contains("companies/1"));
    }

    #[test]
    fn test_transport_error_passes_message_through() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "connection timed out");
        let error = Error::transport(io);
        assert_eq!(error.to_string(), "connection timed out");
    }

    #[test]
    fn test_error_implements_std_error() {
        let error = Error::Misconfigured;
        let _: &dyn std::error::Error = &error;
    }
}
