//! Remote data source module.
//!
//! This module provides the `ApiClient` for talking to the catalog backend.
//! Every request is a POST carrying an `action` tag, the query criteria and
//! the session identity; every response is a `ResponseEnvelope`.
//!
//! The coordinators only see the `RemoteSource` trait, so tests can swap in
//! an in-process source.

pub mod client;
pub mod endpoints;
pub mod envelope;
pub mod error;
pub mod remote;

pub use client::ApiClient;
pub use endpoints::{Endpoint, EndpointResolver};
pub use envelope::ResponseEnvelope;
pub use error::TransportError;
pub use remote::{actions, RemoteSource};
