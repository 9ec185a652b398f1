//! Typed HTTP plumbing: routes, prepared requests, and the resilient client.

pub mod client;
pub mod endpoint;

pub use client::{
    ApiClient, HttpTransport, RawResponse, StubTransport, Transport, retrying, retrying_with,
};
pub use endpoint::{Endpoint, PreparedRequest, RequestBody};
