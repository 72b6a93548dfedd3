//! HTTP plumbing for checks
//!
//! Request construction is pure and lives in `request`; the network
//! boundary is the `Transport` trait.

pub mod mock;
pub mod request;
pub mod transport;

pub use request::{FilePayload, HttpRequest, HttpResponse, Method, RequestBody};
pub use transport::{ReqwestTransport, Transport, TransportError};
