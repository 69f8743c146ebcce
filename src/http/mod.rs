//! Outbound HTTP: the decorated transport chain and the typed JSON
//! executor built on top of it.

pub mod client_factory;
pub mod endpoint;
pub mod middleware;
pub mod send_request;
pub mod transport;

pub use client_factory::{ClientFactory, ClientOptions};
pub use endpoint::endpoint;
pub use send_request::{HttpExecutor, SendRequest};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, ResponseBody, Transport};
