//! Small blocking HTTP client: one call in, one normalized response out.
//!
//! # Overview
//! [`request`] (or [`get`] / [`post`]) returns a [`RequestBuilder`] that takes
//! the whole call in one go: query params, a JSON or raw/form payload,
//! headers, method, basic auth, TLS verification, redirect policy, a
//! [`CookieStore`] and a timeout. Sending it yields a [`Response`] for every
//! status the server answers with; only connection-level failures,
//! bad arguments and undecodable bodies are [`Error`]s.
//!
//! ```no_run
//! let resp = reqlite_core::get("https://example.org/json")
//!     .param("page", "2")
//!     .send()?;
//! if resp.status() == 404 {
//!     println!("missing");
//! }
//! # Ok::<(), reqlite_core::Error>(())
//! ```
//!
//! # Design
//! - `Client` is stateless; the network sits behind the [`Transport`] trait,
//!   whose error type covers connection failures only.
//! - The default transport is [`UreqTransport`]; tests plug in stubs.
//! - The transport follows redirects and keeps the caller's store current on
//!   every hop, so intermediate `Set-Cookie` lines are not lost.

pub mod client;
pub mod cookie;
pub mod error;
pub mod http;
pub mod pretty;
mod redirect;
pub mod request;
pub mod response;
pub mod transport;

pub use client::Client;
pub use cookie::CookieStore;
pub use error::{Error, Result};
pub use http::{Headers, HttpRequest, HttpResponse};
pub use request::{Body, Data, Request, RequestBuilder, DEFAULT_TIMEOUT};
pub use response::Response;
pub use transport::{Transport, TransportError, TransportOptions, UreqTransport};

/// Start a request to `url` (GET unless changed with [`RequestBuilder::method`]).
pub fn request(url: impl Into<String>) -> RequestBuilder {
    RequestBuilder::new(url)
}

pub fn get(url: impl Into<String>) -> RequestBuilder {
    RequestBuilder::new(url)
}

pub fn post(url: impl Into<String>) -> RequestBuilder {
    RequestBuilder::new(url).method("POST")
}
