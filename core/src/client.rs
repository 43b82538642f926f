//! The request executor.
//!
//! # Design
//! `Client` holds only its transport and carries no state between calls.
//! Cookie state lives in the caller's [`CookieStore`](crate::CookieStore),
//! which is handed to the transport together with the TLS, redirect and
//! timeout policy of the request. The transport follows redirects on its
//! own; whatever it ends on is decoded into a [`Response`], and its failures
//! are translated into [`Error`]s.

use crate::error::{Error, Result};
use crate::request::{Request, RequestBuilder};
use crate::response::Response;
use crate::transport::{Transport, TransportOptions, UreqTransport};

/// Stateless executor over a [`Transport`]; safe to share between threads
/// when the transport is.
#[derive(Debug, Clone, Default)]
pub struct Client<T = UreqTransport> {
    transport: T,
}

impl Client<UreqTransport> {
    pub fn new() -> Self {
        Self::with_transport(UreqTransport::new())
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Build `builder` and execute it.
    pub fn send(&self, builder: RequestBuilder) -> Result<Response> {
        self.execute(builder.build()?)
    }

    /// Run one call to completion.
    pub fn execute(&self, request: Request) -> Result<Response> {
        let options = TransportOptions {
            verify: request.verify(),
            timeout: request.timeout(),
            follow_redirects: request.follow_redirects(),
            cookies: request.cookie_store().clone(),
        };

        tracing::debug!(method = %request.method(), url = %request.url(), "executing request");
        let raw = self
            .transport
            .send(&request.to_http(), &options)
            .map_err(|e| Error::from_transport(e, request.timeout()))?;
        tracing::debug!(status = raw.status, url = %raw.url, "request finished");

        Response::decode(request, raw)
    }
}
