//! The transport seam and its default ureq implementation.
//!
//! # Design
//! A [`Transport`] carries out one logical request. It follows redirects
//! when the options ask for it, keeps the caller's [`CookieStore`] in step
//! with every hop, and never turns a status code into an error: whatever the
//! last server answered comes back as an [`HttpResponse`]. Its error type is
//! reserved for failures below HTTP (DNS, refused or reset connections, TLS,
//! timeouts) and for requests that cannot be put on the wire at all.

use std::error::Error as StdError;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use ureq::config::Config;
use ureq::tls::TlsConfig;
use ureq::Agent;

use crate::cookie::CookieStore;
use crate::http::{Headers, HttpRequest, HttpResponse};
use crate::redirect;

const USER_AGENT: &str = concat!("reqlite/", env!("CARGO_PKG_VERSION"));

/// Per-call settings derived from the normalized request.
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Verify the peer certificate chain and hostname.
    pub verify: bool,
    /// Upper bound for the whole call, redirects included.
    pub timeout: Duration,
    /// Follow 3xx responses instead of returning them.
    pub follow_redirects: bool,
    /// Store that supplies `Cookie` headers and receives `Set-Cookie` lines.
    pub cookies: CookieStore,
}

/// Failure reported by a transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("TLS failure: {0}")]
    Tls(String),

    #[error("exchange timed out")]
    Timeout,

    /// The request could not be expressed on the wire; nothing was sent.
    #[error("request cannot be sent: {0}")]
    InvalidRequest(String),
}

/// Something that can carry an [`HttpRequest`] through to a final response.
pub trait Transport {
    fn send(&self, request: &HttpRequest, options: &TransportOptions) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &HttpRequest, options: &TransportOptions) -> Result<HttpResponse, TransportError> {
        (**self).send(request, options)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: &HttpRequest, options: &TransportOptions) -> Result<HttpResponse, TransportError> {
        (**self).send(request, options)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&self, request: &HttpRequest, options: &TransportOptions) -> Result<HttpResponse, TransportError> {
        (**self).send(request, options)
    }
}

/// Blocking transport backed by `ureq`.
///
/// Each hop runs on a fresh agent that hands back every status as data and
/// leaves `Content-Encoding` alone, so the caller sees the body exactly as
/// sent. Redirects are followed hop by hop so that intermediate `Set-Cookie`
/// lines reach the store; the number of hops is capped by ureq's own default
/// redirect limit.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    user_agent: String,
    max_redirects: u32,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::with_user_agent(USER_AGENT)
    }

    /// Use `user_agent` for requests that do not set their own `User-Agent`.
    pub fn with_user_agent(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            max_redirects: Config::default().max_redirects(),
        }
    }

    /// Redirects followed before the last 3xx is returned as the response.
    pub fn max_redirects(&self) -> u32 {
        self.max_redirects
    }

    fn agent(&self, verify: bool, timeout: Duration) -> Agent {
        let tls = TlsConfig::builder().disable_verification(!verify).build();
        Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(0)
            .allow_non_standard_methods(true)
            .timeout_global(Some(timeout))
            .tls_config(tls)
            .build()
            .new_agent()
    }

    /// Put exactly one hop on the wire.
    fn exchange(&self, hop: &HttpRequest, verify: bool, timeout: Duration) -> Result<HttpResponse, TransportError> {
        let agent = self.agent(verify, timeout);

        let mut builder = ureq::http::Request::builder()
            .method(hop.method.as_str())
            .uri(hop.url.as_str());
        for (name, value) in hop.headers.iter() {
            builder = builder.header(name, value);
        }
        if !hop.headers.contains("user-agent") {
            builder = builder.header("user-agent", self.user_agent.as_str());
        }

        let result = if hop.body.is_empty() {
            builder.body(()).map(|req| agent.run(req))
        } else {
            builder.body(hop.body.as_slice()).map(|req| agent.run(req))
        };
        let mut response = result
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?
            .map_err(classify)?;

        let status = response.status().as_u16();
        let headers: Headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = if hop.method == "HEAD" {
            Vec::new()
        } else {
            response
                .body_mut()
                .with_config()
                .limit(u64::MAX)
                .read_to_vec()
                .map_err(classify)?
        };

        Ok(HttpResponse {
            url: hop.url.clone(),
            status,
            headers,
            body,
        })
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest, options: &TransportOptions) -> Result<HttpResponse, TransportError> {
        redirect::follow(request, options, self.max_redirects, |hop, remaining| {
            self.exchange(hop, options.verify, remaining)
        })
    }
}

fn classify(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Timeout(_) => TransportError::Timeout,
        ureq::Error::Io(e) if e.kind() == io::ErrorKind::TimedOut => TransportError::Timeout,
        ureq::Error::Tls(msg) => TransportError::Tls(msg.to_string()),
        ureq::Error::Rustls(e) => TransportError::Tls(e.to_string()),
        ureq::Error::Http(e) => TransportError::InvalidRequest(e.to_string()),
        ureq::Error::BadUri(msg) => TransportError::InvalidRequest(msg),
        other if mentions_certificate(&other) => TransportError::Tls(other.to_string()),
        other => TransportError::Connection(other.to_string()),
    }
}

/// Handshake failures from rustls often reach us wrapped in I/O errors
/// rather than as `ureq::Error::Rustls`; look for them anywhere in the chain.
fn mentions_certificate(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.to_string().to_ascii_lowercase().contains("certificate") {
            return true;
        }
        current = e.source();
    }
    false
}
