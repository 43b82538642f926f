//! Argument intake and request normalization.
//!
//! # Design
//! `RequestBuilder` only records what the caller asked for; every check and
//! every encoding step happens once in [`RequestBuilder::build`], before any
//! I/O. The result is an immutable [`Request`] that the executor dispatches
//! and that later rides along inside the [`Response`] for introspection.
//!
//! The payload is a tagged [`Body`] rather than something inspected at runtime:
//! the caller picks `json`, `data` or `form` explicitly.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::client::Client;
use crate::cookie::CookieStore;
use crate::error::{Error, Result};
use crate::http::{Headers, HttpRequest};
use crate::response::Response;
use crate::transport::Transport;

/// Timeout applied when the caller sets none (or sets zero).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const BODY_METHODS: &[&str] = &["POST", "PATCH", "PUT"];
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";

/// A raw (non-JSON) payload as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Data {
    /// Sent as UTF-8 bytes.
    Text(String),
    /// Sent unchanged.
    Bytes(Vec<u8>),
    /// Form-encoded, in the given order.
    Form(Vec<(String, String)>),
}

impl Data {
    pub fn is_empty(&self) -> bool {
        match self {
            Data::Text(s) => s.is_empty(),
            Data::Bytes(b) => b.is_empty(),
            Data::Form(f) => f.is_empty(),
        }
    }
}

impl From<&str> for Data {
    fn from(s: &str) -> Self {
        Data::Text(s.to_string())
    }
}

impl From<String> for Data {
    fn from(s: String) -> Self {
        Data::Text(s)
    }
}

impl From<Vec<u8>> for Data {
    fn from(b: Vec<u8>) -> Self {
        Data::Bytes(b)
    }
}

impl From<&[u8]> for Data {
    fn from(b: &[u8]) -> Self {
        Data::Bytes(b.to_vec())
    }
}

/// The payload of a normalized request.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    None,
    Json(Value),
    Raw(Vec<u8>),
    Form(Vec<(String, String)>),
}

/// Collects the arguments of one call. See [`RequestBuilder::build`] for the
/// normalization rules.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    url: String,
    params: Vec<(String, String)>,
    json: Option<std::result::Result<Value, String>>,
    data: Option<Data>,
    headers: Headers,
    method: String,
    verify: bool,
    redirect: bool,
    cookie_store: Option<CookieStore>,
    basic_auth: Option<(String, String)>,
    timeout: Option<Duration>,
}

impl RequestBuilder {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            params: Vec::new(),
            json: None,
            data: None,
            headers: Headers::new(),
            method: "GET".to_string(),
            verify: true,
            redirect: true,
            cookie_store: None,
            basic_auth: None,
            timeout: None,
        }
    }

    /// Append one query parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Append query parameters in iteration order.
    pub fn params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Send `value` as a JSON body.
    pub fn json<S: Serialize + ?Sized>(mut self, value: &S) -> Self {
        self.json = Some(serde_json::to_value(value).map_err(|e| e.to_string()));
        self
    }

    /// Send a raw body: text, bytes or a form.
    pub fn data(mut self, data: impl Into<Data>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Send form fields, `application/x-www-form-urlencoded`.
    pub fn form<K, V>(self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let fields = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.data(Data::Form(fields))
    }

    /// Set a header, replacing any earlier value with the same name in any casing.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in headers {
            self.headers.insert(k, v);
        }
        self
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Verify TLS certificates and hostnames. On by default.
    pub fn verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Follow redirects. On by default; when off, the 3xx response is returned.
    pub fn redirect(mut self, redirect: bool) -> Self {
        self.redirect = redirect;
        self
    }

    /// Read cookies from and record cookies into `store`.
    pub fn cookie_store(mut self, store: CookieStore) -> Self {
        self.cookie_store = Some(store);
        self
    }

    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some((username.into(), password.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Validate and normalize into a [`Request`].
    ///
    /// - the method is uppercased and must be an HTTP token
    /// - the URL must parse and use http or https; params are form-encoded
    ///   and appended in the order given
    /// - `json` and a non-empty `data` are mutually exclusive, and either one
    ///   requires POST, PATCH or PUT
    /// - `content-type` defaults to the payload's type unless the caller set one
    /// - basic auth fills `authorization` unless the caller set one
    ///
    /// Any violation is [`Error::InvalidArgument`].
    pub fn build(self) -> Result<Request> {
        let method = self.method.trim().to_ascii_uppercase();
        if method.is_empty() || !method.bytes().all(is_token_char) {
            return Err(Error::invalid(format!("invalid request method {:?}", self.method)));
        }

        let mut url = Url::parse(&self.url)
            .map_err(|e| Error::invalid(format!("invalid URL {:?}: {e}", self.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::invalid(format!("unsupported URL scheme {:?}", url.scheme())));
        }
        if !self.params.is_empty() {
            let encoded = serde_urlencoded::to_string(&self.params)
                .map_err(|e| Error::invalid(format!("cannot encode query parameters: {e}")))?;
            let query = match url.query() {
                Some(existing) if !existing.is_empty() => format!("{existing}&{encoded}"),
                _ => encoded,
            };
            url.set_query(Some(&query));
        }

        let data = self.data.filter(|d| !d.is_empty());
        if self.json.is_some() && data.is_some() {
            return Err(Error::invalid("cannot provide both json and data"));
        }
        if (self.json.is_some() || data.is_some()) && !BODY_METHODS.contains(&method.as_str()) {
            return Err(Error::invalid(format!(
                "request method must be POST, PATCH or PUT when json or data is provided, got {method}"
            )));
        }

        let mut headers = self.headers;
        for (name, value) in headers.iter() {
            ::http::HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| Error::invalid(format!("invalid header name {name:?}")))?;
            ::http::HeaderValue::from_str(value)
                .map_err(|_| Error::invalid(format!("invalid value for header {name:?}")))?;
        }

        let (body, content) = match (self.json, data) {
            (Some(json), _) => {
                let value = json.map_err(|e| Error::invalid(format!("cannot serialize json payload: {e}")))?;
                let bytes = serde_json::to_vec(&value)
                    .map_err(|e| Error::invalid(format!("cannot serialize json payload: {e}")))?;
                if !headers.contains("content-type") {
                    headers.insert("content-type", JSON_CONTENT_TYPE);
                }
                (Body::Json(value), bytes)
            }
            (None, Some(Data::Text(text))) => {
                let bytes = text.into_bytes();
                (Body::Raw(bytes.clone()), bytes)
            }
            (None, Some(Data::Bytes(bytes))) => (Body::Raw(bytes.clone()), bytes),
            (None, Some(Data::Form(fields))) => {
                let encoded = serde_urlencoded::to_string(&fields)
                    .map_err(|e| Error::invalid(format!("cannot encode form data: {e}")))?;
                if !headers.contains("content-type") {
                    headers.insert("content-type", FORM_CONTENT_TYPE);
                }
                (Body::Form(fields), encoded.into_bytes())
            }
            (None, None) => (Body::None, Vec::new()),
        };

        if let Some((username, password)) = self.basic_auth {
            if !headers.contains("authorization") {
                let token = STANDARD.encode(format!("{username}:{password}"));
                headers.insert("authorization", format!("Basic {token}"));
            }
        }

        let timeout = self
            .timeout
            .filter(|t| !t.is_zero())
            .unwrap_or(DEFAULT_TIMEOUT);

        Ok(Request {
            method,
            url,
            headers,
            body,
            content,
            verify: self.verify,
            follow_redirects: self.redirect,
            timeout,
            cookie_store: self.cookie_store.unwrap_or_default(),
        })
    }

    /// Build and execute with the default ureq transport.
    pub fn send(self) -> Result<Response> {
        Client::new().execute(self.build()?)
    }

    /// Build and execute with `client`.
    pub fn send_with<T: Transport>(self, client: &Client<T>) -> Result<Response> {
        client.execute(self.build()?)
    }
}

/// RFC 7230 `tchar`.
fn is_token_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

/// A validated, normalized request.
#[derive(Debug, Clone)]
pub struct Request {
    method: String,
    url: Url,
    headers: Headers,
    body: Body,
    content: Vec<u8>,
    verify: bool,
    follow_redirects: bool,
    timeout: Duration,
    cookie_store: CookieStore,
}

impl Request {
    pub fn builder(url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(url)
    }

    /// Uppercase method.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Requested URL with query parameters merged in.
    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Headers as sent on the first hop, caller casing preserved.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Encoded body bytes.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn verify(&self) -> bool {
        self.verify
    }

    pub fn follow_redirects(&self) -> bool {
        self.follow_redirects
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn cookie_store(&self) -> &CookieStore {
        &self.cookie_store
    }

    /// The first hop as plain wire data.
    pub(crate) fn to_http(&self) -> HttpRequest {
        HttpRequest {
            method: self.method.clone(),
            url: self.url.to_string(),
            headers: self.headers.clone(),
            body: self.content.clone(),
        }
    }
}
