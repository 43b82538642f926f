//! The unified response value and body decoding.

use std::borrow::Cow;
use std::io::Read;

use flate2::read::GzDecoder;
use serde_json::Value;

use crate::cookie::CookieStore;
use crate::error::{Error, Result};
use crate::http::{Headers, HttpResponse};
use crate::request::Request;

/// Outcome of a call, whatever the status code.
///
/// Header names are lowercase. `json` is present only when the server sent a
/// JSON content type and a non-empty body.
#[derive(Debug, Clone)]
pub struct Response {
    request: Request,
    content: Vec<u8>,
    json: Option<Value>,
    status: u16,
    url: String,
    headers: Headers,
    cookie_store: CookieStore,
}

impl Response {
    /// Decode what the transport ended on.
    ///
    /// HEAD responses always get an empty body. A `content-encoding` mentioning
    /// gzip is inflated first; a `content-type` mentioning `application/json`
    /// is then parsed. Neither check is case-sensitive.
    pub(crate) fn decode(request: Request, raw: HttpResponse) -> Result<Self> {
        let headers = raw.headers.lowercased();

        let mut content = if request.method() == "HEAD" {
            Vec::new()
        } else {
            raw.body
        };

        let encoding = headers.get("content-encoding").unwrap_or_default();
        if !content.is_empty() && encoding.to_ascii_lowercase().contains("gzip") {
            content = gunzip(&content)?;
        }

        let content_type = headers.get("content-type").unwrap_or_default();
        let json = if !content.is_empty() && content_type.to_ascii_lowercase().contains("application/json") {
            Some(serde_json::from_slice(&content).map_err(Error::JsonDecodeFailure)?)
        } else {
            None
        };

        let cookie_store = request.cookie_store().clone();
        Ok(Self {
            request,
            content,
            json,
            status: raw.status,
            url: raw.url,
            headers,
            cookie_store,
        })
    }

    /// The normalized request that started the exchange.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Body bytes, decompressed if the server gzipped them.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn into_content(self) -> Vec<u8> {
        self.content
    }

    /// Body as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }

    pub fn json(&self) -> Option<&Value> {
        self.json.as_ref()
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Canonical reason phrase for the status, empty when unknown.
    pub fn reason(&self) -> &'static str {
        ::http::StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("")
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// URL of the last hop, after any followed redirects.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Response headers with lowercase names.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// The store used for the call; pass it to the next request to keep cookies.
    pub fn cookie_store(&self) -> &CookieStore {
        &self.cookie_store
    }
}

fn gunzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(Error::ContentDecodeFailure)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::write::GzEncoder;
    use flate2::Compression;
    use serde_json::json;

    use super::*;
    use crate::request::RequestBuilder;

    fn get() -> Request {
        RequestBuilder::new("http://example.com/").build().unwrap()
    }

    fn raw(status: u16, headers: &[(&str, &str)], body: &[u8]) -> HttpResponse {
        HttpResponse {
            url: "http://example.com/".to_string(),
            status,
            headers: headers.iter().copied().collect(),
            body: body.to_vec(),
        }
    }

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn header_names_are_lowercased() {
        let resp = Response::decode(get(), raw(200, &[("X-Thing", "A")], b"")).unwrap();
        assert_eq!(resp.headers().iter().next(), Some(("x-thing", "A")));
    }

    #[test]
    fn json_is_parsed_case_insensitively() {
        let resp = Response::decode(
            get(),
            raw(200, &[("Content-Type", "Application/JSON; charset=utf-8")], br#"{"a":1}"#),
        )
        .unwrap();
        assert_eq!(resp.json(), Some(&json!({"a": 1})));
    }

    #[test]
    fn empty_json_body_has_no_value() {
        let resp = Response::decode(get(), raw(204, &[("content-type", "application/json")], b"")).unwrap();
        assert!(resp.json().is_none());
    }

    #[test]
    fn non_json_content_type_has_no_value() {
        let resp = Response::decode(get(), raw(200, &[("content-type", "text/plain")], br#"{"a":1}"#)).unwrap();
        assert!(resp.json().is_none());
        assert_eq!(resp.text(), r#"{"a":1}"#);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = Response::decode(get(), raw(200, &[("content-type", "application/json")], b"{nope"))
            .unwrap_err();
        assert!(matches!(err, Error::JsonDecodeFailure(_)));
    }

    #[test]
    fn gzip_body_is_inflated_before_json() {
        let body = gzip(br#"{"gzipped":true}"#);
        let resp = Response::decode(
            get(),
            raw(200, &[("Content-Encoding", "GZIP"), ("Content-Type", "application/json")], &body),
        )
        .unwrap();
        assert_eq!(resp.content(), br#"{"gzipped":true}"#);
        assert_eq!(resp.json(), Some(&json!({"gzipped": true})));
    }

    #[test]
    fn corrupt_gzip_is_an_error() {
        let err = Response::decode(get(), raw(200, &[("content-encoding", "gzip")], b"not gzip"))
            .unwrap_err();
        assert!(matches!(err, Error::ContentDecodeFailure(_)));
    }

    #[test]
    fn head_body_is_always_empty() {
        let head = RequestBuilder::new("http://example.com/").method("HEAD").build().unwrap();
        let resp = Response::decode(head, raw(200, &[("content-type", "application/json")], b"{}")).unwrap();
        assert!(resp.content().is_empty());
        assert!(resp.json().is_none());
    }

    #[test]
    fn reason_phrase() {
        let resp = Response::decode(get(), raw(418, &[], b"")).unwrap();
        assert_eq!(resp.reason(), "I'm a teapot");
        assert!(!resp.is_success());

        let resp = Response::decode(get(), raw(299, &[], b"")).unwrap();
        assert_eq!(resp.reason(), "");
        assert!(resp.is_success());
    }
}
