//! Redirect following for transports that put one hop on the wire at a time.
//!
//! [`follow`] drives the chain: it attaches stored cookies to each hop (unless
//! the caller set `Cookie` explicitly), hands the hop to a single-exchange
//! function with whatever is left of the time budget, merges `Set-Cookie`
//! lines into the store, and builds the next hop when the answer is a
//! followable redirect:
//! - 303 switches to GET (HEAD stays HEAD); 301 and 302 switch POST to GET
//! - 307 and 308 keep the method and body
//! - a rewritten method drops the body and its content headers
//! - `Authorization` is stripped once the chain leaves the original origin

use std::time::{Duration, Instant};

use url::Url;

use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{TransportError, TransportOptions};

const CONTENT_HEADERS: &[&str] = &["content-type", "content-length"];

pub(crate) fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

/// Run `request` to completion through `exchange`, following at most
/// `max_redirects` redirects when `options` asks for it.
///
/// Past the limit the last redirect response is returned as-is. A budget that
/// runs out between hops is a [`TransportError::Timeout`].
pub(crate) fn follow<F>(
    request: &HttpRequest,
    options: &TransportOptions,
    max_redirects: u32,
    mut exchange: F,
) -> Result<HttpResponse, TransportError>
where
    F: FnMut(&HttpRequest, Duration) -> Result<HttpResponse, TransportError>,
{
    let deadline = Instant::now() + options.timeout;
    let caller_cookie = request.headers.contains("cookie");
    let origin = Url::parse(&request.url)
        .map_err(|e| TransportError::InvalidRequest(format!("invalid URL {:?}: {e}", request.url)))?;

    let mut url = origin.clone();
    let mut hop = request.clone();
    let mut redirects = 0;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(TransportError::Timeout);
        }

        if !caller_cookie {
            hop.headers.remove("cookie");
            if let Some(cookies) = options.cookies.cookie_header(&url) {
                hop.headers.insert("cookie", cookies);
            }
        }

        tracing::debug!(method = %hop.method, url = %hop.url, "sending request");
        let response = exchange(&hop, remaining)?;
        tracing::debug!(status = response.status, url = %hop.url, "received response");

        options
            .cookies
            .store_response_cookies(&url, response.headers.get_all("set-cookie"));

        if !options.follow_redirects {
            return Ok(response);
        }
        let Some((target, next)) = next_hop(&origin, &url, &hop, &response) else {
            return Ok(response);
        };
        if redirects >= max_redirects {
            tracing::warn!(limit = max_redirects, url = %url, "redirect limit reached");
            return Ok(response);
        }

        redirects += 1;
        tracing::debug!(status = response.status, from = %url, to = %target, "following redirect");
        url = target;
        hop = next;
    }
}

/// Build the request for the next hop, or `None` when `response` is not a
/// followable redirect.
///
/// `origin` is the URL of the first hop; `current` the URL `request` was sent to.
pub(crate) fn next_hop(
    origin: &Url,
    current: &Url,
    request: &HttpRequest,
    response: &HttpResponse,
) -> Option<(Url, HttpRequest)> {
    if !is_redirect(response.status) {
        return None;
    }
    let location = response.headers.get("location")?;
    let target = match current.join(location.trim()) {
        Ok(target) if matches!(target.scheme(), "http" | "https") => target,
        Ok(target) => {
            tracing::debug!(target = %target, "not following redirect to unsupported scheme");
            return None;
        }
        Err(e) => {
            tracing::debug!(location, error = %e, "not following unparsable redirect location");
            return None;
        }
    };

    let mut next = HttpRequest {
        method: request.method.clone(),
        url: target.to_string(),
        headers: request.headers.clone(),
        body: request.body.clone(),
    };

    let rewrite_to_get = match response.status {
        303 => request.method != "HEAD" && request.method != "GET",
        301 | 302 => request.method == "POST",
        _ => false,
    };
    if rewrite_to_get {
        next.method = "GET".to_string();
        next.body.clear();
        for name in CONTENT_HEADERS {
            next.headers.remove(name);
        }
    }

    if !same_origin(origin, &target) && next.headers.remove("authorization") {
        tracing::debug!(target = %target, "stripped authorization on cross-origin redirect");
    }

    Some((target, next))
}

fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
}
