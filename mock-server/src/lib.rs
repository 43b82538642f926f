use std::{collections::BTreeMap, io::Write, time::Duration};

use axum::{
    body::Bytes,
    extract::{Path, Query},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{any, get, patch, post, put},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use flate2::{write::GzEncoder, Compression};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// Longest delay `/delay/{secs}` will honor.
pub const MAX_DELAY_SECS: u64 = 10;

type Pairs = Query<Vec<(String, String)>>;

#[derive(Deserialize)]
pub struct RedirectTo {
    pub url: String,
    pub status_code: Option<u16>,
}

pub fn app() -> Router {
    Router::new()
        .route("/get", get(echo))
        .route("/post", post(echo_body))
        .route("/put", put(echo_body))
        .route("/patch", patch(echo_body))
        .route("/anything", any(echo_body))
        .route("/status/{code}", any(status))
        .route("/redirect-to", any(redirect_to))
        .route("/redirect/{n}", get(redirect_n))
        .route("/cookies", get(cookies))
        .route("/cookies/set", get(set_cookies))
        .route("/basic-auth/{user}/{passwd}", get(basic_auth))
        .route("/gzip", get(gzip))
        .route("/json", get(sample_json))
        .route("/malformed-json", get(malformed_json))
        .route("/delay/{secs}", get(delay))
        .route("/response-headers", get(response_headers))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn multimap(pairs: impl IntoIterator<Item = (String, String)>) -> BTreeMap<String, Vec<String>> {
    let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (k, v) in pairs {
        map.entry(k).or_default().push(v);
    }
    map
}

fn header_map(headers: &HeaderMap) -> BTreeMap<String, Vec<String>> {
    multimap(headers.iter().filter_map(|(name, value)| {
        value
            .to_str()
            .ok()
            .map(|v| (name.as_str().to_string(), v.to_string()))
    }))
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, Query(args): Pairs) -> Json<Value> {
    Json(json!({
        "method": method.as_str(),
        "args": multimap(args),
        "headers": header_map(&headers),
        "url": uri.to_string(),
    }))
}

async fn echo_body(method: Method, uri: Uri, headers: HeaderMap, Query(args): Pairs, body: Bytes) -> Json<Value> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let parsed_json = if content_type.starts_with("application/json") {
        serde_json::from_slice::<Value>(&body).unwrap_or(Value::Null)
    } else {
        Value::Null
    };
    let form = if content_type.starts_with("application/x-www-form-urlencoded") {
        serde_urlencoded::from_bytes::<Vec<(String, String)>>(&body)
            .map(multimap)
            .unwrap_or_default()
    } else {
        BTreeMap::new()
    };

    Json(json!({
        "method": method.as_str(),
        "args": multimap(args),
        "headers": header_map(&headers),
        "url": uri.to_string(),
        "json": parsed_json,
        "form": form,
        "data": String::from_utf8_lossy(&body),
    }))
}

async fn status(Path(code): Path<u16>) -> Response {
    let Ok(status) = StatusCode::from_u16(code) else {
        return (StatusCode::BAD_REQUEST, "invalid status code").into_response();
    };
    let body = match status {
        StatusCode::IM_A_TEAPOT => "I'm a teapot!".to_string(),
        other => other.canonical_reason().unwrap_or_default().to_string(),
    };
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}

fn found(location: &str, code: u16) -> Response {
    let status = StatusCode::from_u16(code)
        .ok()
        .filter(StatusCode::is_redirection)
        .unwrap_or(StatusCode::FOUND);
    match HeaderValue::from_str(location) {
        Ok(location) => (status, [(header::LOCATION, location)]).into_response(),
        Err(_) => (StatusCode::BAD_REQUEST, "invalid location").into_response(),
    }
}

async fn redirect_to(Query(target): Query<RedirectTo>) -> Response {
    found(&target.url, target.status_code.unwrap_or(302))
}

async fn redirect_n(Path(n): Path<u32>) -> Response {
    if n <= 1 {
        found("/get", 302)
    } else {
        found(&format!("/redirect/{}", n - 1), 302)
    }
}

async fn cookies(headers: HeaderMap) -> Json<Value> {
    let mut received = BTreeMap::new();
    for value in headers.get_all(header::COOKIE) {
        let Ok(value) = value.to_str() else { continue };
        for pair in value.split(';') {
            if let Some((name, value)) = pair.trim().split_once('=') {
                received.insert(name.to_string(), value.to_string());
            }
        }
    }
    Json(json!(received))
}

async fn set_cookies(Query(pairs): Pairs) -> Response {
    let mut response = found("/cookies", 302);
    for (name, value) in pairs {
        if let Ok(cookie) = HeaderValue::from_str(&format!("{name}={value}; Path=/")) {
            response.headers_mut().append(header::SET_COOKIE, cookie);
        }
    }
    response
}

async fn basic_auth(Path((user, passwd)): Path<(String, String)>, headers: HeaderMap) -> Response {
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
        .and_then(|token| STANDARD.decode(token).ok())
        .and_then(|raw| String::from_utf8(raw).ok());

    if presented.as_deref() == Some(format!("{user}:{passwd}").as_str()) {
        Json(json!({ "authorized": true, "user": user })).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Basic realm=\"Fake Realm\"")],
            Json(json!({ "authorized": false, "user": "" })),
        )
            .into_response()
    }
}

async fn gzip(headers: HeaderMap) -> Response {
    let payload = json!({ "gzipped": true, "headers": header_map(&headers) }).to_string();
    match compress(payload.as_bytes()) {
        Ok(body) => (
            [
                (header::CONTENT_TYPE, "application/json; encoding=utf-8"),
                (header::CONTENT_ENCODING, "gzip"),
            ],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "gzip encoding failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn compress(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

async fn sample_json() -> Json<Value> {
    Json(json!({
        "slideshow": {
            "author": "Yours Truly",
            "date": "date of publication",
            "title": "Sample Slide Show",
            "slides": [
                { "title": "Wake up to WonderWidgets!", "type": "all" },
                {
                    "title": "Overview",
                    "type": "all",
                    "items": ["Why <em>WonderWidgets</em> are great", "Who <em>buys</em> WonderWidgets"]
                }
            ]
        }
    }))
}

async fn malformed_json() -> Response {
    ([(header::CONTENT_TYPE, "application/json")], r#"{"truncated": "#).into_response()
}

async fn delay(Path(secs): Path<u64>) -> Json<Value> {
    let secs = secs.min(MAX_DELAY_SECS);
    tracing::debug!(secs, "delaying response");
    tokio::time::sleep(Duration::from_secs(secs)).await;
    Json(json!({ "delayed": secs }))
}

async fn response_headers(Query(pairs): Pairs) -> Response {
    let mut response = Json(json!(multimap(pairs.clone()))).into_response();
    for (name, value) in pairs {
        if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(&value)) {
            response.headers_mut().append(name, value);
        }
    }
    response
}
