//! End-to-end tests over real HTTP against the mock server.
//!
//! # Design
//! Each test starts its own mock server on a random port in a background
//! tokio runtime, then drives the blocking client through `UreqTransport`.
//! This covers what stubs cannot: ureq's handling of status codes, HEAD,
//! timeouts and refused connections.

use std::net::SocketAddr;
use std::time::Duration;

use reqlite_core::{pretty, CookieStore, Error, RequestBuilder};
use serde_json::json;

/// Start the mock server on a random port and return its address.
fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

fn base() -> String {
    format!("http://{}", start_server())
}

#[test]
fn get_succeeds() {
    let resp = reqlite_core::get(format!("{}/get", base())).send().unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.json().unwrap()["method"], "GET");
}

#[test]
fn params_are_merged_into_the_url() {
    let base = base();
    let resp = reqlite_core::get(format!("{base}/get"))
        .params([("name", "brenton"), ("library", "tiny-request")])
        .send()
        .unwrap();
    assert_eq!(resp.url(), format!("{base}/get?name=brenton&library=tiny-request"));
    assert_eq!(resp.json().unwrap()["args"]["library"][0], "tiny-request");
}

#[test]
fn response_headers_are_lowercased() {
    let resp = reqlite_core::get(format!("{}/response-headers", base()))
        .param("Test-Header", "value")
        .send()
        .unwrap();
    assert_eq!(resp.headers().get("test-header"), Some("value"));
    assert!(resp.headers().iter().all(|(k, _)| k == k.to_ascii_lowercase()));
}

#[test]
fn json_is_populated() {
    let resp = reqlite_core::get(format!("{}/json", base())).send().unwrap();
    assert!(resp.json().unwrap().get("slideshow").is_some());
}

#[test]
fn not_found_returns_a_response() {
    let resp = reqlite_core::get(format!("{}/status/404", base())).send().unwrap();
    assert_eq!(resp.status(), 404);
    assert!(resp.headers().get("content-type").unwrap().contains("text/plain"));
    assert!(resp.json().is_none());
}

#[test]
fn json_post_sets_content_type() {
    let resp = reqlite_core::post(format!("{}/post", base()))
        .json(&json!({"name": "Brenton"}))
        .send()
        .unwrap();
    let body = resp.json().unwrap();
    assert_eq!(body["json"]["name"], "Brenton");
    assert_eq!(body["headers"]["content-type"][0], "application/json");
    assert_eq!(resp.request().headers().get("Content-type"), Some("application/json"));
}

#[test]
fn form_post_is_encoded() {
    let resp = reqlite_core::post(format!("{}/post", base()))
        .form([("name", "test-user")])
        .send()
        .unwrap();
    assert_eq!(resp.json().unwrap()["form"]["name"], json!(["test-user"]));
}

#[test]
fn text_post_is_sent_verbatim() {
    let resp = reqlite_core::request(format!("{}/anything", base()))
        .method("PATCH")
        .data("The test suite was executed!")
        .send()
        .unwrap();
    let body = resp.json().unwrap();
    assert_eq!(body["method"], "PATCH");
    assert_eq!(body["data"], "The test suite was executed!");
}

#[test]
fn extension_methods_are_sent() {
    let resp = reqlite_core::request(format!("{}/anything", base()))
        .method("purge")
        .send()
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.json().unwrap()["method"], "PURGE");
}

#[test]
fn redirects_are_followed() {
    let base = base();
    let resp = reqlite_core::get(format!("{base}/redirect-to"))
        .param("url", format!("{base}/get?landed=yes"))
        .send()
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.url(), format!("{base}/get?landed=yes"));
}

#[test]
fn redirect_chain_is_followed() {
    let base = base();
    let resp = reqlite_core::get(format!("{base}/redirect/3")).send().unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.url(), format!("{base}/get"));
}

#[test]
fn redirects_can_be_disabled() {
    let base = base();
    let resp = reqlite_core::get(format!("{base}/redirect-to"))
        .param("url", format!("{base}/get"))
        .redirect(false)
        .send()
        .unwrap();
    assert_eq!(resp.status(), 302);
    assert_eq!(resp.headers().get("location"), Some(format!("{base}/get").as_str()));
}

#[test]
fn cookies_persist_through_a_passed_store() {
    let base = base();
    let first = reqlite_core::get(format!("{base}/cookies/set"))
        .param("cookie", "test")
        .redirect(false)
        .send()
        .unwrap();
    assert_eq!(first.status(), 302);

    let second = reqlite_core::get(format!("{base}/cookies"))
        .cookie_store(first.cookie_store().clone())
        .send()
        .unwrap();
    assert_eq!(second.json().unwrap()["cookie"], "test");
}

#[test]
fn cookies_set_during_redirect_are_sent_on_the_next_hop() {
    let store = CookieStore::new();
    let resp = reqlite_core::get(format!("{}/cookies/set", base()))
        .params([("a", "1"), ("b", "2")])
        .cookie_store(store.clone())
        .send()
        .unwrap();
    assert_eq!(resp.json().unwrap(), &json!({"a": "1", "b": "2"}));
    assert_eq!(store.len(), 2);
}

#[test]
fn basic_auth_is_accepted() {
    let resp = reqlite_core::get(format!("{}/basic-auth/user/passwd", base()))
        .basic_auth("user", "passwd")
        .send()
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.json().unwrap()["authorized"], true);

    let resp = reqlite_core::get(format!("{}/basic-auth/user/passwd", base()))
        .basic_auth("user", "wrong")
        .send()
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[test]
fn gzip_is_decompressed() {
    let resp = reqlite_core::get(format!("{}/gzip", base()))
        .header("Accept-Encoding", "gzip")
        .send()
        .unwrap();
    assert_eq!(resp.headers().get("content-encoding"), Some("gzip"));
    assert_eq!(resp.json().unwrap()["gzipped"], true);
}

#[test]
fn uncompressed_error_body_with_gzip_accepted() {
    let resp = reqlite_core::get(format!("{}/status/418", base()))
        .header("Accept-Encoding", "gzip")
        .send()
        .unwrap();
    assert_eq!(resp.status(), 418);
    assert_eq!(resp.content(), b"I'm a teapot!");
}

#[test]
fn malformed_json_is_an_error() {
    let err = reqlite_core::get(format!("{}/malformed-json", base()))
        .send()
        .unwrap_err();
    assert!(matches!(err, Error::JsonDecodeFailure(_)));
}

#[test]
fn head_has_empty_content() {
    let resp = reqlite_core::request(format!("{}/get", base()))
        .method("HEAD")
        .send()
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.content().is_empty());
}

#[test]
fn slow_responses_time_out() {
    let err = reqlite_core::get(format!("{}/delay/3", base()))
        .timeout(Duration::from_secs(1))
        .send()
        .unwrap_err();
    assert!(matches!(err, Error::TimeoutExceeded(_)), "{err:?}");
}

#[test]
fn refused_connection_is_a_connection_failure() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let err = reqlite_core::get(format!("http://{addr}/")).send().unwrap_err();
    assert!(matches!(err, Error::ConnectionFailure(_)), "{err:?}");
}

#[test]
fn pretty_output_shows_headers_and_body() {
    let resp = reqlite_core::get(format!("{}/status/418", base())).send().unwrap();

    let full = pretty::render(&resp, false);
    assert!(full.starts_with("\x1b[34m418 \x1b[0mI'm a teapot\n"));
    assert!(full.contains("text/plain; charset=utf-8"));
    assert!(full.contains("I'm a teapot!"));

    let headers_only = pretty::render(&resp, true);
    assert!(headers_only.contains("text/plain; charset=utf-8"));
    assert!(!headers_only.contains("I'm a teapot!"));
}

#[test]
fn builder_validation_matches_executor() {
    let err = RequestBuilder::new(format!("{}/post", base()))
        .json(&json!({"name": "Brenton"}))
        .send()
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}
