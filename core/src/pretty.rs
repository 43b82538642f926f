//! Terminal rendering of a [`Response`].
//!
//! Status line, headers sorted by name, a blank line, then the body: JSON
//! pretty-printed when it parsed, raw text otherwise. Names and the status
//! code are highlighted with ANSI blue.

use crate::response::Response;

const RESET: &str = "\x1b[0m";
const HIGHLIGHT: &str = "\x1b[34m";

/// Render `response` for a terminal. With `headers_only` the body is left out.
pub fn render(response: &Response, headers_only: bool) -> String {
    let mut out = format!("{HIGHLIGHT}{} {RESET}{}\n", response.status(), response.reason());

    let mut headers: Vec<(&str, &str)> = response.headers().iter().collect();
    headers.sort_by(|a, b| a.0.cmp(b.0));
    for (name, value) in headers {
        out.push_str(&format!("{HIGHLIGHT}{name}{RESET}: {value}\n"));
    }

    if headers_only {
        return out;
    }

    out.push('\n');
    match response.json() {
        Some(json) => {
            let body = serde_json::to_string_pretty(json).unwrap_or_else(|_| json.to_string());
            out.push_str(&body);
        }
        None => out.push_str(&response.text()),
    }
    out.push('\n');
    out
}

/// Print [`render`] output to stdout.
pub fn print(response: &Response, headers_only: bool) {
    print!("{}", render(response, headers_only));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpResponse;
    use crate::request::RequestBuilder;

    fn response(headers: &[(&str, &str)], body: &[u8]) -> Response {
        let request = RequestBuilder::new("http://example.com/").build().unwrap();
        let raw = HttpResponse {
            url: "http://example.com/".into(),
            status: 200,
            headers: headers.iter().copied().collect(),
            body: body.to_vec(),
        };
        Response::decode(request, raw).unwrap()
    }

    #[test]
    fn status_line_and_sorted_headers() {
        let resp = response(&[("Server", "x"), ("Content-Type", "text/html; charset=utf-8")], b"<h1>hi</h1>");
        let out = render(&resp, false);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "\x1b[34m200 \x1b[0mOK");
        assert_eq!(lines[1], "\x1b[34mcontent-type\x1b[0m: text/html; charset=utf-8");
        assert_eq!(lines[2], "\x1b[34mserver\x1b[0m: x");
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], "<h1>hi</h1>");
    }

    #[test]
    fn json_is_indented() {
        let resp = response(&[("content-type", "application/json")], br#"{"a":1}"#);
        assert!(render(&resp, false).ends_with("\n{\n  \"a\": 1\n}\n"));
    }

    #[test]
    fn headers_only_skips_body() {
        let resp = response(&[("content-type", "text/html; charset=utf-8")], b"<h1>base</h1>");
        let out = render(&resp, true);
        assert!(out.contains("text/html; charset=utf-8"));
        assert!(!out.contains("<h1>base</h1>"));
    }
}
