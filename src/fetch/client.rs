use super::{PageSource, Record};
use crate::config::Settings;
use crate::error::{PaystatError, Result};
use reqwest::blocking::Client;
use serde_json::Value as JsonValue;
use std::time::Duration;

/// Pages records from an HTTP datastore endpoint with
/// `GET endpoint?limit=..&offset=..`. One attempt per page.
#[derive(Clone, Debug)]
pub struct HttpPageSource {
    client: Client,
    endpoint: String,
}

impl HttpPageSource {
    /// # Errors
    ///
    /// Returns `Transport` if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("paystat/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// # Errors
    ///
    /// Returns `Transport` if the HTTP client cannot be built.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(settings.endpoint.clone(), settings.timeout())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl PageSource for HttpPageSource {
    fn fetch_page(&mut self, offset: usize, limit: usize) -> Result<Vec<Record>> {
        log::debug!("GET {} limit={limit} offset={offset}", self.endpoint);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("limit", limit), ("offset", offset)])
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(PaystatError::Remote {
                status: status.as_u16(),
                body,
            });
        }
        parse_page(&body)
    }
}

/// Extracts the `results` records from a response body. A body without a
/// `results` key is an empty page.
///
/// # Errors
///
/// Returns `InvalidResponse` if the body is not a JSON object or `results`
/// is not an array of objects.
pub fn parse_page(body: &str) -> Result<Vec<Record>> {
    let document: JsonValue = serde_json::from_str(body)
        .map_err(|e| PaystatError::InvalidResponse(format!("body is not JSON: {e}")))?;
    let JsonValue::Object(mut fields) = document else {
        return Err(PaystatError::InvalidResponse(
            "expected a JSON object at the top level".to_owned(),
        ));
    };

    match fields.remove("results") {
        None | Some(JsonValue::Null) => Ok(Vec::new()),
        Some(JsonValue::Array(items)) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                JsonValue::Object(record) => Ok(record),
                other => Err(PaystatError::InvalidResponse(format!(
                    "result {i} is not an object: {other}"
                ))),
            })
            .collect(),
        Some(other) => Err(PaystatError::InvalidResponse(format!(
            "'results' is not an array: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    #![expect(clippy::unwrap_used, clippy::indexing_slicing)]

    use super::*;

    #[test]
    fn test_parse_page() {
        let records = parse_page(r#"{"count": 2, "results": [{"a": 1}, {"a": 2}]}"#).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("a"), Some(&JsonValue::from(2)));
    }

    #[test]
    fn test_missing_results_is_exhaustion() {
        assert!(parse_page(r#"{"count": 0}"#).unwrap().is_empty());
        assert!(parse_page(r#"{"results": []}"#).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_bodies() {
        for body in ["<html>busy</html>", "[1, 2]", r#"{"results": 5}"#, r#"{"results": [1]}"#] {
            assert!(
                matches!(parse_page(body), Err(PaystatError::InvalidResponse(_))),
                "{body}"
            );
        }
    }

    /// Serves one canned HTTP response on a local port and hands back the
    /// request head it received.
    fn serve_once(response: String) -> (String, std::thread::JoinHandle<String>) {
        use std::io::{BufRead as _, BufReader, Write as _};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut head = String::new();
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                    break;
                }
                head.push_str(&line);
            }
            let mut stream = stream;
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
            head
        });
        (format!("http://{addr}/datastore/search"), handle)
    }

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    #[test]
    fn test_error_status_keeps_body_verbatim() {
        let body = r#"{"message": "service busy", "retry": true}"#;
        let (endpoint, server) = serve_once(http_response("503 Service Unavailable", body));
        let mut source = HttpPageSource::new(endpoint, Duration::from_secs(5)).unwrap();

        let err = source.fetch_page(10, 5).unwrap_err();
        let head = server.join().unwrap();

        assert!(head.starts_with("GET /datastore/search?"), "{head}");
        assert!(head.contains("limit=5&offset=10"), "{head}");
        match err {
            PaystatError::Remote { status, body: got } => {
                assert_eq!(status, 503);
                assert_eq!(got, body);
            }
            other => panic!("expected a remote error, got {other:?}"),
        }
    }

    #[test]
    fn test_success_status_parses_page() {
        let body = r#"{"results": [{"id": 1}, {"id": 2}, {"id": 3}]}"#;
        let (endpoint, server) = serve_once(http_response("200 OK", body));
        let mut source = HttpPageSource::new(endpoint, Duration::from_secs(5)).unwrap();

        let records = source.fetch_page(0, 3).unwrap();
        server.join().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].get("id"), Some(&JsonValue::from(3)));
    }

    #[test]
    fn test_refused_connection_is_transport() {
        // Bind to learn a free port, then close it so nothing is listening.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let mut source = HttpPageSource::new(
            format!("http://127.0.0.1:{port}/datastore/search"),
            Duration::from_secs(2),
        )
        .unwrap();

        assert!(matches!(
            source.fetch_page(0, 5).unwrap_err(),
            PaystatError::Transport(_)
        ));
    }

    #[test]
    fn test_client_builds() {
        let source = HttpPageSource::from_settings(&Settings::default()).unwrap();
        assert!(source.endpoint().starts_with("https://"));
    }
}
