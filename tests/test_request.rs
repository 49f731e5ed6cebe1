use std::collections::HashMap;

use portico::http::request::{Method, Request, Version, keep_alive};

#[test]
fn test_method_from_str() {
    assert_eq!(Method::from_str("GET"), Some(Method::GET));
    assert_eq!(Method::from_str("POST"), Some(Method::POST));
    assert_eq!(Method::from_str("get"), None);
    assert_eq!(Method::from_str("TRACE"), None);
}

#[test]
fn test_method_display_matches_wire_form() {
    assert_eq!(Method::GET.to_string(), "GET");
    assert_eq!(Method::DELETE.as_str(), "DELETE");
}

#[test]
fn test_version_from_str() {
    assert_eq!(Version::from_str("HTTP/1.1"), Some(Version::Http11));
    assert_eq!(Version::from_str("HTTP/1.0"), Some(Version::Http10));
    assert_eq!(Version::from_str("HTTP/2.0"), None);
}

#[test]
fn test_header_lookup_is_case_insensitive() {
    let mut headers = HashMap::new();
    headers.insert("content-type".to_string(), "application/json".to_string());

    let request = Request {
        headers,
        ..Request::default()
    };

    assert_eq!(request.header("Content-Type"), Some("application/json"));
    assert_eq!(request.header("CONTENT-TYPE"), Some("application/json"));
    assert_eq!(request.header("accept"), None);
}

#[test]
fn test_keep_alive_http11_defaults_to_persistent() {
    assert!(keep_alive(Version::Http11, None));
}

#[test]
fn test_keep_alive_http11_close_directive() {
    assert!(!keep_alive(Version::Http11, Some("close")));
    assert!(!keep_alive(Version::Http11, Some("Close")));
}

#[test]
fn test_keep_alive_http10_defaults_to_close() {
    assert!(!keep_alive(Version::Http10, None));
}

#[test]
fn test_keep_alive_http10_explicit_keep_alive() {
    assert!(keep_alive(Version::Http10, Some("keep-alive")));
    assert!(keep_alive(Version::Http10, Some("Keep-Alive")));
}

#[test]
fn test_request_keep_alive_reads_connection_header() {
    let mut headers = HashMap::new();
    headers.insert("connection".to_string(), "close".to_string());

    let request = Request {
        headers,
        ..Request::default()
    };

    assert!(!request.keep_alive());
    assert!(Request::default().keep_alive());
}
