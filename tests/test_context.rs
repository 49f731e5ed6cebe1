use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};

use portico::error::ServerError;
use portico::http::context::ConnectionContext;
use portico::http::request::Method;

fn socket_pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let client = TcpStream::connect(addr).unwrap();
    let (server, _) = listener.accept().unwrap();
    (client, server)
}

#[test]
fn test_process_parses_request_into_context() {
    let (mut client, mut server) = socket_pair();
    let mut ctx = ConnectionContext::new(1024);

    client
        .write_all(b"GET /users/7?full=1 HTTP/1.1\r\nHost: h\r\nAccept: text/plain\r\n\r\n")
        .unwrap();

    assert!(ctx.process(&mut server).unwrap());
    assert_eq!(ctx.method(), Method::GET);
    assert_eq!(ctx.raw_url(), "/users/7?full=1");
    assert_eq!(ctx.absolute_path(), "/users/7");
    assert_eq!(ctx.header("HOST"), Some("h"));
    assert_eq!(ctx.header("accept"), Some("text/plain"));
}

#[test]
fn test_process_absolute_form_target() {
    let (mut client, mut server) = socket_pair();
    let mut ctx = ConnectionContext::new(1024);

    client
        .write_all(b"GET http://example.com/a/b?x=1 HTTP/1.1\r\nHost: h\r\n\r\n")
        .unwrap();

    assert!(ctx.process(&mut server).unwrap());
    assert_eq!(ctx.absolute_path(), "/a/b");
}

#[test]
fn test_process_returns_false_on_clean_eof() {
    let (client, mut server) = socket_pair();
    let mut ctx = ConnectionContext::new(1024);

    drop(client);

    assert!(!ctx.process(&mut server).unwrap());
}

#[test]
fn test_process_fails_on_truncated_request() {
    let (mut client, mut server) = socket_pair();
    let mut ctx = ConnectionContext::new(1024);

    client.write_all(b"GET / HTTP/1.1\r\nHost:").unwrap();
    drop(client);

    let err = ctx.process(&mut server).unwrap_err();
    assert!(matches!(err, ServerError::Malformed(_)));
}

#[test]
fn test_process_enforces_message_size_limit() {
    let (mut client, mut server) = socket_pair();
    let mut ctx = ConnectionContext::new(64);

    client
        .write_all(b"POST /big HTTP/1.1\r\nContent-Length: 1000\r\n\r\n")
        .unwrap();

    let err = ctx.process(&mut server).unwrap_err();
    assert!(matches!(
        err,
        ServerError::TooLarge {
            size: 1000,
            limit: 64
        }
    ));
}

#[test]
fn test_process_serves_sequential_requests_with_cleared_state() {
    let (mut client, mut server) = socket_pair();
    let mut ctx = ConnectionContext::new(1024);

    client
        .write_all(b"POST /first HTTP/1.1\r\nX-Marker: one\r\nContent-Length: 3\r\n\r\nabc")
        .unwrap();
    assert!(ctx.process(&mut server).unwrap());
    ctx.add_response_header("X-Duration", "0.1");
    assert_eq!(ctx.header("x-marker"), Some("one"));
    assert_eq!(ctx.body(), b"abc");

    client
        .write_all(b"GET /second HTTP/1.1\r\nHost: h\r\n\r\n")
        .unwrap();
    assert!(ctx.process(&mut server).unwrap());

    // Nothing from the first request survives into the second.
    assert_eq!(ctx.raw_url(), "/second");
    assert!(ctx.header("x-marker").is_none());
    assert!(ctx.body().is_empty());
    assert!(ctx.response_header("X-Duration").is_none());
}

#[test]
fn test_write_response_reports_keep_alive_for_http11() {
    let (mut client, mut server) = socket_pair();
    let mut ctx = ConnectionContext::new(1024);

    client
        .write_all(b"GET /ok HTTP/1.1\r\nHost: h\r\n\r\n")
        .unwrap();
    assert!(ctx.process(&mut server).unwrap());

    let keep_alive = ctx.write_response(b"fine", &mut server).unwrap();
    assert!(keep_alive);
    server.shutdown(Shutdown::Write).unwrap();

    let mut reply = String::new();
    client.read_to_string(&mut reply).unwrap();
    assert!(reply.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(reply.contains("Content-Length: 4\r\n"));
    assert!(reply.contains("Connection: keep-alive\r\n"));
    assert!(reply.ends_with("\r\n\r\nfine"));
}

#[test]
fn test_write_response_honors_close_directive() {
    let (mut client, mut server) = socket_pair();
    let mut ctx = ConnectionContext::new(1024);

    client
        .write_all(b"GET /ok HTTP/1.1\r\nConnection: close\r\n\r\n")
        .unwrap();
    assert!(ctx.process(&mut server).unwrap());

    let keep_alive = ctx.write_response(b"bye", &mut server).unwrap();
    assert!(!keep_alive);
    server.shutdown(Shutdown::Write).unwrap();

    let mut reply = String::new();
    client.read_to_string(&mut reply).unwrap();
    assert!(reply.contains("Connection: close\r\n"));
}

#[test]
fn test_write_response_http10_defaults_to_close() {
    let (mut client, mut server) = socket_pair();
    let mut ctx = ConnectionContext::new(1024);

    client.write_all(b"GET /ok HTTP/1.0\r\n\r\n").unwrap();
    assert!(ctx.process(&mut server).unwrap());

    let keep_alive = ctx.write_response(b"", &mut server).unwrap();
    assert!(!keep_alive);
}

#[test]
fn test_write_response_includes_accumulated_headers() {
    let (mut client, mut server) = socket_pair();
    let mut ctx = ConnectionContext::new(1024);

    client
        .write_all(b"GET /ok HTTP/1.1\r\nHost: h\r\n\r\n")
        .unwrap();
    assert!(ctx.process(&mut server).unwrap());

    ctx.add_response_header("X-Duration", "2.718");
    ctx.write_response(b"ok", &mut server).unwrap();
    server.shutdown(Shutdown::Write).unwrap();

    let mut reply = String::new();
    client.read_to_string(&mut reply).unwrap();
    assert!(reply.contains("X-Duration: 2.718\r\n"));
}

#[test]
fn test_write_error_minimal_response() {
    let (mut client, mut server) = socket_pair();
    let ctx = ConnectionContext::new(1024);

    ctx.write_error(&mut server, 404, "Unknown route /nope on method GET", false);
    server.shutdown(Shutdown::Write).unwrap();

    let mut reply = String::new();
    client.read_to_string(&mut reply).unwrap();
    assert!(reply.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert!(reply.contains("Content-Type: text/plain; charset=utf-8\r\n"));
    assert!(reply.contains("Connection: close\r\n"));
    assert!(reply.ends_with("Unknown route /nope on method GET"));
}

#[test]
fn test_write_error_carries_challenge_header() {
    let (mut client, mut server) = socket_pair();
    let mut ctx = ConnectionContext::new(1024);

    ctx.add_response_header("WWW-Authenticate", "Basic realm=\"h\"");
    ctx.write_error(&mut server, 401, "Authorization required", true);
    server.shutdown(Shutdown::Write).unwrap();

    let mut reply = String::new();
    client.read_to_string(&mut reply).unwrap();
    assert!(reply.starts_with("HTTP/1.1 401 Unauthorized\r\n"));
    assert!(reply.contains("WWW-Authenticate: Basic realm=\"h\"\r\n"));
    assert!(reply.contains("Connection: keep-alive\r\n"));
}

#[test]
fn test_write_error_on_dead_socket_does_not_panic() {
    let (client, mut server) = socket_pair();
    let ctx = ConnectionContext::new(1024);

    drop(client);
    server.shutdown(Shutdown::Write).ok();

    // Must swallow the failure: a broken pipe while reporting an error
    // never propagates.
    ctx.write_error(&mut server, 500, "boom", false);
}
