use std::collections::HashMap;
use std::io::Read;
use std::net::TcpStream;

use bytes::{Buf, BytesMut};
use url::Url;

use crate::auth::Principal;
use crate::error::ServerError;
use crate::http::parser::{ParseError, parse_http_request};
use crate::http::request::{self, Method, Request};
use crate::http::response::StatusCode;
use crate::http::writer::{ResponseWriter, serialize_response};

/// Request header consulted by collaborators to route work to a named
/// execution scope.
pub const SESSION_HEADER: &str = "x-portico-session";

/// Reusable per-connection request/response state.
///
/// A context is owned by exactly one worker thread while checked out of
/// the pool. It carries the read buffer and the state of the request
/// currently being served; [`ConnectionContext::reset`] clears everything
/// so the pool can hand it to an unrelated connection.
pub struct ConnectionContext {
    limit: usize,
    buffer: BytesMut,
    request: Request,
    absolute_path: String,
    response_headers: Vec<(String, String)>,
    bound_vars: HashMap<String, String>,
    principal: Option<Principal>,
}

impl ConnectionContext {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            buffer: BytesMut::with_capacity(4096),
            request: Request::default(),
            absolute_path: String::new(),
            response_headers: Vec::new(),
            bound_vars: HashMap::new(),
            principal: None,
        }
    }

    /// Reads the next request off the socket, blocking until it is
    /// complete.
    ///
    /// Returns `Ok(false)` on a clean end-of-stream: the client closed the
    /// connection between requests. A connection that dies mid-request, a
    /// malformed request, or one exceeding the message size limit is an
    /// error. State from the previous request on this connection is
    /// cleared before parsing.
    pub fn process(&mut self, socket: &mut TcpStream) -> Result<bool, ServerError> {
        self.clear_request_state();
        let mut chunk = [0u8; 4096];

        loop {
            // Try parsing whatever we already have
            if !self.buffer.is_empty() {
                match parse_http_request(&self.buffer, self.limit) {
                    Ok((request, consumed)) => {
                        self.buffer.advance(consumed);
                        self.absolute_path = absolute_path_of(&request.raw_url);
                        self.request = request;
                        return Ok(true);
                    }

                    Err(ParseError::Incomplete) => {
                        // Need more data → fall through to read
                    }

                    Err(e) => return Err(e.into()),
                }
            }

            let n = socket.read(&mut chunk)?;

            if n == 0 {
                if self.buffer.is_empty() {
                    // Client closed the connection between requests
                    return Ok(false);
                }
                return Err(ServerError::Malformed(ParseError::Incomplete));
            }

            self.buffer.extend_from_slice(&chunk[..n]);
        }
    }

    pub fn method(&self) -> Method {
        self.request.method
    }

    /// The request target exactly as received, query string included.
    pub fn raw_url(&self) -> &str {
        &self.request.raw_url
    }

    /// The request path with any query string stripped; absolute-form
    /// targets are reduced to their path component.
    pub fn absolute_path(&self) -> &str {
        &self.absolute_path
    }

    /// Case-insensitive request header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.header(name)
    }

    pub fn body(&self) -> &[u8] {
        &self.request.body
    }

    /// Attaches the resolved route variables and the authenticated
    /// identity for the duration of this one request.
    pub fn bind_route(&mut self, bound_vars: HashMap<String, String>, principal: Principal) {
        self.bound_vars = bound_vars;
        self.principal = Some(principal);
    }

    pub fn bound_var(&self, name: &str) -> Option<&str> {
        self.bound_vars.get(name).map(|v| v.as_str())
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn add_response_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.response_headers.push((name.into(), value.into()));
    }

    /// First accumulated response header with the given name.
    pub fn response_header(&self, name: &str) -> Option<&str> {
        self.response_headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the current request allows the connection to be reused.
    pub fn keep_alive(&self) -> bool {
        request::keep_alive(self.request.version, self.header("connection"))
    }

    /// Writes the handler output as a 200 response with the accumulated
    /// headers and correct length framing. Returns the keep-alive
    /// decision for the worker loop.
    pub fn write_response(&self, body: &[u8], socket: &mut TcpStream) -> Result<bool, ServerError> {
        let keep_alive = self.keep_alive();
        let buf = serialize_response(
            StatusCode::Ok.as_u16(),
            &self.response_headers,
            body,
            keep_alive,
        );
        ResponseWriter::new(buf).write_to(socket)?;
        Ok(keep_alive)
    }

    /// Writes a minimal error response. Accumulated response headers are
    /// included so a challenge header added before the call goes out with
    /// it. A failure while writing is logged and swallowed: a broken pipe
    /// while reporting an error must not take the worker down.
    pub fn write_error(&self, socket: &mut TcpStream, status: u16, message: &str, keep_alive: bool) {
        let mut headers = self.response_headers.clone();
        headers.push((
            "Content-Type".to_string(),
            "text/plain; charset=utf-8".to_string(),
        ));
        let buf = serialize_response(status, &headers, message.as_bytes(), keep_alive);
        if let Err(e) = ResponseWriter::new(buf).write_to(socket) {
            tracing::warn!(
                status,
                error = %e,
                event = 5404,
                "Failed to write error response"
            );
        }
    }

    /// Clears every per-request and per-connection field. Invariant: a
    /// context released to the pool exposes no header, body or principal
    /// data from any prior connection.
    pub fn reset(&mut self) {
        self.clear_request_state();
        self.buffer.clear();
    }

    fn clear_request_state(&mut self) {
        self.request = Request::default();
        self.absolute_path.clear();
        self.response_headers.clear();
        self.bound_vars.clear();
        self.principal = None;
    }
}

fn absolute_path_of(raw_url: &str) -> String {
    if raw_url.starts_with("http://") || raw_url.starts_with("https://") {
        if let Ok(url) = Url::parse(raw_url) {
            return url.path().to_string();
        }
    }
    raw_url
        .split('?')
        .next()
        .unwrap_or(raw_url)
        .to_string()
}

/// The view of one request handed to a route handler.
///
/// Replaces ambient thread-scoped request/response state with an explicit
/// value threaded through the call chain: bound route variables, the
/// request headers a collaborator consults, the body, and the response
/// header accumulator for instrumentation headers.
pub struct Exchange<'a> {
    ctx: &'a mut ConnectionContext,
}

impl<'a> Exchange<'a> {
    pub fn new(ctx: &'a mut ConnectionContext) -> Self {
        Self { ctx }
    }

    pub fn method(&self) -> Method {
        self.ctx.method()
    }

    pub fn raw_url(&self) -> &str {
        self.ctx.raw_url()
    }

    /// Captured route template variable.
    pub fn var(&self, name: &str) -> Option<&str> {
        self.ctx.bound_var(name)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.ctx.header(name)
    }

    pub fn accept(&self) -> Option<&str> {
        self.header("accept")
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Session identifier routing work to a named execution scope, when
    /// the client sent one.
    pub fn session_id(&self) -> Option<&str> {
        self.header(SESSION_HEADER)
    }

    pub fn body(&self) -> &[u8] {
        self.ctx.body()
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.ctx.principal()
    }

    pub fn add_response_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.ctx.add_response_header(name, value);
    }
}
