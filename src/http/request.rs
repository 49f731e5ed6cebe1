use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;

/// HTTP request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// POST - Create or submit data
    POST,
    /// PUT - Replace a resource
    PUT,
    /// DELETE - Delete a resource
    DELETE,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// OPTIONS - Describe communication options
    OPTIONS,
    /// PATCH - Partial modification of a resource
    PATCH,
}

impl Method {
    /// Parses an HTTP method from its wire form (uppercase).
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            "DELETE" => Some(Method::DELETE),
            "HEAD" => Some(Method::HEAD),
            "OPTIONS" => Some(Method::OPTIONS),
            "PATCH" => Some(Method::PATCH),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
            Method::PATCH => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP protocol versions accepted by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Http10,
    Http11,
}

impl Version {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "HTTP/1.0" => Some(Version::Http10),
            "HTTP/1.1" => Some(Version::Http11),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Version::Http10 => "HTTP/1.0",
            Version::Http11 => "HTTP/1.1",
        }
    }
}

/// Represents a parsed HTTP request from a client.
///
/// Header names are folded to lowercase at parse time, so lookups through
/// [`Request::header`] are case-insensitive.
#[derive(Debug, Clone)]
pub struct Request {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The request target exactly as received (e.g. `/users/7?full=1`)
    pub raw_url: String,
    /// HTTP version from the request line
    pub version: Version,
    /// Request headers, names lowercased, last occurrence wins
    pub headers: HashMap<String, String>,
    /// Request body
    pub body: Bytes,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            method: Method::GET,
            raw_url: String::new(),
            version: Version::Http11,
            headers: HashMap::new(),
            body: Bytes::new(),
        }
    }
}

impl Request {
    /// Retrieves a header value by name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|v| v.as_str())
    }

    /// Determines whether the connection may serve another request after
    /// this one.
    pub fn keep_alive(&self) -> bool {
        keep_alive(self.version, self.header("connection"))
    }
}

/// Keep-alive rules: HTTP/1.1 defaults to persistent unless the client
/// sends `Connection: close`; HTTP/1.0 is persistent only on an explicit
/// `Connection: keep-alive`.
pub fn keep_alive(version: Version, connection: Option<&str>) -> bool {
    match version {
        Version::Http11 => !connection
            .map(|v| v.eq_ignore_ascii_case("close"))
            .unwrap_or(false),
        Version::Http10 => connection
            .map(|v| v.eq_ignore_ascii_case("keep-alive"))
            .unwrap_or(false),
    }
}
