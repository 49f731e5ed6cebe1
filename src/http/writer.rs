use std::io::{self, Write};

use crate::http::response::reason_phrase;

const HTTP_VERSION: &str = "HTTP/1.1";

/// Serializes a complete response: status line, caller headers, then the
/// framing headers the server manages (`Content-Length` and `Connection`),
/// a blank line and the body. Callers must not set the managed headers
/// themselves.
pub fn serialize_response(
    status: u16,
    headers: &[(String, String)],
    body: &[u8],
    keep_alive: bool,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(128 + body.len());

    // Status line
    let status_line = format!("{} {} {}\r\n", HTTP_VERSION, status, reason_phrase(status));
    buf.extend_from_slice(status_line.as_bytes());

    // Headers
    for (name, value) in headers {
        buf.extend_from_slice(name.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(value.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }
    buf.extend_from_slice(format!("Content-Length: {}\r\n", body.len()).as_bytes());
    buf.extend_from_slice(if keep_alive {
        b"Connection: keep-alive\r\n".as_slice()
    } else {
        b"Connection: close\r\n".as_slice()
    });

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    // Body
    buf.extend_from_slice(body);

    buf
}

/// Writes a serialized response to a blocking stream, tracking progress
/// across short writes.
pub struct ResponseWriter {
    buffer: Vec<u8>,
    written: usize,
}

impl ResponseWriter {
    pub fn new(buffer: Vec<u8>) -> Self {
        Self { buffer, written: 0 }
    }

    pub fn write_to(&mut self, stream: &mut impl Write) -> io::Result<()> {
        while self.written < self.buffer.len() {
            let n = stream.write(&self.buffer[self.written..])?;

            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "connection closed while writing",
                ));
            }

            self.written += n;
        }

        stream.flush()
    }
}
