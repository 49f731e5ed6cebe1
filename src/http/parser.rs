use std::collections::HashMap;

use bytes::Bytes;
use thiserror::Error;

use crate::http::request::{Method, Request, Version};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed request line")]
    InvalidRequestLine,
    #[error("unknown method")]
    InvalidMethod,
    #[error("unsupported protocol version")]
    InvalidVersion,
    #[error("malformed header line")]
    InvalidHeader,
    #[error("invalid content length")]
    InvalidContentLength,
    #[error("invalid chunked encoding")]
    InvalidChunk,
    #[error("message of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },
    #[error("incomplete request")]
    Incomplete,
}

/// Parses one HTTP request off the front of `buf`.
///
/// Returns the request and the number of bytes consumed so the caller can
/// drain its buffer before the next keep-alive request. `Incomplete` asks
/// the caller to read more bytes; `TooLarge` is raised as soon as the
/// declared or accumulated message exceeds `limit`, before waiting for the
/// rest of the body to arrive.
pub fn parse_http_request(buf: &[u8], limit: usize) -> Result<(Request, usize), ParseError> {
    // Look for header/body separator
    let Some(headers_end) = find_headers_end(buf) else {
        if buf.len() > limit {
            return Err(ParseError::TooLarge {
                size: buf.len(),
                limit,
            });
        }
        return Err(ParseError::Incomplete);
    };
    let header_bytes = &buf[..headers_end];
    let body_bytes = &buf[headers_end + 4..];

    let headers_str =
        std::str::from_utf8(header_bytes).map_err(|_| ParseError::InvalidRequestLine)?;

    let mut lines = headers_str.split("\r\n");

    // Request line
    let request_line = lines.next().ok_or(ParseError::InvalidRequestLine)?;
    let mut parts = request_line.split_whitespace();

    let method_str = parts.next().ok_or(ParseError::InvalidRequestLine)?;
    let raw_url = parts.next().ok_or(ParseError::InvalidRequestLine)?;
    let version_str = parts.next().ok_or(ParseError::InvalidRequestLine)?;

    let method = Method::from_str(method_str).ok_or(ParseError::InvalidMethod)?;
    let version = Version::from_str(version_str).ok_or(ParseError::InvalidVersion)?;

    // Headers: names folded to lowercase so lookups are case-insensitive
    let mut headers = HashMap::new();

    for line in lines {
        if line.is_empty() {
            continue;
        }

        let (name, value) = line.split_once(':').ok_or(ParseError::InvalidHeader)?;

        headers.insert(
            name.trim().to_ascii_lowercase(),
            value.trim().to_string(),
        );
    }

    // Body: chunked transfer encoding wins over a declared length
    let chunked = headers
        .get("transfer-encoding")
        .map(|v| v.to_ascii_lowercase().contains("chunked"))
        .unwrap_or(false);

    let (body, body_len) = if chunked {
        parse_chunked_body(body_bytes, limit)?
    } else {
        let content_length = headers
            .get("content-length")
            .map(|v| v.parse::<usize>().map_err(|_| ParseError::InvalidContentLength))
            .transpose()?
            .unwrap_or(0);

        if content_length > limit {
            return Err(ParseError::TooLarge {
                size: content_length,
                limit,
            });
        }
        if body_bytes.len() < content_length {
            return Err(ParseError::Incomplete);
        }
        (body_bytes[..content_length].to_vec(), content_length)
    };

    let request = Request {
        method,
        raw_url: raw_url.to_string(),
        version,
        headers,
        body: Bytes::from(body),
    };

    let total_consumed = headers_end + 4 + body_len;
    Ok((request, total_consumed))
}

/// Decodes a chunked body: hex-sized chunks, a terminal zero chunk, then
/// trailers skipped until the blank line. Returns the body and the number
/// of encoded bytes consumed after the header separator.
fn parse_chunked_body(buf: &[u8], limit: usize) -> Result<(Vec<u8>, usize), ParseError> {
    let mut pos = 0;
    let mut body = Vec::new();

    loop {
        let line_end = find_crlf(&buf[pos..]).ok_or(ParseError::Incomplete)? + pos;
        let size_line =
            std::str::from_utf8(&buf[pos..line_end]).map_err(|_| ParseError::InvalidChunk)?;
        // Chunk extensions after ';' are ignored
        let size_hex = size_line.split(';').next().unwrap_or(size_line).trim();
        let size = usize::from_str_radix(size_hex, 16).map_err(|_| ParseError::InvalidChunk)?;
        pos = line_end + 2;

        if size == 0 {
            loop {
                let trailer_end = find_crlf(&buf[pos..]).ok_or(ParseError::Incomplete)? + pos;
                let trailer = &buf[pos..trailer_end];
                pos = trailer_end + 2;
                if trailer.is_empty() {
                    return Ok((body, pos));
                }
            }
        }

        if body.len() + size > limit {
            return Err(ParseError::TooLarge {
                size: body.len() + size,
                limit,
            });
        }
        if buf.len() < pos + size + 2 {
            return Err(ParseError::Incomplete);
        }
        body.extend_from_slice(&buf[pos..pos + size]);
        if &buf[pos + size..pos + size + 2] != b"\r\n" {
            return Err(ParseError::InvalidChunk);
        }
        pos += size + 2;
    }
}

fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}
