//! HTTP protocol implementation.
//!
//! This module implements the HTTP/1.1 wire handling for the socket server:
//! parsing requests from raw bytes, tracking per-connection state in a
//! reusable context, and writing responses with keep-alive support.
//!
//! # Architecture
//!
//! - **`parser`**: Parses incoming HTTP requests from byte buffers
//! - **`request`**: Parsed request representation and keep-alive rules
//! - **`context`**: The reusable per-connection request/response engine
//! - **`response`**: HTTP status codes and reason phrases
//! - **`writer`**: Serializes and writes HTTP responses to the client
//!
//! # Connection State Machine
//!
//! Each client connection goes through a state machine driven by the
//! worker loop in [`crate::server`]:
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Parse the next request off the socket
//!        └──────┬──────┘
//!               │ Request received
//!               ▼
//!        ┌──────────────────┐
//!        │ Routing / Auth   │ ← Resolve a handler, authorize the caller
//!        └──────┬───────────┘
//!               │ Authorized
//!               ▼
//!        ┌──────────────────┐
//!        │ Handling/Writing │ ← Run the handler, send the response
//!        └──────┬───────────┘
//!               │ Response sent
//!               ├─ Keep-Alive → Reading (same connection)
//!               └─ Close → context released back to the pool
//! ```

pub mod context;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
