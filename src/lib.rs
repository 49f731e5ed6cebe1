//! Portico - HTTP/1.1 socket front-end
//!
//! Core library for the socket server: accept loop, pooled connection
//! contexts, request routing and authentication.

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod routing;
pub mod server;
