use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;

use portico::auth::{AuthRegistry, StaticCredentials};
use portico::config::Config;
use portico::error::ServerError;
use portico::http::context::Exchange;
use portico::http::request::Method;
use portico::routing::{Route, RouteHandler, Routes};
use portico::server::HttpSocketServer;

struct PingHandler;

impl RouteHandler for PingHandler {
    fn handle(&self, _exchange: &mut Exchange<'_>) -> Result<Bytes, ServerError> {
        Ok(Bytes::from_static(b"pong\n"))
    }
}

/// Greets the captured name, echoing any request body back and stamping
/// the elapsed time the way the command-conversion layer stamps real
/// command executions.
struct HelloHandler;

impl RouteHandler for HelloHandler {
    fn handle(&self, exchange: &mut Exchange<'_>) -> Result<Bytes, ServerError> {
        let start = Instant::now();

        let name = exchange.var("name").unwrap_or("world").to_string();
        let mut reply = format!("hello {name}\n").into_bytes();
        if !exchange.body().is_empty() {
            reply.extend_from_slice(exchange.body());
            reply.push(b'\n');
        }

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        exchange.add_response_header("X-Duration", format!("{elapsed_ms:.3}"));
        Ok(Bytes::from(reply))
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load();

    let mut routes = Routes::new();
    routes.register(Route::new("/ping", [Method::GET], Arc::new(PingHandler))?);
    routes.register(Route::new(
        "/hello/{name}",
        [Method::GET, Method::POST],
        Arc::new(HelloHandler),
    )?);

    let registry = AuthRegistry::with_basic(Arc::new(StaticCredentials::new()));

    let server = HttpSocketServer::bind(&cfg, routes, &registry)?;
    server.run()
}
