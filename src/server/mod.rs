//! The socket server: acceptor and worker connection loop.
//!
//! The accept loop runs on its own thread per bound endpoint and only
//! hands sockets to the worker pool, so one slow client cannot block new
//! connections. Each worker job drives one connection through
//! read → route → authorize → handle → write cycles until the connection
//! closes, then returns its context to the pool.

pub mod listener;
pub mod pool;
pub mod workers;

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result, anyhow};

use crate::auth::{AuthDecision, AuthRegistry, HttpAuth};
use crate::config::Config;
use crate::error::ServerError;
use crate::http::context::{ConnectionContext, Exchange};
use crate::http::response::StatusCode;
use crate::routing::Routes;
use pool::ContextPool;
use workers::WorkerPool;

pub struct HttpSocketServer {
    listeners: Vec<TcpListener>,
    routes: Arc<Routes>,
    auth: Arc<dyn HttpAuth>,
    pool: Arc<ContextPool>,
    workers: WorkerPool,
}

impl HttpSocketServer {
    /// Binds every configured endpoint and resolves the configured
    /// authenticator. Both failures are fatal here, at startup.
    pub fn bind(cfg: &Config, routes: Routes, auth_registry: &AuthRegistry) -> Result<Self> {
        let auth = auth_registry.resolve(cfg)?;
        let endpoints = listener::resolve_endpoints(cfg)?;
        let listeners = listener::bind_endpoints(&endpoints, cfg.backlog)?;

        let cores = num_cpus::get();
        let pool = Arc::new(ContextPool::new(cfg.max_content_length, cores * 3));
        let workers = WorkerPool::new(64 + cores * 3)?;

        tracing::info!(
            routes = routes.len(),
            contexts = pool.idle(),
            workers = workers.size(),
            message_limit = cfg.max_content_length,
            "Server initialized"
        );

        Ok(Self {
            listeners,
            routes: Arc::new(routes),
            auth,
            pool,
            workers,
        })
    }

    /// Addresses actually bound; with port 0 these carry the assigned
    /// ports.
    pub fn local_addrs(&self) -> Vec<SocketAddr> {
        self.listeners
            .iter()
            .filter_map(|l| l.local_addr().ok())
            .collect()
    }

    /// Runs the accept loops until a fatal accept failure. Per-accept
    /// errors are logged and the loop continues; anything escaping the
    /// loop shuts the listeners down and terminates the server.
    pub fn run(self) -> Result<()> {
        let Self {
            listeners,
            routes,
            auth,
            pool,
            workers,
        } = self;
        let workers = Arc::new(workers);

        tracing::info!(event = 1002, "Http server running");

        let mut threads = Vec::new();
        for listener in listeners {
            let routes = Arc::clone(&routes);
            let auth = Arc::clone(&auth);
            let pool = Arc::clone(&pool);
            let workers = Arc::clone(&workers);
            let handle = thread::Builder::new()
                .name("portico-accept".to_string())
                .spawn(move || accept_loop(&listener, routes, auth, pool, workers))
                .context("failed to spawn accept thread")?;
            threads.push(handle);
        }

        let mut failure = None;
        for handle in threads {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => failure = Some(e),
                Err(_) => failure = Some(anyhow!("accept thread panicked")),
            }
        }

        tracing::info!(event = 1002, "Http server stopped");
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn accept_loop(
    listener: &TcpListener,
    routes: Arc<Routes>,
    auth: Arc<dyn HttpAuth>,
    pool: Arc<ContextPool>,
    workers: Arc<WorkerPool>,
) -> Result<()> {
    loop {
        match listener.accept() {
            Ok((socket, peer)) => {
                tracing::debug!(peer = %peer, "Accepted connection");
                let routes = Arc::clone(&routes);
                let auth = Arc::clone(&auth);
                let pool = Arc::clone(&pool);
                workers.execute(move || {
                    process_connection(socket, peer, &routes, auth.as_ref(), &pool);
                });
            }
            Err(e) if is_transient_accept_error(&e) => {
                tracing::error!(error = %e, event = 5401, "Accept failed");
            }
            Err(e) => {
                tracing::error!(error = %e, event = 5402, "Accept loop failed fatally");
                return Err(anyhow::Error::from(e).context("accept loop terminated"));
            }
        }
    }
}

fn is_transient_accept_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
    )
}

/// One worker job: the full life of one accepted connection.
///
/// Every failure inside the loop is caught here, converted to a
/// best-effort error response, and logged; the context guard returns the
/// context to the pool exactly once on every path.
fn process_connection(
    mut socket: TcpStream,
    peer: SocketAddr,
    routes: &Routes,
    auth: &dyn HttpAuth,
    pool: &ContextPool,
) {
    let mut ctx = pool.acquire();

    match run_requests(&mut socket, &mut ctx, routes, auth) {
        Ok(()) => {}
        Err(ServerError::Io(e)) => {
            // The socket is gone; nothing to report to the client
            tracing::debug!(peer = %peer, error = %e, "Connection closed with I/O error");
        }
        Err(e) => {
            tracing::error!(peer = %peer, error = %e, event = 5403, "Request failed");
            ctx.write_error(
                &mut socket,
                e.status().as_u16(),
                &e.to_string(),
                e.keep_alive_after_report(),
            );
        }
    }
}

/// The request/response cycle over one connection:
/// `Reading → Routing → Authorizing → Handling → Writing`, looping back
/// to `Reading` while keep-alive holds.
fn run_requests(
    socket: &mut TcpStream,
    ctx: &mut ConnectionContext,
    routes: &Routes,
    auth: &dyn HttpAuth,
) -> Result<(), ServerError> {
    while ctx.process(socket)? {
        let method = ctx.method();
        let raw_url = ctx.raw_url().to_string();

        let Some(found) = routes.find(method, &raw_url, ctx.absolute_path()) else {
            let message = format!("Unknown route {} on method {}", raw_url, method);
            ctx.write_error(socket, StatusCode::NotFound.as_u16(), &message, false);
            return Ok(());
        };

        let decision = auth.try_authorize(ctx.header("authorization"), &raw_url, found.route);
        match decision {
            AuthDecision {
                principal: Some(principal),
                ..
            } => {
                ctx.bind_route(found.bound_vars, principal);
                let body = {
                    let mut exchange = Exchange::new(ctx);
                    found.route.handle(&mut exchange)?
                };
                let keep_alive = ctx.write_response(&body, socket)?;
                if keep_alive && socket.peer_addr().is_ok() {
                    continue;
                }
                return Ok(());
            }
            AuthDecision {
                send_challenge: true,
                status,
                error,
                ..
            } => {
                ctx.add_response_header("WWW-Authenticate", auth.challenge());
                ctx.write_error(socket, status, &error, true);
                return Ok(());
            }
            AuthDecision { status, error, .. } => {
                ctx.write_error(socket, status, &error, true);
                return Ok(());
            }
        }
    }

    Ok(())
}
