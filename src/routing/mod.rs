//! Request routing.
//!
//! Routes are registered once at startup and immutable afterwards, so the
//! table needs no per-request synchronization. A route pairs a URL
//! template with an allowed method set and a handler; matching extracts
//! the template's named variable segments.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::{Result, bail};
use bytes::Bytes;

use crate::error::ServerError;
use crate::http::context::Exchange;
use crate::http::request::Method;

/// A route handler: the boundary to the command-conversion layer.
///
/// Invoked with the exchange carrying bound route variables, the accept
/// content type and the raw request body; returns the response byte
/// stream or a client-visible error.
pub trait RouteHandler: Send + Sync {
    fn handle(&self, exchange: &mut Exchange<'_>) -> Result<Bytes, ServerError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable(String),
}

/// URL pattern with named placeholder segments, e.g. `/users/{id}/posts`.
#[derive(Debug, Clone)]
pub struct RouteTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl RouteTemplate {
    pub fn parse(template: &str) -> Result<Self> {
        if !template.starts_with('/') {
            bail!("route template must start with '/': {template:?}");
        }

        let mut segments = Vec::new();
        for part in template.split('/').filter(|s| !s.is_empty()) {
            if let Some(name) = part.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                if name.is_empty() {
                    bail!("route template {template:?} has an unnamed variable segment");
                }
                segments.push(Segment::Variable(name.to_string()));
            } else if part.contains('{') || part.contains('}') {
                bail!("route template {template:?} has a malformed segment {part:?}");
            } else {
                segments.push(Segment::Literal(part.to_string()));
            }
        }

        Ok(Self {
            raw: template.to_string(),
            segments,
        })
    }

    /// Matches a request path against this template, returning the
    /// captured variables. Literal segments compare case-sensitively;
    /// each variable captures exactly one segment.
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut vars = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) => {
                    if literal != part {
                        return None;
                    }
                }
                Segment::Variable(name) => {
                    vars.insert(name.clone(), part.to_string());
                }
            }
        }
        Some(vars)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// A registered route: template, allowed methods, handler.
pub struct Route {
    template: RouteTemplate,
    methods: HashSet<Method>,
    requires_auth: bool,
    handler: Arc<dyn RouteHandler>,
}

impl Route {
    pub fn new(
        template: &str,
        methods: impl IntoIterator<Item = Method>,
        handler: Arc<dyn RouteHandler>,
    ) -> Result<Self> {
        Ok(Self {
            template: RouteTemplate::parse(template)?,
            methods: methods.into_iter().collect(),
            requires_auth: false,
            handler,
        })
    }

    /// Marks the route as requiring an authenticated principal.
    pub fn protected(mut self) -> Self {
        self.requires_auth = true;
        self
    }

    pub fn requires_auth(&self) -> bool {
        self.requires_auth
    }

    pub fn template(&self) -> &RouteTemplate {
        &self.template
    }

    pub fn handle(&self, exchange: &mut Exchange<'_>) -> Result<Bytes, ServerError> {
        self.handler.handle(exchange)
    }
}

/// A resolved route plus the variables captured from its template.
pub struct RouteMatch<'r> {
    pub route: &'r Route,
    pub bound_vars: HashMap<String, String>,
}

/// Ordered route table, built at startup and read-only afterwards.
#[derive(Default)]
pub struct Routes {
    routes: Vec<Route>,
}

impl Routes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, route: Route) {
        self.routes.push(route);
    }

    /// Resolves a request to a route in registration order. A route
    /// matches only if its method set contains the request method; a
    /// path-only match with the wrong method is no-match, and the caller
    /// reports an unknown route.
    pub fn find(&self, method: Method, raw_url: &str, absolute_path: &str) -> Option<RouteMatch<'_>> {
        for route in &self.routes {
            if !route.methods.contains(&method) {
                continue;
            }
            if let Some(bound_vars) = route.template.matches(absolute_path) {
                tracing::trace!(
                    method = %method,
                    raw_url,
                    template = route.template.as_str(),
                    "Route matched"
                );
                return Some(RouteMatch { route, bound_vars });
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
