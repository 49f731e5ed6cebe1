use std::sync::Arc;

use bytes::Bytes;

use portico::error::ServerError;
use portico::http::context::Exchange;
use portico::http::request::Method;
use portico::routing::{Route, RouteHandler, RouteTemplate, Routes};

struct NopHandler;

impl RouteHandler for NopHandler {
    fn handle(&self, _exchange: &mut Exchange<'_>) -> Result<Bytes, ServerError> {
        Ok(Bytes::new())
    }
}

fn route(template: &str, methods: impl IntoIterator<Item = Method>) -> Route {
    Route::new(template, methods, Arc::new(NopHandler)).unwrap()
}

#[test]
fn test_template_matches_literal_path() {
    let template = RouteTemplate::parse("/ping").unwrap();

    assert!(template.matches("/ping").is_some());
    assert!(template.matches("/pong").is_none());
    assert!(template.matches("/ping/extra").is_none());
}

#[test]
fn test_template_extracts_named_variables() {
    let template = RouteTemplate::parse("/users/{id}/posts/{post}").unwrap();

    let vars = template.matches("/users/42/posts/7").unwrap();
    assert_eq!(vars.len(), 2);
    assert_eq!(vars.get("id").unwrap(), "42");
    assert_eq!(vars.get("post").unwrap(), "7");
}

#[test]
fn test_template_literal_segments_are_case_sensitive() {
    let template = RouteTemplate::parse("/Users/{id}").unwrap();

    assert!(template.matches("/users/42").is_none());
    assert!(template.matches("/Users/42").is_some());
}

#[test]
fn test_template_root_and_trailing_slash() {
    let root = RouteTemplate::parse("/").unwrap();
    assert!(root.matches("/").is_some());
    assert!(root.matches("/x").is_none());

    let ping = RouteTemplate::parse("/ping").unwrap();
    assert!(ping.matches("/ping/").is_some());
}

#[test]
fn test_template_rejects_malformed_patterns() {
    assert!(RouteTemplate::parse("ping").is_err());
    assert!(RouteTemplate::parse("/a/{}").is_err());
    assert!(RouteTemplate::parse("/a/{x").is_err());
    assert!(RouteTemplate::parse("/a/x}").is_err());
}

#[test]
fn test_find_requires_method_in_set() {
    let mut routes = Routes::new();
    routes.register(route("/items", [Method::GET, Method::POST]));

    assert!(routes.find(Method::GET, "/items", "/items").is_some());
    assert!(routes.find(Method::POST, "/items", "/items").is_some());
    assert!(routes.find(Method::DELETE, "/items", "/items").is_none());
}

#[test]
fn test_find_returns_bound_variables() {
    let mut routes = Routes::new();
    routes.register(route("/users/{id}", [Method::GET]));

    let found = routes
        .find(Method::GET, "/users/42?full=1", "/users/42")
        .unwrap();
    assert_eq!(found.bound_vars.get("id").unwrap(), "42");
}

#[test]
fn test_find_no_match_for_unknown_path() {
    let mut routes = Routes::new();
    routes.register(route("/ping", [Method::GET]));

    assert!(routes.find(Method::GET, "/nope", "/nope").is_none());
}

#[test]
fn test_find_prefers_registration_order() {
    let mut routes = Routes::new();
    routes.register(route("/a/{x}", [Method::GET]));
    routes.register(route("/a/b", [Method::GET]));

    let found = routes.find(Method::GET, "/a/b", "/a/b").unwrap();
    assert_eq!(found.route.template().as_str(), "/a/{x}");
    assert_eq!(found.bound_vars.get("x").unwrap(), "b");
}

#[test]
fn test_find_method_mismatch_falls_through_to_later_route() {
    let mut routes = Routes::new();
    routes.register(route("/a/{x}", [Method::POST]));
    routes.register(route("/a/b", [Method::GET]));

    let found = routes.find(Method::GET, "/a/b", "/a/b").unwrap();
    assert_eq!(found.route.template().as_str(), "/a/b");
}

#[test]
fn test_route_protected_flag() {
    let open = route("/open", [Method::GET]);
    let secured = route("/secure", [Method::GET]).protected();

    assert!(!open.requires_auth());
    assert!(secured.requires_auth());
}

#[test]
fn test_routes_len() {
    let mut routes = Routes::new();
    assert!(routes.is_empty());
    routes.register(route("/ping", [Method::GET]));
    assert_eq!(routes.len(), 1);
}
