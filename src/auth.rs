//! Request authentication.
//!
//! An authenticator inspects the `Authorization` header against the
//! matched route and returns an [`AuthDecision`] that drives the worker
//! loop. Policies are selected by a configuration key through
//! [`AuthRegistry`] and resolved once at startup; an unknown key is a
//! fatal startup error rather than a request-time surprise.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Result, bail};
use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::config::Config;
use crate::http::response::StatusCode;
use crate::routing::Route;

/// The authenticated identity attached to a request for the duration of
/// handler execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    name: String,
}

impl Principal {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Identity attached to requests on unprotected routes.
    pub fn anonymous() -> Self {
        Self {
            name: String::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.is_empty()
    }
}

/// Outcome of an authorization attempt.
///
/// Exactly one of the two shapes holds: a principal is present and the
/// request proceeds, or the decision carries the status and message to
/// report (with or without a challenge). The constructors enforce this.
pub struct AuthDecision {
    pub principal: Option<Principal>,
    pub send_challenge: bool,
    pub status: u16,
    pub error: String,
}

impl AuthDecision {
    pub fn allow(principal: Principal) -> Self {
        Self {
            principal: Some(principal),
            send_challenge: false,
            status: StatusCode::Ok.as_u16(),
            error: String::new(),
        }
    }

    /// Reject and ask the worker to emit the authentication challenge.
    pub fn challenge(error: impl Into<String>) -> Self {
        Self {
            principal: None,
            send_challenge: true,
            status: StatusCode::Unauthorized.as_u16(),
            error: error.into(),
        }
    }

    pub fn reject(status: u16, error: impl Into<String>) -> Self {
        Self {
            principal: None,
            send_challenge: false,
            status,
            error: error.into(),
        }
    }
}

/// The authenticator capability contract.
pub trait HttpAuth: Send + Sync {
    fn try_authorize(
        &self,
        authorization: Option<&str>,
        raw_url: &str,
        route: &Route,
    ) -> AuthDecision;

    /// Value of the `WWW-Authenticate` header sent with a challenge.
    fn challenge(&self) -> String;
}

impl std::fmt::Debug for dyn HttpAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn HttpAuth")
    }
}

/// Verifies a username/password pair for the default Basic policy.
pub trait CredentialStore: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> bool;
}

/// In-memory credential store.
#[derive(Default)]
pub struct StaticCredentials {
    users: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.users.insert(username.into(), password.into());
        self
    }
}

impl CredentialStore for StaticCredentials {
    fn verify(&self, username: &str, password: &str) -> bool {
        self.users
            .get(username)
            .map(|stored| stored == password)
            .unwrap_or(false)
    }
}

/// Default policy: HTTP Basic authentication.
pub struct BasicAuth {
    realm: String,
    store: Arc<dyn CredentialStore>,
}

impl BasicAuth {
    pub fn new(realm: impl Into<String>, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            realm: realm.into(),
            store,
        }
    }
}

impl HttpAuth for BasicAuth {
    fn try_authorize(
        &self,
        authorization: Option<&str>,
        raw_url: &str,
        route: &Route,
    ) -> AuthDecision {
        if !route.requires_auth() {
            return AuthDecision::allow(Principal::anonymous());
        }

        let Some(header) = authorization else {
            return AuthDecision::challenge("Authorization required");
        };

        let Some((scheme, encoded)) = header.split_once(' ') else {
            return AuthDecision::challenge("Invalid authorization header");
        };
        if !scheme.eq_ignore_ascii_case("basic") {
            return AuthDecision::challenge("Unsupported authorization scheme");
        }

        let credentials = match STANDARD
            .decode(encoded.trim())
            .ok()
            .and_then(|raw| String::from_utf8(raw).ok())
        {
            Some(text) => text,
            None => return AuthDecision::challenge("Invalid authorization header"),
        };
        let Some((username, password)) = credentials.split_once(':') else {
            return AuthDecision::challenge("Invalid authorization header");
        };

        if self.store.verify(username, password) {
            tracing::debug!(username, raw_url, "Authorized");
            AuthDecision::allow(Principal::named(username))
        } else {
            tracing::warn!(username, raw_url, "Invalid credentials");
            AuthDecision::reject(StatusCode::Unauthorized.as_u16(), "Invalid credentials")
        }
    }

    fn challenge(&self) -> String {
        format!("Basic realm=\"{}\"", self.realm)
    }
}

/// Factory producing an authenticator from the loaded configuration.
pub type AuthFactory = Box<dyn Fn(&Config) -> Arc<dyn HttpAuth> + Send + Sync>;

/// Strategy table keyed by the `auth` configuration value.
pub struct AuthRegistry {
    factories: HashMap<String, AuthFactory>,
}

impl AuthRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with the default `basic` policy backed by `store`.
    pub fn with_basic(store: Arc<dyn CredentialStore>) -> Self {
        let mut registry = Self::new();
        registry.register(
            "basic",
            Box::new(move |cfg: &Config| {
                let auth: Arc<dyn HttpAuth> =
                    Arc::new(BasicAuth::new(cfg.realm.clone(), Arc::clone(&store)));
                auth
            }),
        );
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, factory: AuthFactory) {
        self.factories.insert(name.into(), factory);
    }

    /// Resolves the configured authenticator. Fails fast on an unknown
    /// key so a misconfigured policy never reaches request time.
    pub fn resolve(&self, cfg: &Config) -> Result<Arc<dyn HttpAuth>> {
        let Some(factory) = self.factories.get(&cfg.auth) else {
            let mut known: Vec<&str> = self.factories.keys().map(|k| k.as_str()).collect();
            known.sort_unstable();
            bail!(
                "unknown authenticator type {:?}; registered types: {}",
                cfg.auth,
                known.join(", ")
            );
        };
        Ok(factory(cfg))
    }
}

impl Default for AuthRegistry {
    fn default() -> Self {
        Self::new()
    }
}
