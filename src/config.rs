use anyhow::Context;
use serde::Deserialize;

/// Environment variable naming the YAML configuration file.
pub const CONFIG_ENV: &str = "PORTICO_CONFIG";

/// Server configuration.
///
/// Every field has a default so an empty or missing document yields a
/// runnable server: no addresses means one wildcard endpoint on port 8999.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Endpoint URLs to listen on, e.g. `http://localhost:8999/`.
    #[serde(default)]
    pub addresses: Vec<String>,

    /// Per-request message size limit in bytes.
    #[serde(default = "default_max_content_length")]
    pub max_content_length: usize,

    /// Listen queue depth requested for each endpoint.
    #[serde(default = "default_backlog")]
    pub backlog: usize,

    /// Authenticator registry key. Unknown keys fail at startup.
    #[serde(default = "default_auth")]
    pub auth: String,

    /// Realm advertised in the Basic authentication challenge.
    #[serde(default = "default_realm")]
    pub realm: String,
}

fn default_max_content_length() -> usize {
    8 * 1024 * 1024
}

fn default_backlog() -> usize {
    1000
}

fn default_auth() -> String {
    "basic".to_string()
}

fn default_realm() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addresses: Vec::new(),
            max_content_length: default_max_content_length(),
            backlog: default_backlog(),
            auth: default_auth(),
            realm: default_realm(),
        }
    }
}

impl Config {
    /// Loads configuration from the file named by `PORTICO_CONFIG`,
    /// falling back to defaults when the variable is unset or the file
    /// cannot be used.
    pub fn load() -> Self {
        match std::env::var(CONFIG_ENV) {
            Ok(path) => match Self::from_yaml_file(&path) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::error!(
                        path = %path,
                        error = %e,
                        "Failed to load configuration, using defaults"
                    );
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn from_yaml_file(path: &str) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration file {path:?}"))?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).context("invalid configuration document")
    }
}
