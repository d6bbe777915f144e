//! Configuration for the Lectio server
//!
//! Settings are layered from built-in defaults and `LECTIO_*` environment
//! variables. The model credential is read separately from `GEMINI_API_KEY`
//! and kept behind `SecretString` so it never shows up in logs.

use crate::error::{LectioError, Result};
use crate::services::{DEFAULT_API_BASE_URL, DEFAULT_MODEL};
use config::{Config, ConfigError, Environment};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{debug, warn};

/// Environment variable holding the model credential
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Prefix for all other settings
const ENV_PREFIX: &str = "LECTIO";

/// Raw settings as deserialized from the config layers
#[derive(Debug, Deserialize)]
struct Settings {
    addr: String,
    model: String,
    api_base_url: String,
    request_timeout_secs: u64,
    environment: Option<String>,
    region: Option<String>,
    commit: Option<String>,
}

/// Deployment metadata, reported by the diagnostic endpoint only
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeploymentInfo {
    pub environment: Option<String>,
    pub region: Option<String>,
    pub commit: Option<String>,
}

/// Server configuration
#[derive(Debug)]
pub struct ServerConfig {
    /// Listen address
    pub addr: SocketAddr,
    /// Model name passed to the backend
    pub model: String,
    /// Model API base URL
    pub api_base_url: String,
    /// Deadline the hosting layer applies to each analysis request
    pub request_timeout: Duration,
    pub deployment: DeploymentInfo,
    /// Model credential; `None` when unset or empty
    pub api_key: Option<SecretString>,
}

impl ServerConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self> {
        Self::load(None, env::var(API_KEY_VAR).ok())
    }

    /// Load with an explicit variable map in place of the process environment
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        let api_key = vars.get(API_KEY_VAR).cloned();
        Self::load(Some(vars), api_key)
    }

    fn load(vars: Option<HashMap<String, String>>, api_key: Option<String>) -> Result<Self> {
        let settings: Settings = Config::builder()
            .set_default("addr", "0.0.0.0:3000")?
            .set_default("model", DEFAULT_MODEL)?
            .set_default("api_base_url", DEFAULT_API_BASE_URL)?
            .set_default("request_timeout_secs", 60_i64)?
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .source(vars),
            )
            .build()?
            .try_deserialize()?;

        let addr = settings.addr.parse::<SocketAddr>().map_err(|e| {
            LectioError::Config(ConfigError::Message(format!(
                "Invalid listen address '{}': {}",
                settings.addr, e
            )))
        })?;

        let api_key = api_key
            .filter(|key| !key.trim().is_empty())
            .map(|key| SecretString::new(key.into()));
        if api_key.is_none() {
            warn!("{} not set; analysis requests will fail until it is configured", API_KEY_VAR);
        } else {
            debug!("Using API key from {} environment variable", API_KEY_VAR);
        }

        Ok(Self {
            addr,
            model: settings.model,
            api_base_url: settings.api_base_url,
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
            deployment: DeploymentInfo {
                environment: settings.environment,
                region: settings.region,
                commit: settings.commit,
            },
            api_key,
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}
