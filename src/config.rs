//! Authentication pipeline configuration.

use std::env;

use crate::auth::MAX_AUTH_ATTEMPTS;
use crate::transport::NetworkConfig;

/// Settings shared by every handler a factory creates.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// Credential prompts allowed per handler.
    pub max_auth_attempts: u32,
    /// Treat 403 as a credential challenge.
    pub prompt_on_forbidden: bool,
    pub network: NetworkConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            max_auth_attempts: MAX_AUTH_ATTEMPTS,
            prompt_on_forbidden: true,
            network: NetworkConfig::default(),
        }
    }
}

impl AuthConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from environment variables.
    pub fn from_env() -> Self {
        let max_auth_attempts = env::var("PACKAGE_SOURCE_MAX_AUTH_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(MAX_AUTH_ATTEMPTS);
        let prompt_on_forbidden = env::var("PACKAGE_SOURCE_PROMPT_ON_FORBIDDEN")
            .map(|v| !(v == "0" || v.eq_ignore_ascii_case("false")))
            .unwrap_or(true);

        Self {
            max_auth_attempts,
            prompt_on_forbidden,
            network: NetworkConfig::from_env(),
        }
    }

    pub fn max_auth_attempts(mut self, attempts: u32) -> Self {
        self.max_auth_attempts = attempts;
        self
    }

    pub fn prompt_on_forbidden(mut self, enabled: bool) -> Self {
        self.prompt_on_forbidden = enabled;
        self
    }

    pub fn network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }
}
