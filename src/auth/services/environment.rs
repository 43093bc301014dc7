//! Environment variable credential service.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::auth::{Credential, CredentialRequest, CredentialService};

const DEFAULT_SOURCE_USER_VAR: &str = "PACKAGE_SOURCE_USERNAME";
const DEFAULT_SOURCE_PASSWORD_VAR: &str = "PACKAGE_SOURCE_PASSWORD";
const DEFAULT_PROXY_USER_VAR: &str = "PROXY_USERNAME";
const DEFAULT_PROXY_PASSWORD_VAR: &str = "PROXY_PASSWORD";

struct VarPair {
    username: String,
    password: String,
}

impl VarPair {
    fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    fn read(&self) -> Option<Credential> {
        let username = std::env::var(&self.username).ok()?;
        let password = std::env::var(&self.password).ok()?;
        Some(Credential::basic(username, password))
    }
}

/// Service that reads username and password from environment variables.
///
/// Proxy challenges and source challenges read separate variable pairs.
pub struct EnvironmentService {
    source: VarPair,
    proxy: VarPair,
}

impl EnvironmentService {
    /// Create service using the default variable names.
    pub fn new() -> Self {
        Self {
            source: VarPair::new(DEFAULT_SOURCE_USER_VAR, DEFAULT_SOURCE_PASSWORD_VAR),
            proxy: VarPair::new(DEFAULT_PROXY_USER_VAR, DEFAULT_PROXY_PASSWORD_VAR),
        }
    }

    /// Create service with custom source credential variables.
    pub fn with_vars(username_var: impl Into<String>, password_var: impl Into<String>) -> Self {
        Self {
            source: VarPair::new(username_var, password_var),
            ..Self::new()
        }
    }

    /// Override the proxy credential variables.
    pub fn proxy_vars(
        mut self,
        username_var: impl Into<String>,
        password_var: impl Into<String>,
    ) -> Self {
        self.proxy = VarPair::new(username_var, password_var);
        self
    }
}

impl Default for EnvironmentService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialService for EnvironmentService {
    fn name(&self) -> &str {
        "environment"
    }

    async fn get_credentials(
        &self,
        request: &CredentialRequest,
        _cancel: &CancellationToken,
    ) -> Result<Option<Credential>> {
        let pair = if request.request_type.is_proxy() {
            &self.proxy
        } else {
            &self.source
        };
        Ok(pair.read())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CredentialRequestType;
    use url::Url;

    fn request(request_type: CredentialRequestType) -> CredentialRequest {
        CredentialRequest::new(
            Url::parse("https://feed.example.com/").unwrap(),
            None,
            request_type,
        )
    }

    #[tokio::test]
    async fn test_environment_service_missing() {
        // SAFETY: Test-only environment setup, variable names unique to this test
        unsafe { std::env::remove_var("TEST_SOURCE_USER_NOT_SET") };
        let service = EnvironmentService::with_vars("TEST_SOURCE_USER_NOT_SET", "TEST_SOURCE_PASS_NOT_SET");
        let cred = service
            .get_credentials(&request(CredentialRequestType::Unauthorized), &CancellationToken::new())
            .await
            .unwrap();
        assert!(cred.is_none());
    }

    #[tokio::test]
    async fn test_environment_service_set() {
        // SAFETY: Test-only environment setup, variable names unique to this test
        unsafe {
            std::env::set_var("TEST_ENV_SVC_USER", "env-user");
            std::env::set_var("TEST_ENV_SVC_PASS", "env-pass");
            std::env::set_var("TEST_ENV_SVC_PROXY_USER", "proxy-user");
            std::env::set_var("TEST_ENV_SVC_PROXY_PASS", "proxy-pass");
        }
        let service = EnvironmentService::with_vars("TEST_ENV_SVC_USER", "TEST_ENV_SVC_PASS")
            .proxy_vars("TEST_ENV_SVC_PROXY_USER", "TEST_ENV_SVC_PROXY_PASS");
        let cancel = CancellationToken::new();

        let source = service
            .get_credentials(&request(CredentialRequestType::Unauthorized), &cancel)
            .await
            .unwrap()
            .unwrap();
        assert!(source.same_as(&Credential::basic("env-user", "env-pass")));

        let proxy = service
            .get_credentials(&request(CredentialRequestType::Proxy), &cancel)
            .await
            .unwrap()
            .unwrap();
        assert!(proxy.same_as(&Credential::basic("proxy-user", "proxy-pass")));

        unsafe {
            std::env::remove_var("TEST_ENV_SVC_USER");
            std::env::remove_var("TEST_ENV_SVC_PASS");
            std::env::remove_var("TEST_ENV_SVC_PROXY_USER");
            std::env::remove_var("TEST_ENV_SVC_PROXY_PASS");
        }
    }
}
