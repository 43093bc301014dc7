//! Chain credential service.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::auth::{Credential, CredentialRequest, CredentialService};
use crate::{Error, Result};

/// Chain service that asks multiple services in order.
pub struct ChainService {
    services: Vec<Box<dyn CredentialService>>,
}

impl ChainService {
    /// Create with specified services.
    pub fn new(services: Vec<Box<dyn CredentialService>>) -> Self {
        Self { services }
    }

    /// Add a service to the chain.
    pub fn with<S: CredentialService + 'static>(mut self, service: S) -> Self {
        self.services.push(Box::new(service));
        self
    }
}

#[async_trait]
impl CredentialService for ChainService {
    fn name(&self) -> &str {
        "chain"
    }

    async fn get_credentials(
        &self,
        request: &CredentialRequest,
        cancel: &CancellationToken,
    ) -> Result<Option<Credential>> {
        let mut errors = Vec::new();

        for service in &self.services {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            match service.get_credentials(request, cancel).await {
                Ok(Some(cred)) => {
                    tracing::debug!("Credential resolved from: {}", service.name());
                    return Ok(Some(cred));
                }
                Ok(None) => {
                    tracing::debug!("Service {} had no credential", service.name());
                }
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => {
                    tracing::debug!("Service {} failed: {}", service.name(), e);
                    errors.push(format!("{}: {}", service.name(), e));
                }
            }
        }

        if !errors.is_empty() && errors.len() == self.services.len() {
            return Err(Error::auth(format!(
                "No credentials found. Tried: {}",
                errors.join(", ")
            )));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{CredentialRequestType, EnvironmentService, ExplicitService};
    use url::Url;

    struct FailingService;

    #[async_trait]
    impl CredentialService for FailingService {
        fn name(&self) -> &str {
            "failing"
        }

        async fn get_credentials(
            &self,
            _request: &CredentialRequest,
            _cancel: &CancellationToken,
        ) -> Result<Option<Credential>> {
            Err(Error::auth("keychain locked"))
        }
    }

    fn request() -> CredentialRequest {
        CredentialRequest::new(
            Url::parse("https://feed.example.com/").unwrap(),
            None,
            CredentialRequestType::Unauthorized,
        )
    }

    #[tokio::test]
    async fn test_chain_first_success() {
        let chain = ChainService::new(vec![])
            .with(ExplicitService::basic("first", "a"))
            .with(ExplicitService::basic("second", "b"));

        let cred = chain
            .get_credentials(&request(), &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(cred, Credential::Basic { ref username, .. } if username == "first"));
    }

    #[tokio::test]
    async fn test_chain_fallback() {
        let chain = ChainService::new(vec![])
            .with(EnvironmentService::with_vars("NONEXISTENT_USER", "NONEXISTENT_PASS"))
            .with(FailingService)
            .with(ExplicitService::basic("fallback", "b"));

        let cred = chain
            .get_credentials(&request(), &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(cred, Credential::Basic { ref username, .. } if username == "fallback"));
    }

    #[tokio::test]
    async fn test_chain_all_decline() {
        let chain = ChainService::new(vec![])
            .with(EnvironmentService::with_vars("NONEXISTENT_USER_1", "NONEXISTENT_PASS_1"));

        let cred = chain
            .get_credentials(&request(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(cred.is_none());
    }

    #[tokio::test]
    async fn test_chain_all_fail() {
        let chain = ChainService::new(vec![]).with(FailingService).with(FailingService);
        assert!(
            chain
                .get_credentials(&request(), &CancellationToken::new())
                .await
                .is_err()
        );
    }
}
