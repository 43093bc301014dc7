//! Explicit credential service.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::auth::{Credential, CredentialRequest, CredentialRequestType, CredentialService};

/// Service with an explicitly set credential.
pub struct ExplicitService {
    credential: Credential,
    only_for: Option<CredentialRequestType>,
}

impl ExplicitService {
    /// Create with credential.
    pub fn new(credential: Credential) -> Self {
        Self {
            credential,
            only_for: None,
        }
    }

    /// Create with username and password.
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::new(Credential::basic(username, password))
    }

    /// Answer only requests of this type, declining the rest.
    pub fn only_for(mut self, request_type: CredentialRequestType) -> Self {
        self.only_for = Some(request_type);
        self
    }
}

#[async_trait]
impl CredentialService for ExplicitService {
    fn name(&self) -> &str {
        "explicit"
    }

    async fn get_credentials(
        &self,
        request: &CredentialRequest,
        _cancel: &CancellationToken,
    ) -> Result<Option<Credential>> {
        match self.only_for {
            Some(t) if t != request.request_type => Ok(None),
            _ => Ok(Some(self.credential.clone())),
        }
    }
}
