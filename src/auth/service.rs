//! Credential service trait.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{Credential, CredentialRequest};
use crate::Result;

/// Source of credentials for failed requests, usually backed by an
/// interactive prompt in the hosting application.
///
/// `Ok(None)` means declined or unavailable; the handler does not ask again
/// for the same failure.
#[async_trait]
pub trait CredentialService: Send + Sync {
    /// Service name for debugging.
    fn name(&self) -> &str;

    async fn get_credentials(
        &self,
        request: &CredentialRequest,
        cancel: &CancellationToken,
    ) -> Result<Option<Credential>>;
}
