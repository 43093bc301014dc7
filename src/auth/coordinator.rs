//! Single-flight credential prompting.
//!
//! One [`PromptCoordinator`] is shared by every handler in the process. It
//! serializes prompts and uses [`Epoch`]s to spot failures that another
//! request has already fixed while this one was waiting.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::{Credential, CredentialRequest, CredentialRequestType, CredentialService, RetryPolicy};
use crate::{Error, Result};

static NEXT_EPOCH: AtomicU64 = AtomicU64::new(1);

/// Generation marker of installed credentials.
///
/// Handlers carry one for their source credentials; proxy descriptors carry
/// one for the shared proxy credential.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Epoch(u64);

impl Epoch {
    /// Epoch of credentials that have never been replaced.
    pub const INITIAL: Epoch = Epoch(0);

    /// Mint a new epoch, strictly greater than every epoch minted before it.
    pub fn next() -> Self {
        Epoch(NEXT_EPOCH.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub(crate) fn from_value(value: u64) -> Self {
        Epoch(value)
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The handler-side state the coordinator reads and updates.
pub trait AuthTarget: Send + Sync {
    /// Epoch of the credentials a request of `request_type` is sent with.
    fn current_epoch(&self, request_type: CredentialRequestType) -> Epoch;

    fn retry_policy(&self) -> &RetryPolicy;

    /// Install `credential` for `request` and return the new epoch.
    fn install(&self, request: &CredentialRequest, credential: Credential) -> Epoch;
}

/// Result of [`PromptCoordinator::acquire_credentials`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// Another request replaced the credentials in the meantime.
    AlreadyRefreshed(Epoch),
    /// New credentials were obtained and installed.
    Installed(Epoch),
    /// Retry budget spent; nothing was asked.
    Exhausted,
    /// The credential service had nothing to offer.
    Declined,
}

impl AcquireOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            AcquireOutcome::AlreadyRefreshed(_) | AcquireOutcome::Installed(_)
        )
    }
}

/// Process-wide gate allowing one credential prompt at a time.
pub struct PromptCoordinator {
    gate: Mutex<()>,
    service: Arc<dyn CredentialService>,
}

impl PromptCoordinator {
    pub fn new(service: Arc<dyn CredentialService>) -> Self {
        Self {
            gate: Mutex::new(()),
            service,
        }
    }

    pub fn service(&self) -> &Arc<dyn CredentialService> {
        &self.service
    }

    /// Obtain credentials for `target` unless someone already did.
    ///
    /// The epoch check, the budget check and the prompt all run while the
    /// gate is held. The gate is released on every exit path, cancellation
    /// and service errors included.
    pub async fn acquire_credentials(
        &self,
        target: &dyn AuthTarget,
        request: &CredentialRequest,
        before: Epoch,
        cancel: &CancellationToken,
    ) -> Result<AcquireOutcome> {
        let _guard = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            guard = self.gate.lock() => guard,
        };

        let current = target.current_epoch(request.request_type);
        if current != before {
            tracing::debug!(
                uri = %request.uri,
                before = %before,
                current = %current,
                "Credentials already refreshed by a concurrent request"
            );
            return Ok(AcquireOutcome::AlreadyRefreshed(current));
        }

        let policy = target.retry_policy();
        let attempt = policy.increment();
        if policy.is_exhausted(attempt) {
            tracing::warn!(
                uri = %request.uri,
                request_type = %request.request_type,
                attempt,
                max = policy.max_attempts(),
                "Authentication retry budget exhausted"
            );
            return Ok(AcquireOutcome::Exhausted);
        }

        tracing::debug!(
            uri = %request.uri,
            request_type = %request.request_type,
            attempt,
            service = self.service.name(),
            "Requesting credentials"
        );

        let credential = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            result = self.service.get_credentials(request, cancel) => result?,
        };

        match credential {
            Some(credential) => {
                let epoch = target.install(request, credential);
                tracing::info!(
                    uri = %request.uri,
                    request_type = %request.request_type,
                    epoch = %epoch,
                    "Installed new credentials"
                );
                Ok(AcquireOutcome::Installed(epoch))
            }
            None => {
                tracing::warn!(
                    uri = %request.uri,
                    request_type = %request.request_type,
                    "Credential service declined"
                );
                Ok(AcquireOutcome::Declined)
            }
        }
    }
}

impl fmt::Debug for PromptCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptCoordinator")
            .field("service", &self.service.name())
            .finish()
    }
}
