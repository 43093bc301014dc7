//! Per-source authenticating message handler.
//!
//! [`AuthenticatingHandler`] forwards requests to an inner
//! [`HttpTransport`] and answers 401/403/407 challenges by asking the shared
//! [`PromptCoordinator`] for credentials, installing them and resending:
//!
//! ```text
//! Idle ──challenge──▶ Authenticating ──acquired──▶ Retrying ──send──▶ …
//!                          │
//!                          └──declined / budget spent──▶ Exhausted
//! ```
//!
//! `Exhausted` ends the current request only; the retry budget itself is
//! never refilled.

mod classify;
mod factory;

pub use classify::{
    Classification, FailureClassifier, KNOWN_PROXY_AUTH_SIGNATURES, ProxyAuthSignature,
};
pub use factory::HandlerFactory;

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::auth::{
    AuthTarget, Credential, CredentialRequest, CredentialRequestType, Epoch, PromptCoordinator,
    RetryPolicy,
};
use crate::proxy::{ProxyCredentialCache, ProxyDescriptor};
use crate::source::PackageSourceEndpoint;
use crate::transport::{HttpTransport, SourceRequest, SourceResponse, TransportError};
use crate::{Error, Result};

/// Authentication state of a handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum AuthState {
    Idle = 0,
    Authenticating = 1,
    Retrying = 2,
    Exhausted = 3,
}

impl AuthState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => AuthState::Authenticating,
            2 => AuthState::Retrying,
            3 => AuthState::Exhausted,
            _ => AuthState::Idle,
        }
    }
}

/// Message handler for one package source.
pub struct AuthenticatingHandler<T> {
    endpoint: PackageSourceEndpoint,
    transport: T,
    proxy: Option<Arc<ProxyDescriptor>>,
    proxy_cache: Arc<ProxyCredentialCache>,
    coordinator: Arc<PromptCoordinator>,
    classifier: FailureClassifier,
    retry: RetryPolicy,
    epoch: AtomicU64,
    state: AtomicU8,
}

impl<T: HttpTransport> AuthenticatingHandler<T> {
    /// Wire a handler for an HTTP(S) endpoint.
    ///
    /// Static source credentials are installed on the transport here, before
    /// any request goes out.
    pub fn new(
        endpoint: PackageSourceEndpoint,
        transport: T,
        proxy: Option<Arc<ProxyDescriptor>>,
        proxy_cache: Arc<ProxyCredentialCache>,
        coordinator: Arc<PromptCoordinator>,
        classifier: FailureClassifier,
        retry: RetryPolicy,
    ) -> Result<Self> {
        if !endpoint.is_http() {
            return Err(Error::UnsupportedSource {
                uri: endpoint.uri().to_string(),
            });
        }

        if let Some(credentials) = endpoint.credentials() {
            for (scheme, credential) in credentials.to_credentials() {
                transport
                    .credentials()
                    .insert(endpoint.uri(), scheme, credential);
            }
            tracing::debug!(
                source = endpoint.name(),
                username = %credentials.username,
                "Installed static source credentials"
            );
        }

        Ok(Self {
            endpoint,
            transport,
            proxy,
            proxy_cache,
            coordinator,
            classifier,
            retry,
            epoch: AtomicU64::new(Epoch::INITIAL.value()),
            state: AtomicU8::new(AuthState::Idle as u8),
        })
    }

    pub fn endpoint(&self) -> &PackageSourceEndpoint {
        &self.endpoint
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn proxy(&self) -> Option<&Arc<ProxyDescriptor>> {
        self.proxy.as_ref()
    }

    /// Epoch of the source credentials currently installed.
    pub fn epoch(&self) -> Epoch {
        Epoch::from_value(self.epoch.load(Ordering::Acquire))
    }

    /// Credential prompts consumed so far.
    pub fn auth_attempts(&self) -> u32 {
        self.retry.attempts()
    }

    /// State of the most recently updated send.
    ///
    /// Concurrent sends share this value and the last transition wins. Use
    /// [`send_with_state`](Self::send_with_state) for the outcome of one send.
    pub fn state(&self) -> AuthState {
        AuthState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: &mut AuthState, next: AuthState) {
        *state = next;
        self.state.store(next as u8, Ordering::Release);
    }

    /// Send `request`, answering credential challenges along the way.
    ///
    /// Returns the final response, which is the last challenge response when
    /// credentials were declined or the retry budget is spent. Errors are
    /// non-authentication transport failures, cancellation, and failures of
    /// the credential service.
    pub async fn send(
        &self,
        request: SourceRequest,
        cancel: &CancellationToken,
    ) -> Result<SourceResponse> {
        self.send_with_state(request, cancel)
            .await
            .map(|(response, _)| response)
    }

    /// Like [`send`](Self::send), also returning the state this send ended in:
    /// [`AuthState::Exhausted`] when it gave up on a challenge, otherwise
    /// [`AuthState::Idle`].
    pub async fn send_with_state(
        &self,
        request: SourceRequest,
        cancel: &CancellationToken,
    ) -> Result<(SourceResponse, AuthState)> {
        let mut state = AuthState::Idle;
        self.set_state(&mut state, AuthState::Idle);

        loop {
            let source_before = self.current_epoch(CredentialRequestType::Unauthorized);
            let proxy_before = self.current_epoch(CredentialRequestType::Proxy);
            let result = self
                .transport
                .send(request.clone(), self.proxy.as_deref(), cancel)
                .await;

            let classification = match &result {
                Ok(response) => self.classifier.classify_response(response),
                Err(TransportError::Cancelled) => return Err(Error::Cancelled),
                Err(error) => self
                    .classifier
                    .classify_error(error, self.transport.platform()),
            };

            let request_type = match classification {
                Classification::Success => {
                    if let Some(ref proxy) = self.proxy {
                        self.proxy_cache.promote(proxy);
                    }
                    self.set_state(&mut state, AuthState::Idle);
                    return finish(result, state);
                }
                Classification::OtherFailure => {
                    self.set_state(&mut state, AuthState::Idle);
                    return finish(result, state);
                }
                challenge => match challenge.request_type() {
                    Some(CredentialRequestType::Proxy) if self.proxy.is_none() => {
                        tracing::debug!(
                            source = self.endpoint.name(),
                            "Proxy challenge without a known proxy, passing through"
                        );
                        self.set_state(&mut state, AuthState::Idle);
                        return finish(result, state);
                    }
                    Some(request_type) => request_type,
                    None => return finish(result, state),
                },
            };

            let before = if request_type.is_proxy() {
                proxy_before
            } else {
                source_before
            };

            tracing::debug!(
                source = self.endpoint.name(),
                uri = %request.url,
                request_type = %request_type,
                epoch = %before,
                "Authentication challenge"
            );
            self.set_state(&mut state, AuthState::Authenticating);

            let credential_request =
                CredentialRequest::new(request.url.clone(), self.proxy.clone(), request_type);
            let outcome = match self
                .coordinator
                .acquire_credentials(self, &credential_request, before, cancel)
                .await
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.set_state(&mut state, AuthState::Idle);
                    return Err(e);
                }
            };

            if !outcome.is_success() {
                tracing::debug!(
                    source = self.endpoint.name(),
                    uri = %request.url,
                    outcome = ?outcome,
                    "Giving up on authentication"
                );
                self.set_state(&mut state, AuthState::Exhausted);
                return finish(result, state);
            }

            self.set_state(&mut state, AuthState::Retrying);
        }
    }
}

fn finish(
    result: std::result::Result<SourceResponse, TransportError>,
    state: AuthState,
) -> Result<(SourceResponse, AuthState)> {
    result.map(|response| (response, state)).map_err(Error::from)
}

impl<T: HttpTransport> AuthTarget for AuthenticatingHandler<T> {
    fn current_epoch(&self, request_type: CredentialRequestType) -> Epoch {
        match request_type {
            CredentialRequestType::Proxy => self
                .proxy
                .as_ref()
                .map(|proxy| proxy.epoch())
                .unwrap_or(Epoch::INITIAL),
            CredentialRequestType::Unauthorized | CredentialRequestType::Forbidden => self.epoch(),
        }
    }

    fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Proxy credentials replace the shared descriptor's slot and take its
    /// epoch. Source credentials supersede whatever the transport would have
    /// sent for the request URI.
    fn install(&self, request: &CredentialRequest, credential: Credential) -> Epoch {
        if request.request_type.is_proxy() {
            return match self.proxy {
                Some(ref proxy) => proxy.replace_credential(credential),
                None => Epoch::next(),
            };
        }

        if let Some(scheme) = credential.scheme() {
            self.transport.credentials().supersede(
                &request.uri,
                &origin(&request.uri),
                scheme,
                credential,
            );
        }

        let epoch = Epoch::next();
        self.epoch.store(epoch.value(), Ordering::Release);
        epoch
    }
}

fn origin(uri: &Url) -> Url {
    let mut origin = uri.clone();
    origin.set_path("/");
    origin.set_query(None);
    origin.set_fragment(None);
    let _ = origin.set_username("");
    let _ = origin.set_password(None);
    origin
}
