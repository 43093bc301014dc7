//! # source-auth
//!
//! Authenticating HTTP transport for package sources.
//!
//! Each package source gets an [`AuthenticatingHandler`] that sends requests
//! through an inner transport and transparently answers proxy (407) and source
//! (401/403) credential challenges. Handlers share one [`PromptCoordinator`], so
//! when many requests fail on the same stale credential only one of them
//! prompts, and one [`ProxyCredentialCache`], so a proxy credential negotiated
//! once serves every source routed through that proxy. A per-handler retry
//! budget stops prompting after three attempts.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use source_auth::{
//!     AuthConfig, CallbackPrompt, Credential, HandlerFactory, PackageSourceEndpoint,
//!     SourceRequest,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), source_auth::Error> {
//!     let prompt = CallbackPrompt::new(|uri, _proxy, _cancel| async move {
//!         println!("credentials needed for {}", uri);
//!         Some(Credential::basic("user", "password"))
//!     });
//!     let factory = HandlerFactory::new(AuthConfig::from_env(), Arc::new(prompt));
//!
//!     let source = PackageSourceEndpoint::new("feed", "https://feed.example.com/v3/index.json")?;
//!     let handler = factory.create(source)?;
//!
//!     let request = SourceRequest::get(handler.endpoint().uri().clone());
//!     let response = handler.send(request, &CancellationToken::new()).await?;
//!     println!("{}", response.status);
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod auth;
pub mod config;
pub mod handler;
pub mod proxy;
pub mod source;
pub mod transport;

// Re-exports for convenience
pub use auth::{
    AcquireOutcome, AuthScheme, AuthTarget, CallbackPrompt, ChainService, Credential,
    CredentialRequest, CredentialRequestType, CredentialService, CredentialStore,
    EnvironmentService, Epoch, ExplicitService, MAX_AUTH_ATTEMPTS, PromptCoordinator, RetryPolicy,
    SourceCredentials,
};
pub use config::AuthConfig;
pub use handler::{
    AuthState, AuthenticatingHandler, Classification, FailureClassifier, HandlerFactory,
    ProxyAuthSignature,
};
pub use proxy::{ProxyCredentialCache, ProxyDescriptor};
pub use source::PackageSourceEndpoint;
pub use transport::{
    HttpTransport, NetworkConfig, PoolConfig, ProxyConfig, ReqwestTransport, SourceRequest,
    SourceResponse, TransportError, TransportPlatform,
};

/// Error type for source-auth operations.
///
/// Declined credentials and a spent retry budget are not errors: the handler
/// returns the last challenge response instead.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Transport failed for a reason other than an authentication challenge.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Operation was cancelled.
    #[error("Operation cancelled")]
    Cancelled,

    /// Credential acquisition failed unexpectedly.
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    /// Handler requested for a source that is not HTTP(S).
    #[error("Not an HTTP(S) package source: {uri}")]
    UnsupportedSource { uri: String },

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// URI could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Error category for unified error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Network failures outside of authentication
    Transport,
    /// Caller cancelled the operation
    Cancelled,
    /// Credential acquisition failed
    Authorization,
    /// Source or configuration problems
    Configuration,
}

impl Error {
    pub fn auth(message: impl Into<String>) -> Self {
        Error::Auth {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Transport(TransportError::Cancelled) | Error::Cancelled => {
                ErrorCategory::Cancelled
            }
            Error::Transport(_) => ErrorCategory::Transport,
            Error::Auth { .. } => ErrorCategory::Authorization,
            Error::UnsupportedSource { .. } | Error::Config(_) | Error::InvalidUrl(_) => {
                ErrorCategory::Configuration
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.category() == ErrorCategory::Cancelled
    }
}

/// Result type alias for source-auth operations.
pub type Result<T> = std::result::Result<T, Error>;
