//! Credentials and credential acquisition.
//!
//! - **Credentials**: [`Credential`], [`SourceCredentials`] and the per-transport
//!   [`CredentialStore`]
//! - **Services**: the [`CredentialService`] contract plus explicit,
//!   environment, chain and callback implementations
//! - **Coordination**: [`PromptCoordinator`] for single-flight prompting,
//!   [`RetryPolicy`] for the per-handler budget

mod coordinator;
mod credential;
mod request;
mod retry;
mod service;
mod services;
mod store;

pub use coordinator::{AcquireOutcome, AuthTarget, Epoch, PromptCoordinator};
pub use credential::{AuthScheme, Credential, SourceCredentials};
pub use request::{CredentialRequest, CredentialRequestType};
pub use retry::{MAX_AUTH_ATTEMPTS, RetryPolicy};
pub use service::CredentialService;
pub use services::{CallbackPrompt, ChainService, EnvironmentService, ExplicitService};
pub use store::CredentialStore;
