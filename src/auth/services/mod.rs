//! Credential service implementations.

mod callback;
mod chain;
mod environment;
mod explicit;

pub use callback::CallbackPrompt;
pub use chain::ChainService;
pub use environment::EnvironmentService;
pub use explicit::ExplicitService;
