//! Prompt callback supplied by the hosting application.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::Result;
use crate::auth::{Credential, CredentialRequest, CredentialService};
use crate::proxy::ProxyDescriptor;

/// Adapts a closure `(uri, proxy, cancel) -> Option<Credential>` into a
/// [`CredentialService`].
pub struct CallbackPrompt<F> {
    callback: F,
}

impl<F, Fut> CallbackPrompt<F>
where
    F: Fn(Url, Option<Arc<ProxyDescriptor>>, CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = Option<Credential>> + Send,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

#[async_trait]
impl<F, Fut> CredentialService for CallbackPrompt<F>
where
    F: Fn(Url, Option<Arc<ProxyDescriptor>>, CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = Option<Credential>> + Send,
{
    fn name(&self) -> &str {
        "callback"
    }

    async fn get_credentials(
        &self,
        request: &CredentialRequest,
        cancel: &CancellationToken,
    ) -> Result<Option<Credential>> {
        let credential =
            (self.callback)(request.uri.clone(), request.proxy.clone(), cancel.clone()).await;
        Ok(credential)
    }
}
