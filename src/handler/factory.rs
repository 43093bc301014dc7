//! Composition root for authenticating handlers.

use std::sync::Arc;

use super::{AuthenticatingHandler, FailureClassifier};
use crate::Result;
use crate::auth::{CredentialService, PromptCoordinator, RetryPolicy};
use crate::config::AuthConfig;
use crate::proxy::ProxyCredentialCache;
use crate::source::PackageSourceEndpoint;
use crate::transport::{HttpTransport, ReqwestTransport};

/// Builds handlers that share one prompt coordinator and one proxy cache.
///
/// Construct once per process (or once per test for isolation) and create a
/// handler per package source.
pub struct HandlerFactory {
    config: AuthConfig,
    coordinator: Arc<PromptCoordinator>,
    proxy_cache: Arc<ProxyCredentialCache>,
}

impl HandlerFactory {
    pub fn new(config: AuthConfig, service: Arc<dyn CredentialService>) -> Self {
        let proxy_cache = Arc::new(ProxyCredentialCache::new(config.network.proxy.clone()));
        Self {
            config,
            coordinator: Arc::new(PromptCoordinator::new(service)),
            proxy_cache,
        }
    }

    /// Reuse an existing coordinator and proxy cache.
    pub fn with_shared(
        config: AuthConfig,
        coordinator: Arc<PromptCoordinator>,
        proxy_cache: Arc<ProxyCredentialCache>,
    ) -> Self {
        Self {
            config,
            coordinator,
            proxy_cache,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn coordinator(&self) -> &Arc<PromptCoordinator> {
        &self.coordinator
    }

    pub fn proxy_cache(&self) -> &Arc<ProxyCredentialCache> {
        &self.proxy_cache
    }

    /// Handler on a reqwest transport.
    ///
    /// Fails with [`Error::UnsupportedSource`](crate::Error::UnsupportedSource)
    /// for anything but HTTP(S) endpoints.
    pub fn create(
        &self,
        endpoint: PackageSourceEndpoint,
    ) -> Result<AuthenticatingHandler<ReqwestTransport>> {
        let transport = ReqwestTransport::new(self.config.network.clone());
        self.create_with_transport(endpoint, transport)
    }

    pub fn create_with_transport<T: HttpTransport>(
        &self,
        endpoint: PackageSourceEndpoint,
        transport: T,
    ) -> Result<AuthenticatingHandler<T>> {
        let proxy = if endpoint.is_http() {
            self.proxy_cache.resolve(endpoint.uri())
        } else {
            None
        };

        let handler = AuthenticatingHandler::new(
            endpoint,
            transport,
            proxy,
            self.proxy_cache.clone(),
            self.coordinator.clone(),
            FailureClassifier::new(self.config.prompt_on_forbidden),
            RetryPolicy::new(self.config.max_auth_attempts),
        )?;

        tracing::debug!(
            source = handler.endpoint().name(),
            uri = %handler.endpoint().uri(),
            proxy = handler.proxy().map(|p| p.uri().as_str()).unwrap_or("none"),
            "Created authenticating handler"
        );

        Ok(handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::auth::{AuthScheme, ExplicitService, SourceCredentials};
    use crate::transport::{NetworkConfig, ProxyConfig};

    fn factory(config: AuthConfig) -> HandlerFactory {
        HandlerFactory::new(config, Arc::new(ExplicitService::basic("user", "pass")))
    }

    #[test]
    fn test_create_installs_static_credentials() {
        let endpoint = PackageSourceEndpoint::new("feed", "https://feed.example.com/v3/index.json")
            .unwrap()
            .with_credentials(SourceCredentials::new("source-user", "source-pass"));
        let handler = factory(AuthConfig::default()).create(endpoint).unwrap();

        let stored = handler
            .transport()
            .credentials()
            .get(handler.endpoint().uri(), AuthScheme::Basic)
            .unwrap();
        assert!(stored.same_as(&crate::auth::Credential::basic("source-user", "source-pass")));
    }

    #[test]
    fn test_create_rejects_non_http() {
        let endpoint = PackageSourceEndpoint::new("local", "file:///srv/packages").unwrap();
        assert!(matches!(
            factory(AuthConfig::default()).create(endpoint),
            Err(Error::UnsupportedSource { .. })
        ));
    }

    #[test]
    fn test_handlers_share_proxy_descriptor() {
        let config = AuthConfig::default()
            .network(NetworkConfig::default().proxy(ProxyConfig::all("http://proxy.local:3128")));
        let factory = factory(config);

        let a = factory
            .create(PackageSourceEndpoint::new("a", "https://a.example.com/").unwrap())
            .unwrap();
        let b = factory
            .create(PackageSourceEndpoint::new("b", "https://b.example.com/").unwrap())
            .unwrap();

        assert!(Arc::ptr_eq(a.proxy().unwrap(), b.proxy().unwrap()));
        assert_eq!(factory.proxy_cache().len(), 1);
    }
}
