//! reqwest-backed transport.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::header::HeaderValue;
use secrecy::ExposeSecret;
use tokio_util::sync::CancellationToken;

use super::{
    HttpTransport, NetworkConfig, SourceRequest, SourceResponse, TransportError,
    TransportPlatform,
};
use crate::auth::{Credential, CredentialStore};
use crate::handler::KNOWN_PROXY_AUTH_SIGNATURES;
use crate::proxy::ProxyDescriptor;

struct CachedClient {
    proxy: Option<(String, Arc<Credential>)>,
    client: reqwest::Client,
}

impl CachedClient {
    fn matches(&self, key: &Option<(String, Arc<Credential>)>) -> bool {
        match (&self.proxy, key) {
            (None, None) => true,
            (Some((a, c1)), Some((b, c2))) => a == b && Arc::ptr_eq(c1, c2),
            _ => false,
        }
    }
}

/// Transport sending requests with a reqwest client.
///
/// Proxy credentials are fixed when a reqwest client is built, so the client
/// is rebuilt whenever the proxy descriptor's credential snapshot changes.
pub struct ReqwestTransport {
    network: NetworkConfig,
    credentials: CredentialStore,
    client: Mutex<Option<CachedClient>>,
}

impl ReqwestTransport {
    pub fn new(network: NetworkConfig) -> Self {
        Self {
            network,
            credentials: CredentialStore::new(),
            client: Mutex::new(None),
        }
    }

    fn client_for(&self, proxy: Option<&ProxyDescriptor>) -> Result<reqwest::Client, TransportError> {
        let key = proxy.map(|p| (p.address(), p.credential()));

        let mut cached = self.client.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(ref c) = *cached
            && c.matches(&key)
        {
            return Ok(c.client.clone());
        }

        let mut builder = self.network.apply_to_builder(reqwest::Client::builder()).no_proxy();
        if let Some(p) = proxy {
            builder = builder.proxy(build_proxy(p)?);
        }
        let client = builder.build()?;

        tracing::debug!(
            proxy = proxy.map(|p| p.uri().as_str()).unwrap_or("none"),
            "Built HTTP client"
        );

        *cached = Some(CachedClient {
            proxy: key,
            client: client.clone(),
        });
        Ok(client)
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(NetworkConfig::default())
    }
}

fn build_proxy(descriptor: &ProxyDescriptor) -> Result<reqwest::Proxy, TransportError> {
    let proxy = reqwest::Proxy::all(descriptor.uri().as_str())?;
    let proxy = match descriptor.credential().as_ref() {
        Credential::Basic { username, password } => {
            proxy.basic_auth(username, password.expose_secret())
        }
        Credential::Token(token) => {
            let value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| TransportError::Other(format!("invalid proxy token: {}", e)))?;
            proxy.custom_http_auth(value)
        }
        Credential::Default => proxy,
    };
    Ok(proxy)
}

/// A CONNECT tunnel refused with 407 surfaces as a connect error, not a
/// response. Only those become `SecureChannel`; every other failure keeps the
/// original reqwest error.
fn map_send_error(error: reqwest::Error, proxied: bool) -> TransportError {
    if proxied && error.is_connect() {
        let message = error_chain(&error);
        if KNOWN_PROXY_AUTH_SIGNATURES
            .iter()
            .any(|s| s.matches(TransportPlatform::HyperTunnel, &message))
        {
            return TransportError::SecureChannel {
                platform: TransportPlatform::HyperTunnel,
                message,
            };
        }
    }
    TransportError::Http(error)
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(e) = source {
        parts.push(e.to_string());
        source = e.source();
    }
    parts.join(": ")
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        request: SourceRequest,
        proxy: Option<&ProxyDescriptor>,
        cancel: &CancellationToken,
    ) -> Result<SourceResponse, TransportError> {
        let client = self.client_for(proxy)?;

        let mut builder = client
            .request(request.method, request.url.clone())
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        match self.credentials.resolve(&request.url) {
            Some(Credential::Basic { username, password }) => {
                builder = builder.basic_auth(username, Some(password.expose_secret()));
            }
            Some(Credential::Token(token)) => {
                builder = builder.bearer_auth(token.expose_secret());
            }
            Some(Credential::Default) | None => {}
        }

        let exchange = async move {
            let response = builder.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let url = response.url().clone();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>(SourceResponse {
                status,
                headers,
                body,
                url,
            })
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TransportError::Cancelled),
            result = exchange => result,
        };

        result.map_err(|e| map_send_error(e, proxy.is_some()))
    }

    fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    fn platform(&self) -> TransportPlatform {
        TransportPlatform::HyperTunnel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[test]
    fn test_client_reused_until_proxy_credential_changes() {
        let transport = ReqwestTransport::default();
        let proxy = ProxyDescriptor::new(
            Url::parse("http://proxy.local:3128").unwrap(),
            Credential::Default,
        );

        transport.client_for(Some(&proxy)).unwrap();
        let first = transport.client.lock().unwrap().as_ref().unwrap().proxy.clone();

        transport.client_for(Some(&proxy)).unwrap();
        let second = transport.client.lock().unwrap().as_ref().unwrap().proxy.clone();
        assert!(Arc::ptr_eq(&first.unwrap().1, &second.unwrap().1));

        proxy.replace_credential(Credential::basic("user", "pass"));
        transport.client_for(Some(&proxy)).unwrap();
        let third = transport.client.lock().unwrap().as_ref().unwrap().proxy.clone();
        assert!(third.unwrap().1.same_as(&Credential::basic("user", "pass")));
    }

    #[tokio::test]
    async fn test_unreachable_proxy_keeps_reqwest_error() {
        let transport = ReqwestTransport::default();
        // nothing listens on port 1
        let proxy = ProxyDescriptor::new(
            Url::parse("http://127.0.0.1:1").unwrap(),
            Credential::Default,
        );

        let result = transport
            .send(
                SourceRequest::get(Url::parse("http://feed.example.com/v3/index.json").unwrap()),
                Some(&proxy),
                &CancellationToken::new(),
            )
            .await;

        match result {
            Err(TransportError::Http(e)) => assert!(e.is_connect()),
            other => panic!("Expected connect error, got {:?}", other.map(|r| r.status)),
        }
    }

    #[test]
    fn test_error_chain_joins_sources() {
        let inner = std::io::Error::other("proxy authorization required");
        let outer = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, inner);
        let chain = error_chain(&outer);
        assert!(chain.contains("proxy authorization required"));
    }
}
