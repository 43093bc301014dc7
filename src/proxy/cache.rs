//! Process-wide proxy credential cache.

use std::sync::Arc;

use dashmap::DashMap;
use url::Url;

use super::{ProxyDescriptor, proxy_address};
use crate::auth::Credential;
use crate::transport::ProxyConfig;

/// Proxy address → shared descriptor.
///
/// Every source routed through the same proxy receives the same
/// [`ProxyDescriptor`], so credentials negotiated once are reused by all of
/// them. Resolves run concurrently; writes for one address are serialized by
/// the map's entry lock.
#[derive(Default)]
pub struct ProxyCredentialCache {
    settings: Option<ProxyConfig>,
    proxies: DashMap<String, Arc<ProxyDescriptor>>,
}

impl ProxyCredentialCache {
    pub fn new(settings: Option<ProxyConfig>) -> Self {
        Self {
            settings,
            proxies: DashMap::new(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(ProxyConfig::from_env())
    }

    pub fn settings(&self) -> Option<&ProxyConfig> {
        self.settings.as_ref()
    }

    /// Descriptor for the proxy `request_uri` is routed through, if any.
    pub fn resolve(&self, request_uri: &Url) -> Option<Arc<ProxyDescriptor>> {
        let settings = self.settings.as_ref()?;
        let raw = settings.proxy_for(request_uri)?;

        let mut proxy_uri = match Url::parse(raw) {
            Ok(uri) => uri,
            Err(e) => {
                tracing::warn!(proxy = raw, error = %e, "Ignoring unparsable proxy address");
                return None;
            }
        };

        let embedded = embedded_credential(&proxy_uri);
        let _ = proxy_uri.set_username("");
        let _ = proxy_uri.set_password(None);
        let address = proxy_address(&proxy_uri);

        let descriptor = self
            .proxies
            .entry(address)
            .or_insert_with(|| {
                let credential = settings
                    .credential()
                    .or(embedded)
                    .unwrap_or(Credential::Default);
                tracing::debug!(
                    proxy = %proxy_uri,
                    credential = credential.credential_type(),
                    "Registered proxy"
                );
                Arc::new(ProxyDescriptor::new(proxy_uri.clone(), credential))
            })
            .clone();

        Some(descriptor)
    }

    /// Record that `descriptor`'s current credential worked.
    ///
    /// Inserts the descriptor if its address is unknown, otherwise refreshes
    /// the cached descriptor with the working credential. Repeated calls are
    /// harmless.
    pub fn promote(&self, descriptor: &Arc<ProxyDescriptor>) {
        let credential = descriptor.credential();
        descriptor.mark_validated();

        self.proxies
            .entry(descriptor.address())
            .and_modify(|existing| {
                if !Arc::ptr_eq(existing, descriptor)
                    && !existing.credential().same_as(&credential)
                {
                    existing.replace_credential_arc(credential.clone());
                }
                existing.mark_validated();
            })
            .or_insert_with(|| descriptor.clone());
    }

    pub fn get(&self, proxy_uri: &Url) -> Option<Arc<ProxyDescriptor>> {
        self.proxies
            .get(&proxy_address(proxy_uri))
            .map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }
}

fn embedded_credential(uri: &Url) -> Option<Credential> {
    if uri.username().is_empty() {
        return None;
    }
    Some(Credential::basic(
        uri.username(),
        uri.password().unwrap_or_default(),
    ))
}
