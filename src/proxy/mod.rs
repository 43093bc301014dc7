//! Proxy descriptors and the process-wide proxy credential cache.

mod cache;

pub use cache::ProxyCredentialCache;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use url::Url;

use crate::auth::{Credential, Epoch};

struct CredentialSlot {
    credential: Arc<Credential>,
    epoch: Epoch,
}

/// A proxy address and the credentials negotiated for it.
///
/// Shared by every handler routed through the same proxy. The credential
/// slot is replaced as a whole; readers always see a complete snapshot.
/// Each replacement mints a new [`Epoch`], so handlers sharing the proxy can
/// tell that one of them already fixed a proxy challenge.
pub struct ProxyDescriptor {
    uri: Url,
    slot: RwLock<CredentialSlot>,
    validated: AtomicBool,
}

impl ProxyDescriptor {
    pub fn new(uri: Url, credential: Credential) -> Self {
        Self {
            uri,
            slot: RwLock::new(CredentialSlot {
                credential: Arc::new(credential),
                epoch: Epoch::INITIAL,
            }),
            validated: AtomicBool::new(false),
        }
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// Cache key, `scheme://host:port`.
    pub fn address(&self) -> String {
        proxy_address(&self.uri)
    }

    /// Current credential snapshot.
    pub fn credential(&self) -> Arc<Credential> {
        self.slot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .credential
            .clone()
    }

    /// Epoch of the current credential, [`Epoch::INITIAL`] until replaced.
    pub fn epoch(&self) -> Epoch {
        self.slot.read().unwrap_or_else(|e| e.into_inner()).epoch
    }

    /// Atomically swap in a new credential, returning its epoch.
    pub fn replace_credential(&self, credential: Credential) -> Epoch {
        self.replace_credential_arc(Arc::new(credential))
    }

    pub(crate) fn replace_credential_arc(&self, credential: Arc<Credential>) -> Epoch {
        let epoch = Epoch::next();
        *self.slot.write().unwrap_or_else(|e| e.into_inner()) = CredentialSlot { credential, epoch };
        self.validated.store(false, Ordering::Release);
        epoch
    }

    /// Whether a request has succeeded with the current credential.
    pub fn is_validated(&self) -> bool {
        self.validated.load(Ordering::Acquire)
    }

    pub(crate) fn mark_validated(&self) {
        self.validated.store(true, Ordering::Release);
    }
}

impl fmt::Debug for ProxyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyDescriptor")
            .field("uri", &self.uri.as_str())
            .field("credential", &self.credential())
            .field("epoch", &self.epoch())
            .field("validated", &self.is_validated())
            .finish()
    }
}

pub(crate) fn proxy_address(uri: &Url) -> String {
    format!(
        "{}://{}:{}",
        uri.scheme(),
        uri.host_str().unwrap_or_default(),
        uri.port_or_known_default().unwrap_or_default()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_is_whole_value() {
        let proxy = ProxyDescriptor::new(
            Url::parse("http://proxy.local:3128").unwrap(),
            Credential::Default,
        );
        let before = proxy.credential();
        proxy.replace_credential(Credential::basic("user", "pass"));

        // old snapshot is untouched
        assert!(before.is_default());
        assert!(proxy.credential().same_as(&Credential::basic("user", "pass")));
    }

    #[test]
    fn test_replace_mints_epoch() {
        let proxy = ProxyDescriptor::new(
            Url::parse("http://proxy.local:3128").unwrap(),
            Credential::Default,
        );
        assert_eq!(proxy.epoch(), Epoch::INITIAL);

        let first = proxy.replace_credential(Credential::basic("user", "one"));
        let second = proxy.replace_credential(Credential::basic("user", "two"));
        assert!(second > first);
        assert_eq!(proxy.epoch(), second);
    }

    #[test]
    fn test_replace_clears_validation() {
        let proxy = ProxyDescriptor::new(
            Url::parse("http://proxy.local:3128").unwrap(),
            Credential::Default,
        );
        proxy.mark_validated();
        assert!(proxy.is_validated());
        proxy.replace_credential(Credential::basic("user", "pass"));
        assert!(!proxy.is_validated());
    }

    #[test]
    fn test_address_includes_default_port() {
        let proxy = ProxyDescriptor::new(
            Url::parse("http://proxy.local/").unwrap(),
            Credential::Default,
        );
        assert_eq!(proxy.address(), "http://proxy.local:80");
    }
}
