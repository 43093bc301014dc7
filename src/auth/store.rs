//! Per-transport credential store keyed by URI prefix and scheme.

use std::sync::RwLock;

use url::Url;

use super::{AuthScheme, Credential};

struct StoreEntry {
    prefix: Url,
    scheme: AuthScheme,
    credential: Credential,
}

/// Credentials a transport attaches to outgoing requests.
///
/// Lookup matches on scheme, host and port, then picks the entry with the
/// longest path prefix of the request URI.
#[derive(Default)]
pub struct CredentialStore {
    entries: RwLock<Vec<StoreEntry>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the credential for `prefix` under `scheme`.
    pub fn insert(&self, prefix: &Url, scheme: AuthScheme, credential: Credential) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = entries
            .iter_mut()
            .find(|e| e.scheme == scheme && e.prefix == *prefix)
        {
            entry.credential = credential;
            return;
        }
        entries.push(StoreEntry {
            prefix: prefix.clone(),
            scheme,
            credential,
        });
    }

    /// Make `credential` the one resolved for `uri`.
    ///
    /// Every entry covering `uri` is dropped, whatever its scheme, and the new
    /// credential is stored under `prefix`. Entries for unrelated paths stay.
    pub fn supersede(&self, uri: &Url, prefix: &Url, scheme: AuthScheme, credential: Credential) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.retain(|e| !prefix_matches(&e.prefix, uri) && e.prefix != *prefix);
        entries.push(StoreEntry {
            prefix: prefix.clone(),
            scheme,
            credential,
        });
    }

    pub fn get(&self, uri: &Url, scheme: AuthScheme) -> Option<Credential> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .iter()
            .filter(|e| e.scheme == scheme && prefix_matches(&e.prefix, uri))
            .max_by_key(|e| e.prefix.path().len())
            .map(|e| e.credential.clone())
    }

    /// Best credential for `uri`, Basic preferred over Bearer.
    pub fn resolve(&self, uri: &Url) -> Option<Credential> {
        self.get(uri, AuthScheme::Basic)
            .or_else(|| self.get(uri, AuthScheme::Bearer))
    }

    pub fn remove(&self, prefix: &Url, scheme: AuthScheme) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|e| !(e.scheme == scheme && e.prefix == *prefix));
        entries.len() != before
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn prefix_matches(prefix: &Url, uri: &Url) -> bool {
    prefix.scheme() == uri.scheme()
        && prefix.host_str() == uri.host_str()
        && prefix.port_or_known_default() == uri.port_or_known_default()
        && uri.path().starts_with(prefix.path())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let store = CredentialStore::new();
        store.insert(
            &url("https://feed.example.com/v3/"),
            AuthScheme::Basic,
            Credential::basic("user", "pass"),
        );

        let found = store
            .get(&url("https://feed.example.com/v3/index.json"), AuthScheme::Basic)
            .unwrap();
        assert!(found.same_as(&Credential::basic("user", "pass")));
        assert!(
            store
                .get(&url("https://feed.example.com/v3/index.json"), AuthScheme::Bearer)
                .is_none()
        );
        assert!(store.get(&url("https://other.example.com/v3/"), AuthScheme::Basic).is_none());
    }

    #[test]
    fn test_longest_prefix_wins() {
        let store = CredentialStore::new();
        store.insert(&url("https://feed.example.com/"), AuthScheme::Basic, Credential::basic("root", "a"));
        store.insert(
            &url("https://feed.example.com/private/"),
            AuthScheme::Basic,
            Credential::basic("private", "b"),
        );

        let found = store
            .get(&url("https://feed.example.com/private/pkg"), AuthScheme::Basic)
            .unwrap();
        assert!(found.same_as(&Credential::basic("private", "b")));
    }

    #[test]
    fn test_insert_replaces() {
        let store = CredentialStore::new();
        let prefix = url("https://feed.example.com/");
        store.insert(&prefix, AuthScheme::Basic, Credential::basic("old", "a"));
        store.insert(&prefix, AuthScheme::Basic, Credential::basic("new", "b"));

        assert_eq!(store.len(), 1);
        let found = store.resolve(&prefix).unwrap();
        assert!(found.same_as(&Credential::basic("new", "b")));
    }

    #[test]
    fn test_supersede_replaces_longer_prefix() {
        let store = CredentialStore::new();
        let endpoint = url("http://package.source.net/v3/index.json");
        let origin = url("http://package.source.net/");
        store.insert(&endpoint, AuthScheme::Basic, Credential::basic("stale-user", "old"));
        store.insert(&endpoint, AuthScheme::Bearer, Credential::token("old"));
        store.insert(
            &url("http://package.source.net/other/"),
            AuthScheme::Basic,
            Credential::basic("other", "x"),
        );

        store.supersede(&endpoint, &origin, AuthScheme::Basic, Credential::basic("fresh", "new"));

        let found = store.resolve(&endpoint).unwrap();
        assert!(found.same_as(&Credential::basic("fresh", "new")));
        assert!(store.get(&endpoint, AuthScheme::Bearer).is_none());

        let other = store
            .get(&url("http://package.source.net/other/pkg"), AuthScheme::Basic)
            .unwrap();
        assert!(other.same_as(&Credential::basic("other", "x")));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_remove_and_clear() {
        let store = CredentialStore::new();
        let prefix = url("https://feed.example.com/");
        store.insert(&prefix, AuthScheme::Bearer, Credential::token("t"));
        assert!(store.remove(&prefix, AuthScheme::Bearer));
        assert!(!store.remove(&prefix, AuthScheme::Bearer));

        store.insert(&prefix, AuthScheme::Basic, Credential::basic("u", "p"));
        store.clear();
        assert!(store.is_empty());
    }
}
