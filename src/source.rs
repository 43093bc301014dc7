//! Package source descriptor.

use url::Url;

use crate::Result;
use crate::auth::SourceCredentials;

/// A package source as seen by the HTTP layer.
#[derive(Clone, Debug)]
pub struct PackageSourceEndpoint {
    name: String,
    uri: Url,
    credentials: Option<SourceCredentials>,
}

impl PackageSourceEndpoint {
    pub fn new(name: impl Into<String>, uri: &str) -> Result<Self> {
        Ok(Self::from_url(name, Url::parse(uri)?))
    }

    pub fn from_url(name: impl Into<String>, uri: Url) -> Self {
        Self {
            name: name.into(),
            uri,
            credentials: None,
        }
    }

    /// Attach static credentials, installed when the handler is built.
    pub fn with_credentials(mut self, credentials: SourceCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn credentials(&self) -> Option<&SourceCredentials> {
        self.credentials.as_ref()
    }

    pub fn is_http(&self) -> bool {
        matches!(self.uri.scheme(), "http" | "https")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_detection() {
        assert!(PackageSourceEndpoint::new("feed", "https://feed.example.com/v3/index.json")
            .unwrap()
            .is_http());
        assert!(PackageSourceEndpoint::new("plain", "http://package.source.net")
            .unwrap()
            .is_http());
        assert!(!PackageSourceEndpoint::new("local", "file:///srv/packages")
            .unwrap()
            .is_http());
    }

    #[test]
    fn test_invalid_uri() {
        assert!(PackageSourceEndpoint::new("bad", "not a uri").is_err());
    }
}
