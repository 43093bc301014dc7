//! Credential request context passed to credential services.

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::proxy::ProxyDescriptor;

/// Which credential a failed request needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CredentialRequestType {
    /// 407, or a transport failure carrying the proxy-auth signature.
    Proxy,
    /// 401.
    Unauthorized,
    /// 403, treated like 401 when fetching credentials.
    Forbidden,
}

impl CredentialRequestType {
    pub fn is_proxy(&self) -> bool {
        matches!(self, CredentialRequestType::Proxy)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialRequestType::Proxy => "proxy",
            CredentialRequestType::Unauthorized => "unauthorized",
            CredentialRequestType::Forbidden => "forbidden",
        }
    }
}

impl fmt::Display for CredentialRequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Context for one credential acquisition, built per failed send.
#[derive(Clone, Debug)]
pub struct CredentialRequest {
    pub uri: Url,
    pub proxy: Option<Arc<ProxyDescriptor>>,
    pub request_type: CredentialRequestType,
    pub message: String,
}

impl CredentialRequest {
    pub fn new(
        uri: Url,
        proxy: Option<Arc<ProxyDescriptor>>,
        request_type: CredentialRequestType,
    ) -> Self {
        let message = match request_type {
            CredentialRequestType::Proxy => match proxy {
                Some(ref p) => format!("Please provide proxy credentials for: {}", p.uri()),
                None => format!("Please provide proxy credentials for: {}", uri),
            },
            CredentialRequestType::Unauthorized => {
                format!("Please provide credentials for: {}", uri)
            }
            CredentialRequestType::Forbidden => {
                format!("Access to {} is forbidden, please provide other credentials", uri)
            }
        };

        Self {
            uri,
            proxy,
            request_type,
            message,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}
