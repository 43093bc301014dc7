//! Inner HTTP transport contract and its reqwest implementation.

mod http;
mod network;

pub use http::ReqwestTransport;
pub use network::{NetworkConfig, PoolConfig, ProxyConfig};

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::auth::CredentialStore;
use crate::proxy::ProxyDescriptor;

/// Network stack a transport runs on.
///
/// Some stacks report a proxy authentication challenge as a connection
/// failure instead of a 407 response; the classifier keys its fallback
/// heuristics on this value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransportPlatform {
    /// Always surfaces 407 as a response.
    Standard,
    /// hyper CONNECT tunnels: 407 on an HTTPS tunnel becomes an error.
    HyperTunnel,
    /// TLS stacks that fail the secure channel with a "407" message.
    LegacySecureChannel,
}

impl fmt::Display for TransportPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportPlatform::Standard => "standard",
            TransportPlatform::HyperTunnel => "hyper-tunnel",
            TransportPlatform::LegacySecureChannel => "legacy-secure-channel",
        };
        f.write_str(name)
    }
}

/// Errors raised by a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// reqwest failed outside of any proxy tunnel.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Connection or secure channel setup failed.
    #[error("Secure channel failure ({platform}): {message}")]
    SecureChannel {
        platform: TransportPlatform,
        message: String,
    },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Transport error: {0}")]
    Other(String),
}

/// A request that can be sent more than once.
#[derive(Clone, Debug)]
pub struct SourceRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl SourceRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn header(mut self, name: reqwest::header::HeaderName, value: reqwest::header::HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// A fully buffered response.
#[derive(Clone, Debug)]
pub struct SourceResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub url: Url,
}

impl SourceResponse {
    pub fn new(status: StatusCode, url: Url) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            url,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// The transport an [`AuthenticatingHandler`](crate::AuthenticatingHandler)
/// wraps.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send `request`, through `proxy` when given.
    ///
    /// Credentials for the request URI come from [`credentials`](Self::credentials);
    /// proxy credentials from the descriptor's current snapshot.
    async fn send(
        &self,
        request: SourceRequest,
        proxy: Option<&ProxyDescriptor>,
        cancel: &CancellationToken,
    ) -> Result<SourceResponse, TransportError>;

    fn credentials(&self) -> &CredentialStore;

    fn platform(&self) -> TransportPlatform {
        TransportPlatform::Standard
    }
}
