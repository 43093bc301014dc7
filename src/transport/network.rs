//! Network configuration for proxy, timeout, and connection pool settings.

use std::env;
use std::fmt;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::auth::Credential;

/// Connection pool configuration.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    pub idle_timeout: Duration,
    pub max_idle_per_host: usize,
    pub tcp_keepalive: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(90),
            max_idle_per_host: 16,
            tcp_keepalive: Some(Duration::from_secs(60)),
        }
    }
}

impl PoolConfig {
    pub fn minimal() -> Self {
        Self {
            idle_timeout: Duration::from_secs(30),
            max_idle_per_host: 2,
            tcp_keepalive: None,
        }
    }
}

/// Network configuration for the HTTP transport.
#[derive(Clone, Debug, Default)]
pub struct NetworkConfig {
    /// Proxy configuration
    pub proxy: Option<ProxyConfig>,
    /// Connection pool settings
    pub pool: Option<PoolConfig>,
    /// Whole-request timeout
    pub timeout: Option<Duration>,
    /// Connect timeout
    pub connect_timeout: Option<Duration>,
    /// User-Agent header value
    pub user_agent: Option<String>,
}

impl NetworkConfig {
    /// Create from environment variables.
    pub fn from_env() -> Self {
        Self {
            proxy: ProxyConfig::from_env(),
            pool: None,
            timeout: env::var("PACKAGE_SOURCE_HTTP_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs),
            connect_timeout: None,
            user_agent: None,
        }
    }

    /// Set proxy configuration.
    pub fn proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Set connection pool configuration.
    pub fn pool(mut self, pool: PoolConfig) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Apply everything except the proxy to a reqwest ClientBuilder.
    ///
    /// Proxies are applied per descriptor by the transport.
    pub fn apply_to_builder(&self, mut builder: reqwest::ClientBuilder) -> reqwest::ClientBuilder {
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(ref user_agent) = self.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        if let Some(ref pool) = self.pool {
            builder = builder
                .pool_idle_timeout(pool.idle_timeout)
                .pool_max_idle_per_host(pool.max_idle_per_host);

            if let Some(keepalive) = pool.tcp_keepalive {
                builder = builder.tcp_keepalive(keepalive);
            }
        }
        builder
    }
}

/// Proxy server configuration.
#[derive(Clone)]
pub struct ProxyConfig {
    /// HTTPS proxy URL
    pub https: Option<String>,
    /// HTTP proxy URL
    pub http: Option<String>,
    /// No-proxy patterns (space or comma separated)
    pub no_proxy: Vec<String>,
    /// Explicit proxy username
    pub username: Option<String>,
    /// Explicit proxy password
    pub password: Option<SecretString>,
}

impl ProxyConfig {
    /// Create from environment variables.
    pub fn from_env() -> Option<Self> {
        let https = env::var("HTTPS_PROXY")
            .ok()
            .or_else(|| env::var("https_proxy").ok());
        let http = env::var("HTTP_PROXY")
            .ok()
            .or_else(|| env::var("http_proxy").ok());

        if https.is_none() && http.is_none() {
            return None;
        }

        let no_proxy = env::var("NO_PROXY")
            .ok()
            .or_else(|| env::var("no_proxy").ok())
            .map(|s| {
                s.split([',', ' '])
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            https,
            http,
            no_proxy,
            username: env::var("PROXY_USERNAME").ok(),
            password: env::var("PROXY_PASSWORD").ok().map(SecretString::from),
        })
    }

    /// Create with HTTPS proxy.
    pub fn https(url: impl Into<String>) -> Self {
        Self {
            https: Some(url.into()),
            http: None,
            no_proxy: Vec::new(),
            username: None,
            password: None,
        }
    }

    /// Same proxy for HTTP and HTTPS traffic.
    pub fn all(url: impl Into<String>) -> Self {
        let url = url.into();
        Self::https(url.clone()).http(url)
    }

    /// Add HTTP proxy.
    pub fn http(mut self, url: impl Into<String>) -> Self {
        self.http = Some(url.into());
        self
    }

    /// Add no-proxy patterns.
    pub fn no_proxy(mut self, patterns: impl IntoIterator<Item = String>) -> Self {
        self.no_proxy.extend(patterns);
        self
    }

    /// Explicit proxy credentials.
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(SecretString::from(password.into()));
        self
    }

    /// Configured proxy credential, if a username was given.
    pub fn credential(&self) -> Option<Credential> {
        let username = self.username.as_ref()?;
        let password = self
            .password
            .as_ref()
            .map(|p| p.expose_secret().to_string())
            .unwrap_or_default();
        Some(Credential::basic(username.clone(), password))
    }

    /// Proxy address for `uri`, `None` when bypassed or unconfigured.
    pub fn proxy_for(&self, uri: &Url) -> Option<&str> {
        if self.is_bypassed(uri) {
            return None;
        }
        match uri.scheme() {
            "https" => self.https.as_deref().or(self.http.as_deref()),
            "http" => self.http.as_deref(),
            _ => None,
        }
    }

    pub fn is_bypassed(&self, uri: &Url) -> bool {
        let Some(host) = uri.host_str() else {
            return true;
        };
        let host = host.to_ascii_lowercase();

        self.no_proxy.iter().any(|pattern| {
            let pattern = pattern.trim().to_ascii_lowercase();
            if pattern == "*" {
                return true;
            }
            let pattern = pattern.trim_start_matches("*.").trim_start_matches('.');
            let pattern = pattern.split(':').next().unwrap_or_default();
            !pattern.is_empty()
                && (host == pattern || host.ends_with(&format!(".{}", pattern)))
        })
    }
}

impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("https", &self.https)
            .field("http", &self.http)
            .field("no_proxy", &self.no_proxy)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}
