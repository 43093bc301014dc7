//! Credential types.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};

/// Authentication scheme a credential is registered under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthScheme {
    Basic,
    Bearer,
}

impl AuthScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthScheme::Basic => "Basic",
            AuthScheme::Bearer => "Bearer",
        }
    }
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication credential.
#[derive(Clone)]
pub enum Credential {
    /// Username and password.
    Basic {
        username: String,
        password: SecretString,
    },
    /// Bearer token.
    Token(SecretString),
    /// Ambient system credentials.
    ///
    /// The transport sends nothing explicit and relies on whatever the
    /// environment provides (userinfo embedded in a proxy address, for one).
    Default,
}

impl Credential {
    /// Create Basic credential.
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Create bearer token credential.
    pub fn token(token: impl Into<String>) -> Self {
        Self::Token(SecretString::from(token.into()))
    }

    /// Scheme this credential is sent with, `None` for ambient credentials.
    pub fn scheme(&self) -> Option<AuthScheme> {
        match self {
            Credential::Basic { .. } => Some(AuthScheme::Basic),
            Credential::Token(_) => Some(AuthScheme::Bearer),
            Credential::Default => None,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Credential::Default)
    }

    /// Get credential type name.
    pub fn credential_type(&self) -> &'static str {
        match self {
            Credential::Basic { .. } => "basic",
            Credential::Token(_) => "token",
            Credential::Default => "default",
        }
    }

    /// Value-level equality, comparing secrets by content.
    pub fn same_as(&self, other: &Credential) -> bool {
        match (self, other) {
            (
                Credential::Basic {
                    username: u1,
                    password: p1,
                },
                Credential::Basic {
                    username: u2,
                    password: p2,
                },
            ) => u1 == u2 && p1.expose_secret() == p2.expose_secret(),
            (Credential::Token(t1), Credential::Token(t2)) => t1.expose_secret() == t2.expose_secret(),
            (Credential::Default, Credential::Default) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"[redacted]")
                .finish(),
            Credential::Token(_) => f.debug_tuple("Token").field(&"[redacted]").finish(),
            Credential::Default => f.write_str("Default"),
        }
    }
}

/// Static credentials configured on a package source.
#[derive(Clone)]
pub struct SourceCredentials {
    pub username: String,
    pub password: SecretString,
    /// Schemes the credentials are valid for. Empty means Basic only.
    pub auth_types: Vec<AuthScheme>,
}

impl SourceCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
            auth_types: Vec::new(),
        }
    }

    pub fn auth_types(mut self, types: impl IntoIterator<Item = AuthScheme>) -> Self {
        self.auth_types = types.into_iter().collect();
        self
    }

    /// Credentials paired with the scheme each is installed under.
    pub fn to_credentials(&self) -> Vec<(AuthScheme, Credential)> {
        let schemes = if self.auth_types.is_empty() {
            vec![AuthScheme::Basic]
        } else {
            self.auth_types.clone()
        };

        schemes
            .into_iter()
            .map(|scheme| {
                let credential = match scheme {
                    AuthScheme::Basic => Credential::Basic {
                        username: self.username.clone(),
                        password: self.password.clone(),
                    },
                    AuthScheme::Bearer => Credential::Token(self.password.clone()),
                };
                (scheme, credential)
            })
            .collect()
    }
}

impl fmt::Debug for SourceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceCredentials")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .field("auth_types", &self.auth_types)
            .finish()
    }
}
