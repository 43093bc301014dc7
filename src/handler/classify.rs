//! Response and transport-error classification.

use reqwest::StatusCode;

use crate::auth::CredentialRequestType;
use crate::transport::{SourceResponse, TransportError, TransportPlatform};

/// What a send produced, as far as authentication is concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    Success,
    ProxyUnauthorized,
    Unauthorized,
    Forbidden,
    OtherFailure,
}

impl Classification {
    /// Credential the challenge asks for, `None` when nothing is intercepted.
    pub fn request_type(&self) -> Option<CredentialRequestType> {
        match self {
            Classification::ProxyUnauthorized => Some(CredentialRequestType::Proxy),
            Classification::Unauthorized => Some(CredentialRequestType::Unauthorized),
            Classification::Forbidden => Some(CredentialRequestType::Forbidden),
            Classification::Success | Classification::OtherFailure => None,
        }
    }
}

/// Message fragment a platform uses when it reports a proxy challenge as an
/// error instead of a 407 response.
///
/// This is a heuristic: the text belongs to the underlying network library
/// and may change between versions. A signature only applies to errors from
/// its own platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProxyAuthSignature {
    pub platform: TransportPlatform,
    pub pattern: &'static str,
}

pub const KNOWN_PROXY_AUTH_SIGNATURES: &[ProxyAuthSignature] = &[
    ProxyAuthSignature {
        platform: TransportPlatform::HyperTunnel,
        pattern: "proxy authorization required",
    },
    ProxyAuthSignature {
        platform: TransportPlatform::HyperTunnel,
        pattern: "proxy authentication required",
    },
    ProxyAuthSignature {
        platform: TransportPlatform::LegacySecureChannel,
        pattern: "the remote server returned a 407 error",
    },
];

impl ProxyAuthSignature {
    pub fn matches(&self, platform: TransportPlatform, message: &str) -> bool {
        self.platform == platform && message.to_ascii_lowercase().contains(self.pattern)
    }
}

#[derive(Clone, Debug)]
pub struct FailureClassifier {
    prompt_on_forbidden: bool,
    signatures: Vec<ProxyAuthSignature>,
}

impl FailureClassifier {
    pub fn new(prompt_on_forbidden: bool) -> Self {
        Self {
            prompt_on_forbidden,
            signatures: KNOWN_PROXY_AUTH_SIGNATURES.to_vec(),
        }
    }

    pub fn with_signatures(mut self, signatures: Vec<ProxyAuthSignature>) -> Self {
        self.signatures = signatures;
        self
    }

    pub fn classify_response(&self, response: &SourceResponse) -> Classification {
        match response.status {
            StatusCode::PROXY_AUTHENTICATION_REQUIRED => Classification::ProxyUnauthorized,
            StatusCode::UNAUTHORIZED => Classification::Unauthorized,
            StatusCode::FORBIDDEN if self.prompt_on_forbidden => Classification::Forbidden,
            status if status.is_success() => Classification::Success,
            _ => Classification::OtherFailure,
        }
    }

    /// Classify an error raised by a transport running on `platform`.
    ///
    /// Only a secure-channel failure reported by that same platform, whose
    /// message matches one of that platform's signatures, counts as a proxy
    /// challenge.
    pub fn classify_error(
        &self,
        error: &TransportError,
        platform: TransportPlatform,
    ) -> Classification {
        match error {
            TransportError::SecureChannel {
                platform: reported,
                message,
            } if *reported == platform && self.is_proxy_auth_failure(platform, message) => {
                Classification::ProxyUnauthorized
            }
            _ => Classification::OtherFailure,
        }
    }

    pub fn is_proxy_auth_failure(&self, platform: TransportPlatform, message: &str) -> bool {
        self.signatures.iter().any(|s| s.matches(platform, message))
    }
}

impl Default for FailureClassifier {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn response(status: u16) -> SourceResponse {
        SourceResponse::new(
            StatusCode::from_u16(status).unwrap(),
            Url::parse("https://feed.example.com/").unwrap(),
        )
    }

    #[test]
    fn test_status_classification() {
        let classifier = FailureClassifier::default();
        assert_eq!(classifier.classify_response(&response(200)), Classification::Success);
        assert_eq!(classifier.classify_response(&response(204)), Classification::Success);
        assert_eq!(classifier.classify_response(&response(401)), Classification::Unauthorized);
        assert_eq!(classifier.classify_response(&response(403)), Classification::Forbidden);
        assert_eq!(
            classifier.classify_response(&response(407)),
            Classification::ProxyUnauthorized
        );
        assert_eq!(classifier.classify_response(&response(404)), Classification::OtherFailure);
        assert_eq!(classifier.classify_response(&response(500)), Classification::OtherFailure);
    }

    #[test]
    fn test_forbidden_can_be_disabled() {
        let classifier = FailureClassifier::new(false);
        assert_eq!(classifier.classify_response(&response(403)), Classification::OtherFailure);
    }

    #[test]
    fn test_request_types() {
        assert_eq!(
            Classification::ProxyUnauthorized.request_type(),
            Some(CredentialRequestType::Proxy)
        );
        assert_eq!(
            Classification::Forbidden.request_type(),
            Some(CredentialRequestType::Forbidden)
        );
        assert_eq!(Classification::OtherFailure.request_type(), None);
    }

    #[test]
    fn test_signature_requires_matching_platform() {
        let classifier = FailureClassifier::default();

        let tunnel = TransportError::SecureChannel {
            platform: TransportPlatform::HyperTunnel,
            message: "error sending request: client error (Connect): Proxy Authorization Required"
                .into(),
        };
        assert_eq!(
            classifier.classify_error(&tunnel, TransportPlatform::HyperTunnel),
            Classification::ProxyUnauthorized
        );
        assert_eq!(
            classifier.classify_error(&tunnel, TransportPlatform::Standard),
            Classification::OtherFailure
        );

        let legacy = TransportError::SecureChannel {
            platform: TransportPlatform::LegacySecureChannel,
            message: "The remote server returned a 407 error.".into(),
        };
        assert_eq!(
            classifier.classify_error(&legacy, TransportPlatform::LegacySecureChannel),
            Classification::ProxyUnauthorized
        );
        assert_eq!(
            classifier.classify_error(&legacy, TransportPlatform::HyperTunnel),
            Classification::OtherFailure
        );

        let wrong_platform = TransportError::SecureChannel {
            platform: TransportPlatform::Standard,
            message: "The remote server returned a 407 error.".into(),
        };
        assert_eq!(
            classifier.classify_error(&wrong_platform, TransportPlatform::Standard),
            Classification::OtherFailure
        );

        let unrelated = TransportError::SecureChannel {
            platform: TransportPlatform::HyperTunnel,
            message: "certificate has expired".into(),
        };
        assert_eq!(
            classifier.classify_error(&unrelated, TransportPlatform::HyperTunnel),
            Classification::OtherFailure
        );
    }

    #[test]
    fn test_other_errors_never_intercepted() {
        let classifier = FailureClassifier::default();
        assert_eq!(
            classifier.classify_error(
                &TransportError::Other("proxy authorization required".into()),
                TransportPlatform::HyperTunnel
            ),
            Classification::OtherFailure
        );
        assert_eq!(
            classifier.classify_error(&TransportError::Cancelled, TransportPlatform::HyperTunnel),
            Classification::OtherFailure
        );
    }
}
