//! Identity provider configuration.

use std::fmt;
use std::str::FromStr;

use crate::error::IdentityError;

/// Signature algorithm of session tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionAlgorithm {
    /// RSA PKCS#1 v1.5 with SHA-256, what the hosted provider issues.
    #[default]
    Rs256,
    /// Ed25519, for self-issued development tokens.
    EdDsa,
}

impl FromStr for SessionAlgorithm {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RS256" => Ok(Self::Rs256),
            "EDDSA" | "ED25519" => Ok(Self::EdDsa),
            other => Err(IdentityError::Crypto(format!(
                "unsupported session algorithm: {other}"
            ))),
        }
    }
}

impl fmt::Display for SessionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rs256 => f.write_str("RS256"),
            Self::EdDsa => f.write_str("EdDSA"),
        }
    }
}

/// Configuration for talking to the identity provider.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// PEM-encoded public key that verifies session tokens.
    pub session_public_key_pem: String,
    /// Algorithm the session key uses (default: RS256).
    pub session_algorithm: SessionAlgorithm,
    /// Expected `iss` claim of session tokens.
    pub session_issuer: String,
    /// Clock skew tolerated when checking `exp`/`nbf`, in seconds.
    pub session_leeway_secs: u64,
    /// Base URL of the provider's backend API.
    pub api_base_url: String,
    /// Secret key for the backend API. `None` selects the in-memory
    /// gateway.
    pub api_secret_key: Option<String>,
    /// Webhook signing secret (`whsec_...`). `None` disables the
    /// webhook endpoint.
    pub webhook_secret: Option<String>,
    /// Maximum age of a webhook timestamp, in seconds (default: 300).
    pub webhook_tolerance_secs: i64,
    /// Timeout for backend API calls, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            session_public_key_pem: String::new(),
            session_algorithm: SessionAlgorithm::default(),
            session_issuer: "mipropina".into(),
            session_leeway_secs: 5,
            api_base_url: "https://api.clerk.com".into(),
            api_secret_key: None,
            webhook_secret: None,
            webhook_tolerance_secs: 300,
            request_timeout_secs: 10,
        }
    }
}
