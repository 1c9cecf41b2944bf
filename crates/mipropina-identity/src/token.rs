//! Session token verification.
//!
//! The identity provider signs a short-lived RS256 JWT for every signed-in
//! browser session; development setups may self-issue EdDSA (Ed25519)
//! tokens instead. Verifying is stateless: signature, expiry and issuer
//! are checked locally and `sub` is the principal id.

use chrono::Utc;
use jsonwebtoken::crypto::rust_crypto::DEFAULT_PROVIDER;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mipropina_core::models::principal::PrincipalId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{IdentityConfig, SessionAlgorithm};
use crate::error::IdentityError;

/// Select the pure-Rust JWT backend for the whole process.
///
/// Both backends can end up compiled in through feature unification, in
/// which case `jsonwebtoken` refuses to pick one on its own.
pub fn install_crypto_provider() {
    // Already installed (by us or by the host application) is fine.
    DEFAULT_PROVIDER.install_default().ok();
}

impl SessionAlgorithm {
    fn jwt_algorithm(self) -> Algorithm {
        match self {
            Self::Rs256 => Algorithm::RS256,
            Self::EdDsa => Algorithm::EdDSA,
        }
    }

    fn decoding_key(self, pem: &[u8]) -> jsonwebtoken::errors::Result<DecodingKey> {
        match self {
            Self::Rs256 => DecodingKey::from_rsa_pem(pem),
            Self::EdDsa => DecodingKey::from_ed_pem(pem),
        }
    }
}

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Principal id.
    pub sub: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    /// Provider session id, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
}

/// Verifies session tokens against the provider's public key.
#[derive(Clone)]
pub struct SessionVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl SessionVerifier {
    pub fn new(config: &IdentityConfig) -> Result<Self, IdentityError> {
        install_crypto_provider();

        let algorithm = config.session_algorithm;
        let key = algorithm
            .decoding_key(config.session_public_key_pem.as_bytes())
            .map_err(|e| {
                IdentityError::Crypto(format!("bad {algorithm} session public key: {e}"))
            })?;

        let mut validation = Validation::new(algorithm.jwt_algorithm());
        validation.set_issuer(&[&config.session_issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);
        validation.leeway = config.session_leeway_secs;

        Ok(Self { key, validation })
    }

    /// Decode and verify a session token.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, IdentityError> {
        jsonwebtoken::decode::<SessionClaims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => IdentityError::TokenExpired,
                _ => IdentityError::TokenInvalid(e.to_string()),
            })
            .and_then(|claims| {
                if claims.sub.trim().is_empty() {
                    Err(IdentityError::TokenInvalid("empty subject".into()))
                } else {
                    Ok(claims)
                }
            })
    }

    /// Principal id behind a bearer token, or `None` when the token does
    /// not verify.
    pub fn authenticate(&self, bearer: &str) -> Option<PrincipalId> {
        match self.verify(bearer) {
            Ok(claims) => Some(claims.sub),
            Err(err) => {
                debug!(error = %err, "session token rejected");
                None
            }
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Sign a session token with an Ed25519 private key.
///
/// Production tokens come from the identity provider; this is used by
/// local development setups (`MIPROPINA_SESSION_ALGORITHM=EdDSA`) and
/// tests.
pub fn issue_session_token(
    principal_id: &str,
    private_key_pem: &str,
    issuer: &str,
    lifetime_secs: i64,
) -> Result<String, IdentityError> {
    install_crypto_provider();

    let now = Utc::now().timestamp();
    let claims = SessionClaims {
        sub: principal_id.to_string(),
        iss: issuer.to_string(),
        iat: now,
        exp: now + lifetime_secs,
        sid: None,
    };

    let key = EncodingKey::from_ed_pem(private_key_pem.as_bytes())
        .map_err(|e| IdentityError::Crypto(format!("bad private key: {e}")))?;

    jsonwebtoken::encode(&Header::new(Algorithm::EdDSA), &claims, &key)
        .map_err(|e| IdentityError::Crypto(format!("JWT encode: {e}")))
}
