//! Identity lifecycle webhooks.
//!
//! The provider delivers `user.created`, `user.updated` and
//! `user.deleted` events signed with the Svix scheme: an HMAC-SHA256
//! over `{msg_id}.{timestamp}.{body}`, keyed with the base64 secret that
//! follows the `whsec_` prefix, sent as a space-separated list of
//! `v1,<base64 signature>` entries.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use mipropina_core::models::principal::Principal;
use serde::Deserialize;
use sha2::Sha256;

use crate::clerk::ProviderUser;
use crate::error::IdentityError;

type HmacSha256 = Hmac<Sha256>;

const SECRET_PREFIX: &str = "whsec_";
const SIGNATURE_VERSION: &str = "v1";

/// The three headers that accompany every delivery.
#[derive(Debug, Clone, Copy)]
pub struct WebhookHeaders<'a> {
    pub id: &'a str,
    pub timestamp: &'a str,
    pub signature: &'a str,
}

#[derive(Clone)]
pub struct WebhookVerifier {
    key: Vec<u8>,
    tolerance_secs: i64,
}

impl WebhookVerifier {
    pub fn new(secret: &str, tolerance_secs: i64) -> Result<Self, IdentityError> {
        let encoded = secret.strip_prefix(SECRET_PREFIX).unwrap_or(secret);
        let key = STANDARD
            .decode(encoded)
            .map_err(|e| IdentityError::Crypto(format!("bad webhook secret: {e}")))?;
        Ok(Self {
            key,
            tolerance_secs,
        })
    }

    fn mac(&self, id: &str, timestamp: &str, body: &[u8]) -> Result<HmacSha256, IdentityError> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| IdentityError::Crypto(e.to_string()))?;
        mac.update(id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        Ok(mac)
    }

    /// Signature header value for a payload, as the provider would send it.
    pub fn sign(&self, id: &str, timestamp: i64, body: &[u8]) -> Result<String, IdentityError> {
        let sig = self.mac(id, &timestamp.to_string(), body)?.finalize().into_bytes();
        Ok(format!("{SIGNATURE_VERSION},{}", STANDARD.encode(sig)))
    }

    /// Check the timestamp window and that at least one `v1` signature
    /// matches. `now` is a Unix timestamp.
    pub fn verify(
        &self,
        headers: WebhookHeaders<'_>,
        body: &[u8],
        now: i64,
    ) -> Result<(), IdentityError> {
        let timestamp: i64 = headers
            .timestamp
            .trim()
            .parse()
            .map_err(|_| IdentityError::MalformedWebhook("invalid timestamp header".into()))?;
        let tolerance = u64::try_from(self.tolerance_secs).unwrap_or(0);
        if now.abs_diff(timestamp) > tolerance {
            return Err(IdentityError::TimestampOutOfTolerance);
        }

        let mac = self.mac(headers.id, headers.timestamp.trim(), body)?;
        let matched = headers
            .signature
            .split_whitespace()
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == SIGNATURE_VERSION)
            .filter_map(|(_, sig)| STANDARD.decode(sig).ok())
            .any(|sig| mac.clone().verify_slice(&sig).is_ok());

        if matched {
            Ok(())
        } else {
            Err(IdentityError::SignatureInvalid)
        }
    }
}

/// A verified lifecycle event.
#[derive(Debug, Clone)]
pub enum IdentityEvent {
    /// `user.created` or `user.updated`.
    PrincipalUpserted(Principal),
    /// `user.deleted`. The provider may omit the id.
    PrincipalDeleted(Option<String>),
    /// Any other event type, acknowledged and ignored.
    Ignored(String),
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct DeletedData {
    #[serde(default)]
    id: Option<String>,
}

impl IdentityEvent {
    pub fn parse(body: &[u8]) -> Result<Self, IdentityError> {
        let envelope: Envelope = serde_json::from_slice(body)
            .map_err(|e| IdentityError::MalformedWebhook(e.to_string()))?;

        match envelope.kind.as_str() {
            "user.created" | "user.updated" => {
                let user: ProviderUser = serde_json::from_value(envelope.data)
                    .map_err(|e| IdentityError::MalformedWebhook(e.to_string()))?;
                Ok(Self::PrincipalUpserted(user.into_principal()))
            }
            "user.deleted" => {
                let data: DeletedData = serde_json::from_value(envelope.data)
                    .map_err(|e| IdentityError::MalformedWebhook(e.to_string()))?;
                Ok(Self::PrincipalDeleted(data.id.filter(|id| !id.is_empty())))
            }
            _ => Ok(Self::Ignored(envelope.kind)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // base64("mipropina-webhook-test-secret")
    const SECRET: &str = "whsec_bWlwcm9waW5hLXdlYmhvb2stdGVzdC1zZWNyZXQ=";

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new(SECRET, 300).unwrap()
    }

    #[test]
    fn signed_payload_verifies() {
        let v = verifier();
        let body = br#"{"type":"user.deleted","data":{"id":"user_a"}}"#;
        let signature = v.sign("msg_1", 1_700_000_000, body).unwrap();

        let headers = WebhookHeaders {
            id: "msg_1",
            timestamp: "1700000000",
            signature: &signature,
        };
        v.verify(headers, body, 1_700_000_010).unwrap();
    }

    #[test]
    fn any_listed_signature_may_match() {
        let v = verifier();
        let body = b"{}";
        let good = v.sign("msg_1", 1_700_000_000, body).unwrap();
        let list = format!("v1,AAAA {good}");

        let headers = WebhookHeaders {
            id: "msg_1",
            timestamp: "1700000000",
            signature: &list,
        };
        v.verify(headers, body, 1_700_000_000).unwrap();
    }

    #[test]
    fn tampered_body_is_rejected() {
        let v = verifier();
        let signature = v.sign("msg_1", 1_700_000_000, b"{\"a\":1}").unwrap();

        let headers = WebhookHeaders {
            id: "msg_1",
            timestamp: "1700000000",
            signature: &signature,
        };
        assert!(matches!(
            v.verify(headers, b"{\"a\":2}", 1_700_000_000),
            Err(IdentityError::SignatureInvalid)
        ));
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let v = verifier();
        let signature = v.sign("msg_1", 1_700_000_000, b"{}").unwrap();

        let headers = WebhookHeaders {
            id: "msg_1",
            timestamp: "1700000000",
            signature: &signature,
        };
        assert!(matches!(
            v.verify(headers, b"{}", 1_700_000_000 + 301),
            Err(IdentityError::TimestampOutOfTolerance)
        ));
    }

    #[test]
    fn extreme_timestamps_are_out_of_tolerance() {
        let v = verifier();
        for timestamp in ["-9223372036854775808", "9223372036854775807"] {
            let headers = WebhookHeaders {
                id: "msg_1",
                timestamp,
                signature: "v1,AAAA",
            };
            assert!(matches!(
                v.verify(headers, b"{}", 1_700_000_000),
                Err(IdentityError::TimestampOutOfTolerance)
            ));
        }
    }

    #[test]
    fn parses_lifecycle_events() {
        let created = IdentityEvent::parse(
            br#"{"type":"user.created","data":{"id":"user_a","email_addresses":[{"id":"e1","email_address":"a@example.com"}],"primary_email_address_id":"e1","public_metadata":{}}}"#,
        )
        .unwrap();
        match created {
            IdentityEvent::PrincipalUpserted(p) => {
                assert_eq!(p.id, "user_a");
                assert_eq!(p.email.as_deref(), Some("a@example.com"));
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let deleted =
            IdentityEvent::parse(br#"{"type":"user.deleted","data":{"id":"user_a","deleted":true}}"#)
                .unwrap();
        assert!(matches!(deleted, IdentityEvent::PrincipalDeleted(Some(id)) if id == "user_a"));

        let other = IdentityEvent::parse(br#"{"type":"session.created","data":{}}"#).unwrap();
        assert!(matches!(other, IdentityEvent::Ignored(kind) if kind == "session.created"));
    }

    #[test]
    fn malformed_body_is_reported() {
        assert!(matches!(
            IdentityEvent::parse(b"not json"),
            Err(IdentityError::MalformedWebhook(_))
        ));
    }
}
