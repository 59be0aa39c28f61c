//! Signed client assertions for the private-key client-credentials flow.
//!
//! The assertion is a short-lived JWT signed with the configured private key:
//! RSA keys sign with RS256, EC (P-256) keys with ES256.

use std::path::Path;

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tfokta_core::{OktaError, OktaResult};

/// Lifetime of a client assertion in seconds.
pub const ASSERTION_TTL_SECS: i64 = 300;

pub const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Claims of a client assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl AssertionClaims {
    pub fn new(client_id: &str, audience: &str) -> Self {
        let iat = Utc::now().timestamp();
        Self {
            iss: client_id.to_string(),
            sub: client_id.to_string(),
            aud: audience.to_string(),
            iat,
            exp: iat + ASSERTION_TTL_SECS,
            jti: Uuid::new_v4().to_string(),
        }
    }
}

/// Private key ready to sign assertions.
pub struct AssertionKey {
    key: EncodingKey,
    algorithm: Algorithm,
    kid: Option<String>,
}

impl std::fmt::Debug for AssertionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssertionKey")
            .field("algorithm", &self.algorithm)
            .field("kid", &self.kid)
            .finish_non_exhaustive()
    }
}

impl AssertionKey {
    /// Load from inline PEM or from a path to a PEM file.
    pub fn load(source: &SecretString, kid: Option<String>) -> OktaResult<Self> {
        let raw = source.expose_secret().trim();
        if raw.contains("-----BEGIN") {
            return Self::from_pem(raw, kid);
        }

        let path = Path::new(raw);
        let pem = std::fs::read_to_string(path).map_err(|e| OktaError::Key {
            message: format!("cannot read private key file {}: {e}", path.display()),
        })?;
        Self::from_pem(&pem, kid)
    }

    /// Parse a PEM private key, choosing the algorithm from the key type.
    pub fn from_pem(pem: &str, kid: Option<String>) -> OktaResult<Self> {
        if !pem.contains("-----BEGIN") {
            return Err(OktaError::Key {
                message: "private key is not PEM encoded".to_string(),
            });
        }
        if pem.contains("PUBLIC KEY") || pem.contains("CERTIFICATE") {
            return Err(OktaError::Key {
                message: "expected a private key, found a public key or certificate".to_string(),
            });
        }

        if let Ok(key) = EncodingKey::from_rsa_pem(pem.as_bytes()) {
            return Ok(Self {
                key,
                algorithm: Algorithm::RS256,
                kid,
            });
        }
        if let Ok(key) = EncodingKey::from_ec_pem(pem.as_bytes()) {
            return Ok(Self {
                key,
                algorithm: Algorithm::ES256,
                kid,
            });
        }

        Err(OktaError::Key {
            message: "unsupported or malformed private key, expected RSA or EC P-256 (PKCS#8)"
                .to_string(),
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn kid(&self) -> Option<&str> {
        self.kid.as_deref()
    }

    /// Sign a fresh assertion for `client_id` addressed to `audience`.
    pub fn sign(&self, client_id: &str, audience: &str) -> OktaResult<String> {
        let mut header = Header::new(self.algorithm);
        header.kid = self.kid.clone();
        let claims = AssertionClaims::new(client_id, audience);

        encode(&header, &claims, &self.key).map_err(|e| OktaError::Key {
            message: format!("failed to sign client assertion: {e}"),
        })
    }
}
