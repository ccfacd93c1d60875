//! Bearer token verification.
//!
//! Access tokens are minted by the identity provider; Evently only checks
//! them. Two key setups are understood: a shared HS256 secret, or an RS256
//! public key with an optional private key for local minting (tests and
//! tooling).

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Token has expired")]
    Expired,

    #[error("Invalid token")]
    Invalid,

    #[error("Invalid key: {0}")]
    Key(String),

    #[error("No signing key configured")]
    NoSigningKey,

    #[error("Token error: {0}")]
    Other(#[from] jsonwebtoken::errors::Error),
}

impl JwtError {
    fn from_decode(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            ErrorKind::InvalidToken
            | ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => JwtError::Invalid,
            _ => JwtError::Other(err),
        }
    }
}

/// Access token payload. A subject that is not a UUID fails decoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Token keys plus validation settings.
#[derive(Clone)]
pub struct JwtConfig {
    algorithm: Algorithm,
    decoding_key: DecodingKey,
    encoding_key: Option<EncodingKey>,
    /// Lifetime of locally minted tokens.
    pub access_token_expiry_secs: i64,
    pub leeway_secs: u64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("algorithm", &self.algorithm)
            .field("can_sign", &self.encoding_key.is_some())
            .field("access_token_expiry_secs", &self.access_token_expiry_secs)
            .field("leeway_secs", &self.leeway_secs)
            .finish_non_exhaustive()
    }
}

impl JwtConfig {
    /// HS256 with a shared secret.
    pub fn from_secret(
        secret: &str,
        access_token_expiry_secs: i64,
        leeway_secs: u64,
    ) -> Result<Self, JwtError> {
        if secret.is_empty() {
            return Err(JwtError::Key("secret is empty".into()));
        }

        let bytes = secret.as_bytes();
        Ok(Self {
            algorithm: Algorithm::HS256,
            decoding_key: DecodingKey::from_secret(bytes),
            encoding_key: Some(EncodingKey::from_secret(bytes)),
            access_token_expiry_secs,
            leeway_secs,
        })
    }

    /// RS256 from PEM keys. Without a private key the config can only verify.
    pub fn from_rsa_pem(
        private_key_pem: Option<&str>,
        public_key_pem: &str,
        access_token_expiry_secs: i64,
        leeway_secs: u64,
    ) -> Result<Self, JwtError> {
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|e| JwtError::Key(format!("public key: {e}")))?;

        let encoding_key = match private_key_pem {
            Some(pem) => Some(
                EncodingKey::from_rsa_pem(pem.as_bytes())
                    .map_err(|e| JwtError::Key(format!("private key: {e}")))?,
            ),
            None => None,
        };

        Ok(Self {
            algorithm: Algorithm::RS256,
            decoding_key,
            encoding_key,
            access_token_expiry_secs,
            leeway_secs,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Mints a token for `user_id`, returning it with its `jti`.
    pub fn generate_access_token(&self, user_id: Uuid) -> Result<(String, String), JwtError> {
        let key = self.encoding_key.as_ref().ok_or(JwtError::NoSigningKey)?;

        let issued_at = Utc::now();
        let claims = Claims {
            sub: user_id,
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::seconds(self.access_token_expiry_secs)).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = jsonwebtoken::encode(&Header::new(self.algorithm), &claims, key)?;
        Ok((token, claims.jti))
    }

    /// Checks signature, algorithm and expiry (with leeway).
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = self.leeway_secs;

        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(JwtError::from_decode)
    }
}
