use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use farmlink_core::UserId;

use crate::claims::{validate_claims, JwtClaims, TokenValidationError};
use crate::Role;

/// Verifies a bearer token and yields its claims.
///
/// The clock is a parameter so the time-window checks stay deterministic.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError>;
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token is malformed or its signature is invalid")]
    Verification(#[from] jsonwebtoken::errors::Error),

    #[error("token timestamps are out of range")]
    Timestamp,

    #[error(transparent)]
    Window(#[from] TokenValidationError),
}

/// On-the-wire claim layout, with the numeric-date fields JWT tooling expects.
#[derive(Debug, Serialize, Deserialize)]
struct WireClaims {
    sub: UserId,
    role: Role,
    iat: i64,
    exp: i64,
}

impl From<&JwtClaims> for WireClaims {
    fn from(claims: &JwtClaims) -> Self {
        Self {
            sub: claims.sub,
            role: claims.role,
            iat: claims.issued_at.timestamp(),
            exp: claims.expires_at.timestamp(),
        }
    }
}

impl TryFrom<WireClaims> for JwtClaims {
    type Error = TokenError;

    fn try_from(wire: WireClaims) -> Result<Self, TokenError> {
        let issued_at = DateTime::from_timestamp(wire.iat, 0).ok_or(TokenError::Timestamp)?;
        let expires_at = DateTime::from_timestamp(wire.exp, 0).ok_or(TokenError::Timestamp)?;
        Ok(Self {
            sub: wire.sub,
            role: wire.role,
            issued_at,
            expires_at,
        })
    }
}

/// HS256 shared-secret validator (and minter, for dev tooling and tests).
pub struct Hs256JwtValidator {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Hs256JwtValidator {
    pub fn new(secret: Vec<u8>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(&secret),
            decoding: DecodingKey::from_secret(&secret),
        }
    }

    /// Sign a token for the claims. No window validation happens here; the
    /// claims say what they say.
    pub fn mint(&self, claims: &JwtClaims) -> Result<String, TokenError> {
        let wire = WireClaims::from(claims);
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &wire,
            &self.encoding,
        )?)
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError> {
        // Signature and algorithm only; the time window is checked
        // deterministically below instead of with the library's leeway.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims = Default::default();

        let decoded = decode::<WireClaims>(token, &self.decoding, &validation)?;
        let claims = JwtClaims::try_from(decoded.claims)?;
        validate_claims(&claims, now)?;
        Ok(claims)
    }
}
