//! Token data model: header, claims, audience profiles and request validation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// JWS algorithm for ECDSA P-256 with SHA-256.
pub const ALGORITHM: &str = "ES256";

/// Apple's documented ceiling for client secret lifetime (six months).
pub const MAX_LIFETIME_SECS: i64 = 15_777_000;

/// Audience used by the Sign in with Apple token endpoint.
pub const APPLE_AUDIENCE: &str = "https://appleid.apple.com";

/// Whether the claims carry an `aud` and what it says.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Audience {
    /// No `aud` claim at all.
    #[default]
    Omit,
    Literal(String),
}

impl Audience {
    pub fn as_claim(&self) -> Option<&str> {
        match self {
            Audience::Omit => None,
            Audience::Literal(aud) => Some(aud),
        }
    }
}

impl From<String> for Audience {
    fn from(s: String) -> Self {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
            Audience::Omit
        } else {
            Audience::Literal(trimmed.to_string())
        }
    }
}

impl From<Audience> for String {
    fn from(aud: Audience) -> Self {
        aud.to_string()
    }
}

impl FromStr for Audience {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Audience::from(s.to_string()))
    }
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Audience::Omit => f.write_str("none"),
            Audience::Literal(aud) => f.write_str(aud),
        }
    }
}

/// JOSE header. Always exactly `alg` and `kid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub alg: String,
    pub kid: String,
}

impl Header {
    pub fn es256(key_id: &str) -> Self {
        Self {
            alg: ALGORITHM.to_string(),
            kid: key_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

/// A signed compact JWS: `header.claims.signature`, each unpadded base64url.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CompactToken(String);

impl CompactToken {
    pub(crate) fn from_segments(header: &str, claims: &str, signature: &str) -> Self {
        Self(format!("{header}.{claims}.{signature}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CompactToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CompactToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Everything needed to mint a token apart from the key itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRequest {
    pub key_id: String,
    pub issuer: String,
    pub subject: String,
    pub audience: Audience,
    pub lifetime_secs: i64,
}

impl TokenRequest {
    /// Check caller input. The first failing check wins, in this order:
    /// key id, issuer, subject, key presence, lifetime sign, lifetime ceiling.
    pub fn validate(&self, key_present: bool) -> Result<()> {
        if self.key_id.trim().is_empty() {
            return Err(Error::validation("key id is required"));
        }
        if self.issuer.trim().is_empty() {
            return Err(Error::validation("issuer is required"));
        }
        if self.subject.trim().is_empty() {
            return Err(Error::validation("subject is required"));
        }
        if !key_present {
            return Err(Error::validation("private key is required"));
        }
        if self.lifetime_secs <= 0 {
            return Err(Error::validation("lifetime must be a positive integer"));
        }
        if self.lifetime_secs > MAX_LIFETIME_SECS {
            return Err(Error::validation("lifetime exceeds maximum"));
        }
        Ok(())
    }

    pub(crate) fn header(&self) -> Header {
        Header::es256(&self.key_id)
    }

    pub(crate) fn claims(&self, issued_at: i64) -> Result<Claims> {
        let exp = issued_at
            .checked_add(self.lifetime_secs)
            .ok_or_else(|| Error::validation("expiration is out of range"))?;
        Ok(Claims {
            iss: self.issuer.clone(),
            sub: self.subject.clone(),
            aud: self.audience.as_claim().map(str::to_string),
            iat: issued_at,
            exp,
        })
    }
}

/// Convenience lifetimes offered to callers. They are not trusted: a preset
/// goes through the same validation as any other value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifetimePreset {
    Hour,
    Day,
    Week,
    Month,
    SixMonths,
    Year,
}

impl LifetimePreset {
    pub fn seconds(self) -> i64 {
        match self {
            LifetimePreset::Hour => 3_600,
            LifetimePreset::Day => 86_400,
            LifetimePreset::Week => 604_800,
            LifetimePreset::Month => 2_592_000,
            LifetimePreset::SixMonths => MAX_LIFETIME_SECS,
            LifetimePreset::Year => 31_536_000,
        }
    }
}

/// Parse a lifetime given as decimal seconds.
pub fn parse_lifetime(text: &str) -> Result<i64> {
    text.trim()
        .parse::<i64>()
        .map_err(|_| Error::validation("lifetime must be a positive integer"))
}
