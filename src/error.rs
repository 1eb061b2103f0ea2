//! Error taxonomy shared by every stage of token construction.
//!
//! Messages are fixed strings or derived from caller-visible input only.
//! They never carry key bytes or PEM text.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Missing or out-of-range caller input.
    #[error("{0}")]
    Validation(String),
    /// Key text that cannot be turned into a PEM block.
    #[error("invalid key format: {0}")]
    InvalidKeyFormat(String),
    /// PEM block whose contents are not a P-256 PKCS#8 private key.
    #[error("key import failed: {0}")]
    KeyImport(String),
    #[error("signing failed: {0}")]
    Signing(String),
    /// Token handed to the inspector is not a well-formed compact JWS.
    #[error("decode failed: {0}")]
    Decode(String),
}

impl Error {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub(crate) fn key_import(msg: impl Into<String>) -> Self {
        Self::KeyImport(msg.into())
    }

    pub(crate) fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Stable name of the error kind, used in structured output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ValidationError",
            Self::InvalidKeyFormat(_) => "InvalidKeyFormat",
            Self::KeyImport(_) => "KeyImportError",
            Self::Signing(_) => "SigningError",
            Self::Decode(_) => "DecodeError",
        }
    }

    /// The bare message without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(m)
            | Self::InvalidKeyFormat(m)
            | Self::KeyImport(m)
            | Self::Signing(m)
            | Self::Decode(m) => m,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
