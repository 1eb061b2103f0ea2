//! ES256 client secrets for Sign in with Apple.
//!
//! The pipeline is normalize ([`pem`]) → import ([`key`]) → sign ([`sign`]).
//! [`inspect`] decodes a finished token for display and never verifies it.
//!
//! ```no_run
//! use apple_client_secret::{create_client_secret, Audience, TokenRequest};
//!
//! let request = TokenRequest {
//!     key_id: "ABC1234567".into(),
//!     issuer: "TEAM123456".into(),
//!     subject: "com.example.app.web".into(),
//!     audience: Audience::Omit,
//!     lifetime_secs: 2_592_000,
//! };
//! let pem = std::fs::read_to_string("AuthKey_ABC1234567.p8")?;
//! let token = create_client_secret(&request, &pem)?;
//! println!("{token}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod inspect;
pub mod key;
pub mod pem;
pub mod sign;
pub mod token;

pub use error::{Error, Result};
pub use inspect::{decode, DecodedToken};
pub use key::{import_private_key, KeyMaterial};
pub use pem::{normalize, PemBlock};
pub use sign::{create_client_secret, sign, sign_at};
pub use token::{
    parse_lifetime, Audience, Claims, CompactToken, Header, LifetimePreset, TokenRequest,
    APPLE_AUDIENCE, MAX_LIFETIME_SECS,
};
