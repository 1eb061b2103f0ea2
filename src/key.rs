//! PKCS#8 import of P-256 private keys.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use p256::pkcs8::{ObjectIdentifier, PrivateKeyInfo};
use p256::SecretKey;
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::pem::{PemBlock, PKCS8_LABEL};

/// `id-ecPublicKey` from RFC 5480.
const EC_PUBLIC_KEY_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
/// `prime256v1` / `secp256r1`.
const P256_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");

/// Length of a raw `R || S` ES256 signature.
pub const SIGNATURE_LEN: usize = 64;

const MALFORMED_BASE64: &str = "malformed base64";
const UNSUPPORTED_KEY: &str = "unsupported or malformed key";

/// A P-256 private key that can only be used to sign.
///
/// The scalar is never exposed and is wiped when the handle is dropped.
pub struct KeyMaterial {
    signing_key: SigningKey,
}

impl KeyMaterial {
    /// ECDSA/SHA-256 over `msg`, as fixed-width `R || S` with each half
    /// left-padded to 32 bytes. This is the JWS form, not ASN.1 DER.
    pub fn sign(&self, msg: &[u8]) -> Result<[u8; SIGNATURE_LEN]> {
        let signature: Signature = self
            .signing_key
            .try_sign(msg)
            .map_err(|_| Error::Signing("signature generation failed".into()))?;

        let bytes = signature.to_bytes();
        if bytes.len() != SIGNATURE_LEN {
            return Err(Error::Signing("unexpected signature length".into()));
        }
        let mut raw = [0u8; SIGNATURE_LEN];
        raw.copy_from_slice(&bytes);
        Ok(raw)
    }

    #[cfg(test)]
    pub(crate) fn verifying_key(&self) -> &p256::ecdsa::VerifyingKey {
        self.signing_key.verifying_key()
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("curve", &"P-256")
            .finish_non_exhaustive()
    }
}

/// Parse a normalized PEM block into a signing handle.
pub fn import_private_key(pem: &PemBlock) -> Result<KeyMaterial> {
    if pem.label() != Some(PKCS8_LABEL) {
        debug!(label = ?pem.label(), "rejecting non-PKCS#8 armor");
        return Err(Error::key_import(UNSUPPORTED_KEY));
    }

    let compact: Zeroizing<String> =
        Zeroizing::new(pem.body().chars().filter(|c| !c.is_whitespace()).collect());
    let der = Zeroizing::new(
        STANDARD
            .decode(compact.as_bytes())
            .map_err(|_| Error::key_import(MALFORMED_BASE64))?,
    );

    let info = PrivateKeyInfo::try_from(der.as_slice())
        .map_err(|_| Error::key_import(UNSUPPORTED_KEY))?;

    if info.algorithm.oid != EC_PUBLIC_KEY_OID {
        debug!(oid = %info.algorithm.oid, "key is not an EC key");
        return Err(Error::key_import(UNSUPPORTED_KEY));
    }
    match info.algorithm.parameters_oid() {
        Ok(curve) if curve == P256_OID => {}
        Ok(curve) => {
            debug!(curve = %curve, "key is on an unsupported curve");
            return Err(Error::key_import(UNSUPPORTED_KEY));
        }
        Err(_) => return Err(Error::key_import(UNSUPPORTED_KEY)),
    }

    let secret = SecretKey::try_from(info).map_err(|_| Error::key_import(UNSUPPORTED_KEY))?;
    debug!(curve = "P-256", "imported private key");

    Ok(KeyMaterial {
        signing_key: SigningKey::from(secret),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pem::normalize;
    use p256::ecdsa::signature::Verifier;

    const TEST_KEY: &str = include_str!("../tests/fixtures/AuthKey_TEST.p8");
    const P384_KEY: &str = include_str!("../tests/fixtures/p384.p8");
    const ED25519_KEY: &str = include_str!("../tests/fixtures/ed25519.p8");
    const SEC1_KEY: &str = include_str!("../tests/fixtures/sec1.pem");
    const PUBLIC_KEY: &str = include_str!("../tests/fixtures/AuthKey_TEST.pub");

    fn import(text: &str) -> Result<KeyMaterial> {
        import_private_key(&normalize(text)?)
    }

    fn body_of(pem: &str) -> String {
        pem.lines().filter(|l| !l.starts_with("-----")).collect()
    }

    #[test]
    fn imports_pkcs8_p256() {
        import(TEST_KEY).unwrap();
    }

    #[test]
    fn imports_bare_body_with_odd_line_breaks() {
        let body = body_of(TEST_KEY);
        let mangled: String = body
            .chars()
            .enumerate()
            .flat_map(|(i, c)| {
                if i % 17 == 0 {
                    vec!['\n', ' ', c]
                } else {
                    vec![c]
                }
            })
            .collect();
        import(&mangled).unwrap();
    }

    #[test]
    fn signatures_are_fixed_width_and_verify() {
        let key = import(TEST_KEY).unwrap();
        let msg = b"header.claims";
        let raw = key.sign(msg).unwrap();
        assert_eq!(raw.len(), SIGNATURE_LEN);

        let sig = Signature::from_slice(&raw).unwrap();
        key.verifying_key().verify(msg, &sig).unwrap();
    }

    #[test]
    fn rejects_bad_base64() {
        for body in ["!!!!", "QUJD=", "MIGHAgEA*"] {
            let err = import(body).unwrap_err();
            assert_eq!(err, Error::KeyImport("malformed base64".into()), "{body}");
        }
    }

    #[test]
    fn rejects_non_der_bytes() {
        let err = import("QUJD").unwrap_err();
        assert_eq!(err, Error::KeyImport("unsupported or malformed key".into()));
    }

    #[test]
    fn rejects_other_curves_and_algorithms() {
        for pem in [P384_KEY, ED25519_KEY] {
            let err = import(pem).unwrap_err();
            assert_eq!(err, Error::KeyImport("unsupported or malformed key".into()));
        }
    }

    #[test]
    fn rejects_sec1_armor() {
        let err = import(SEC1_KEY).unwrap_err();
        assert_eq!(err.kind(), "KeyImportError");
    }

    #[test]
    fn rejects_public_key_armor() {
        let err = import(PUBLIC_KEY).unwrap_err();
        assert_eq!(err, Error::KeyImport("malformed base64".into()));
    }

    #[test]
    fn errors_do_not_leak_key_text() {
        let body = body_of(TEST_KEY);
        let truncated = &body[..body.len() - 7];
        let err = import(truncated).unwrap_err();
        let msg = err.to_string();
        assert!(!msg.contains(&truncated[..16]));
    }

    #[test]
    fn debug_is_redacted() {
        let key = import(TEST_KEY).unwrap();
        assert_eq!(format!("{key:?}"), "KeyMaterial { curve: \"P-256\", .. }");
    }
}
