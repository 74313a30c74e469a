use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use p256::ecdsa::signature::Verifier as _;
use p256::ecdsa::{Signature, VerifyingKey};
use p256::pkcs8::DecodePublicKey;
use sha2::{Digest, Sha256};

use titan_core::{Fingerprint, TitanError};

/// Canonical form of a public key PEM: CRLF collapsed to LF, surrounding
/// whitespace trimmed. Fingerprints and stored rows both use this form so a
/// re-upload of the same key from a different platform dedupes correctly.
pub fn normalize_pem(pem: &str) -> String {
    pem.replace("\r\n", "\n").trim().to_string()
}

/// SHA-256 hex digest of the normalised PEM. Uniqueness key for the CA.
pub fn fingerprint(pem: &str) -> Fingerprint {
    let digest = Sha256::digest(normalize_pem(pem).as_bytes());
    Fingerprint::from_hex(hex::encode(digest))
}

/// Parse a SubjectPublicKeyInfo PEM into a P-256 verifying key.
pub fn parse_public_key_pem(pem: &str) -> Result<VerifyingKey, TitanError> {
    VerifyingKey::from_public_key_pem(&normalize_pem(pem))
        .map_err(|e| TitanError::InvalidKey(e.to_string()))
}

/// Verify a DER-encoded ECDSA(SHA-256) signature over the UTF-8 bytes of
/// `nonce`.
///
/// Any failure — unparsable key, bad base64, malformed DER, mismatched
/// signature — returns `false`. Callers cannot distinguish these cases, so an
/// unknown identity and a forged signature look identical from outside.
pub fn verify_nonce_signature(pubkey_pem: &str, nonce: &str, signature_b64: &str) -> bool {
    let Ok(key) = parse_public_key_pem(pubkey_pem) else {
        return false;
    };
    // Clients strip base64 padding; accept the signature either way.
    let Ok(der) = URL_SAFE_NO_PAD.decode(signature_b64.trim_end_matches('=')) else {
        return false;
    };
    let Ok(sig) = Signature::from_der(&der) else {
        return false;
    };
    key.verify(nonce.as_bytes(), &sig).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{sign_nonce, IdentityKeys};

    #[test]
    fn fingerprint_ignores_line_endings_and_padding() {
        let keys = IdentityKeys::generate().unwrap();
        let crlf = keys.public_key_pem.replace('\n', "\r\n");
        let padded = format!("\n  {}  \n", keys.public_key_pem);
        assert_eq!(fingerprint(&keys.public_key_pem), fingerprint(&crlf));
        assert_eq!(fingerprint(&keys.public_key_pem), fingerprint(&padded));
    }

    #[test]
    fn fingerprints_differ_across_keys() {
        let a = IdentityKeys::generate().unwrap();
        let b = IdentityKeys::generate().unwrap();
        assert_ne!(fingerprint(&a.public_key_pem), fingerprint(&b.public_key_pem));
    }

    #[test]
    fn verify_round_trip() {
        let keys = IdentityKeys::generate().unwrap();
        let sig = sign_nonce(&keys.private_key_pem, "nonce-123").unwrap();
        assert!(verify_nonce_signature(&keys.public_key_pem, "nonce-123", &sig));
    }

    #[test]
    fn verify_rejects_wrong_nonce() {
        let keys = IdentityKeys::generate().unwrap();
        let sig = sign_nonce(&keys.private_key_pem, "nonce-123").unwrap();
        assert!(!verify_nonce_signature(&keys.public_key_pem, "nonce-456", &sig));
    }

    #[test]
    fn verify_rejects_other_identitys_signature() {
        let a = IdentityKeys::generate().unwrap();
        let b = IdentityKeys::generate().unwrap();
        let sig = sign_nonce(&a.private_key_pem, "shared-nonce").unwrap();
        assert!(!verify_nonce_signature(&b.public_key_pem, "shared-nonce", &sig));
    }

    #[test]
    fn verify_rejects_garbage_inputs() {
        let keys = IdentityKeys::generate().unwrap();
        assert!(!verify_nonce_signature(&keys.public_key_pem, "nonce", "!!not-base64!!"));
        assert!(!verify_nonce_signature(&keys.public_key_pem, "nonce", ""));
        assert!(!verify_nonce_signature("not a pem", "nonce", "AAAA"));
    }

    #[test]
    fn verify_rejects_raw_rs_signatures() {
        // Wire contract is DER only; a 64-byte raw (r||s) blob must not pass.
        let keys = IdentityKeys::generate().unwrap();
        let raw = URL_SAFE_NO_PAD.encode([7u8; 64]);
        assert!(!verify_nonce_signature(&keys.public_key_pem, "nonce", &raw));
    }

    #[test]
    fn parse_rejects_non_ec_pem() {
        assert!(parse_public_key_pem("-----BEGIN PUBLIC KEY-----\nZm9v\n-----END PUBLIC KEY-----").is_err());
    }
}
