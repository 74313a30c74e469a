use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use p256::ecdsa::signature::Signer as _;
use p256::ecdsa::{Signature, SigningKey};
use p256::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use p256::SecretKey;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use titan_core::TitanError;

/// Client-side P-256 keypair, PEM-encoded for persistence.
///
/// The private half stays in a `Zeroizing<String>` so it is wiped on drop.
/// The service never sees this type; it exists for the `keygen` utility and
/// for tests exercising the wire contract.
pub struct IdentityKeys {
    pub private_key_pem: Zeroizing<String>,
    pub public_key_pem: String,
}

impl IdentityKeys {
    /// Generate a fresh P-256 keypair (PKCS#8 private, SPKI public).
    pub fn generate() -> Result<Self, TitanError> {
        let secret = SecretKey::random(&mut OsRng);
        let private_key_pem = secret
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| TitanError::Internal(format!("encoding private key: {e}")))?;
        let public_key_pem = secret
            .public_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| TitanError::Internal(format!("encoding public key: {e}")))?;
        Ok(Self {
            private_key_pem,
            public_key_pem,
        })
    }
}

/// Sign the UTF-8 bytes of `nonce` with a PKCS#8 private key PEM.
///
/// Returns the DER-encoded ECDSA(SHA-256) signature as URL-safe base64 with
/// padding stripped — exactly what `/v6/zkp/mint` expects back.
pub fn sign_nonce(private_key_pem: &str, nonce: &str) -> Result<String, TitanError> {
    let secret = SecretKey::from_pkcs8_pem(private_key_pem)
        .map_err(|e| TitanError::InvalidKey(e.to_string()))?;
    let signature: Signature = SigningKey::from(&secret).sign(nonce.as_bytes());
    Ok(URL_SAFE_NO_PAD.encode(signature.to_der().as_bytes()))
}
