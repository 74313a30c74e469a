use std::sync::Arc;

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use p256::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use p256::SecretKey;
use rand::rngs::OsRng;

use titan_core::config::SigningAlgorithm;
use titan_core::{TitanError, TokenClaim};

/// Signs one claim set into a compact JWS.
///
/// Implementations hold the service private key in memory only — it is never
/// persisted or exposed; restart is the only rotation path.
pub trait TokenSigner: Send + Sync {
    fn sign(&self, claim: &TokenClaim) -> Result<String, TitanError>;

    /// Wire name of the algorithm, as reported by the stats endpoint.
    fn algorithm(&self) -> &'static str;
}

/// Construct the signer selected by configuration. ECDSA is the default.
pub fn signer_for(algorithm: SigningAlgorithm) -> Result<Arc<dyn TokenSigner>, TitanError> {
    match algorithm {
        SigningAlgorithm::Es256 => Ok(Arc::new(EcdsaSigner::generate()?)),
        SigningAlgorithm::Rs256 => Ok(Arc::new(RsaSigner::generate()?)),
    }
}

// ── ES256 ────────────────────────────────────────────────────────────────────

/// ES256 signer over a process-local P-256 key generated at startup.
pub struct EcdsaSigner {
    encoding_key: EncodingKey,
    public_key_pem: String,
}

impl EcdsaSigner {
    pub fn generate() -> Result<Self, TitanError> {
        let secret = SecretKey::random(&mut OsRng);
        // Zeroizing PEM: dropped (and wiped) as soon as ring has copied it.
        let private_pem = secret
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| TitanError::Internal(format!("encoding signing key: {e}")))?;
        let encoding_key = EncodingKey::from_ec_pem(private_pem.as_bytes())
            .map_err(|e| TitanError::Internal(format!("loading signing key: {e}")))?;
        let public_key_pem = secret
            .public_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| TitanError::Internal(format!("encoding verification key: {e}")))?;
        Ok(Self {
            encoding_key,
            public_key_pem,
        })
    }

    /// Verification half of the service key, for token validation by tests
    /// and trusted downstream services.
    pub fn public_key_pem(&self) -> &str {
        &self.public_key_pem
    }
}

impl TokenSigner for EcdsaSigner {
    fn sign(&self, claim: &TokenClaim) -> Result<String, TitanError> {
        encode(&Header::new(Algorithm::ES256), claim, &self.encoding_key)
            .map_err(|e| TitanError::Signing(e.to_string()))
    }

    fn algorithm(&self) -> &'static str {
        "ECDSA-ES256"
    }
}

// ── RS256 ────────────────────────────────────────────────────────────────────

/// RS256 fallback signer. Kept behind the same interface; selected only when
/// `TITAN_JWT_ALGORITHM=RS256`.
pub struct RsaSigner {
    encoding_key: EncodingKey,
    public_key_pem: String,
}

impl RsaSigner {
    pub fn generate() -> Result<Self, TitanError> {
        use rsa::pkcs8::{EncodePrivateKey as _, EncodePublicKey as _};

        // ring refuses RSA keys under 2048 bits.
        let private_key = rsa::RsaPrivateKey::new(&mut OsRng, 2048)
            .map_err(|e| TitanError::Internal(format!("generating RSA key: {e}")))?;
        let private_pem = private_key
            .to_pkcs8_pem(rsa::pkcs8::LineEnding::LF)
            .map_err(|e| TitanError::Internal(format!("encoding signing key: {e}")))?;
        let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .map_err(|e| TitanError::Internal(format!("loading signing key: {e}")))?;
        let public_key_pem = private_key
            .to_public_key()
            .to_public_key_pem(rsa::pkcs8::LineEnding::LF)
            .map_err(|e| TitanError::Internal(format!("encoding verification key: {e}")))?;
        Ok(Self {
            encoding_key,
            public_key_pem,
        })
    }

    pub fn public_key_pem(&self) -> &str {
        &self.public_key_pem
    }
}

impl TokenSigner for RsaSigner {
    fn sign(&self, claim: &TokenClaim) -> Result<String, TitanError> {
        encode(&Header::new(Algorithm::RS256), claim, &self.encoding_key)
            .map_err(|e| TitanError::Signing(e.to_string()))
    }

    fn algorithm(&self) -> &'static str {
        "RSA-RS256"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
    use titan_core::constants::JWT_ISSUER;
    use titan_core::Subject;

    fn claim() -> TokenClaim {
        TokenClaim::issue(&Subject::or_guest(Some("svc-test")), None, JWT_ISSUER, 24)
    }

    #[test]
    fn es256_token_round_trips_against_public_key() {
        let signer = EcdsaSigner::generate().unwrap();
        let claim = claim();
        let token = signer.sign(&claim).unwrap();

        let header = decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::ES256);

        let key = DecodingKey::from_ec_pem(signer.public_key_pem().as_bytes()).unwrap();
        let mut validation = Validation::new(Algorithm::ES256);
        validation.set_issuer(&[JWT_ISSUER]);
        let decoded = decode::<TokenClaim>(&token, &key, &validation).unwrap();
        assert_eq!(decoded.claims, claim);
        assert_eq!(decoded.claims.exp - decoded.claims.iat, 24 * 3600);
    }

    #[test]
    fn es256_token_fails_against_foreign_key() {
        let signer = EcdsaSigner::generate().unwrap();
        let other = EcdsaSigner::generate().unwrap();
        let token = signer.sign(&claim()).unwrap();

        let key = DecodingKey::from_ec_pem(other.public_key_pem().as_bytes()).unwrap();
        assert!(decode::<TokenClaim>(&token, &key, &Validation::new(Algorithm::ES256)).is_err());
    }

    #[test]
    fn rs256_variant_signs_and_verifies() {
        let signer = RsaSigner::generate().unwrap();
        let token = signer.sign(&claim()).unwrap();

        assert_eq!(decode_header(&token).unwrap().alg, Algorithm::RS256);
        let key = DecodingKey::from_rsa_pem(signer.public_key_pem().as_bytes()).unwrap();
        assert!(decode::<TokenClaim>(&token, &key, &Validation::new(Algorithm::RS256)).is_ok());
    }

    #[test]
    fn signer_for_respects_configured_algorithm() {
        let es = signer_for(SigningAlgorithm::Es256).unwrap();
        assert_eq!(es.algorithm(), "ECDSA-ES256");
    }
}
