use std::sync::Arc;

use tracing::debug;

use titan_core::{Fingerprint, IdentityId, TitanError};
use titan_crypto::{fingerprint, normalize_pem, parse_public_key_pem, verify_nonce_signature};

use crate::store::IdentityStore;

/// Certificate Authority: the only component that can relate an opaque
/// identity id to a public key. The token-issuing surface asks it exactly two
/// questions — "is this id authorized?" and "did this id sign this nonce?".
pub struct CaService {
    store: Arc<IdentityStore>,
}

impl CaService {
    pub fn new(store: Arc<IdentityStore>) -> Self {
        Self { store }
    }

    /// Validate and register a public key. The PEM must parse as a well-formed
    /// ECDSA P-256 key; the normalised form is what gets stored and
    /// fingerprinted.
    pub fn register_identity(
        &self,
        pubkey_pem: &str,
        scope: Option<&str>,
    ) -> Result<(IdentityId, Fingerprint), TitanError> {
        parse_public_key_pem(pubkey_pem)?;
        let normalized = normalize_pem(pubkey_pem);
        let (identity_id, fp) = self
            .store
            .register(&normalized, fingerprint(&normalized), scope)?;
        debug!(identity = %identity_id, fingerprint = %fp, "identity registered");
        Ok((identity_id, fp))
    }

    /// Verify that `signature_b64` is a valid DER ECDSA(SHA-256) signature
    /// over `nonce` by the key registered for `identity_id`.
    ///
    /// Never raises: unknown or revoked identity, storage trouble, malformed
    /// signature and verification mismatch all return `false`, so callers
    /// observe the same behaviour and timing shape in every rejection case.
    pub fn verify_signature(
        &self,
        identity_id: &IdentityId,
        nonce: &str,
        signature_b64: &str,
    ) -> bool {
        let Ok(Some(pubkey_pem)) = self.store.get_public_key(identity_id) else {
            return false;
        };
        verify_nonce_signature(&pubkey_pem, nonce, signature_b64)
    }

    pub fn is_authorized(&self, identity_id: &IdentityId) -> Result<bool, TitanError> {
        self.store.is_authorized(identity_id)
    }

    pub fn revoke(&self, identity_id: &IdentityId) -> Result<bool, TitanError> {
        self.store.revoke(identity_id)
    }

    /// Store handle for the stats endpoint's CA counters.
    pub fn store(&self) -> &IdentityStore {
        &self.store
    }
}
