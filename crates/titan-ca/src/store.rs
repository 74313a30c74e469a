use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use titan_core::constants::DEFAULT_SCOPE;
use titan_core::{Fingerprint, IdentityId, TitanError};

/// One CA row. Immutable after creation except for `revoked`.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Identity {
    pub identity_id: IdentityId,
    pub public_key_pem: String,
    pub fingerprint: Fingerprint,
    pub scope: String,
    pub created_at: String,
    pub revoked: bool,
}

/// Persistent identity table backing the CA, stored in sled.
///
/// Named trees:
///   identities   — identity_id utf8   → bincode(Identity)
///   fingerprints — fingerprint utf8   → identity_id utf8
///
/// The fingerprints tree is the uniqueness index: a fingerprint stays claimed
/// for the lifetime of the row, revoked or not. sled serialises writes, so
/// the store is safe for concurrent readers and writers within one process.
pub struct IdentityStore {
    _db: sled::Db,
    identities: sled::Tree,
    fingerprints: sled::Tree,
}

impl IdentityStore {
    /// Open or create the identity database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TitanError> {
        let db = sled::open(path).map_err(storage)?;
        let identities = db.open_tree("identities").map_err(storage)?;
        let fingerprints = db.open_tree("fingerprints").map_err(storage)?;
        Ok(Self {
            _db: db,
            identities,
            fingerprints,
        })
    }

    /// Insert a new identity for an already-normalised PEM. Fails with
    /// `DuplicateKey` if the fingerprint is claimed, revoked rows included.
    pub fn register(
        &self,
        public_key_pem: &str,
        fingerprint: Fingerprint,
        scope: Option<&str>,
    ) -> Result<(IdentityId, Fingerprint), TitanError> {
        let identity_id = IdentityId::generate();

        // Claim the fingerprint first; compare_and_swap makes the uniqueness
        // check and the claim a single atomic step.
        let claimed = self
            .fingerprints
            .compare_and_swap(
                fingerprint.as_bytes(),
                None::<&[u8]>,
                Some(identity_id.as_bytes()),
            )
            .map_err(storage)?;
        if claimed.is_err() {
            return Err(TitanError::DuplicateKey(
                fingerprint.as_str()[..16.min(fingerprint.as_str().len())].to_string(),
            ));
        }

        let identity = Identity {
            identity_id: identity_id.clone(),
            public_key_pem: public_key_pem.to_string(),
            fingerprint: fingerprint.clone(),
            scope: scope
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(DEFAULT_SCOPE)
                .to_string(),
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            revoked: false,
        };
        let bytes = bincode::serialize(&identity)
            .map_err(|e| TitanError::Serialization(e.to_string()))?;
        self.identities
            .insert(identity_id.as_bytes(), bytes)
            .map_err(storage)?;

        Ok((identity_id, fingerprint))
    }

    fn get(&self, identity_id: &IdentityId) -> Result<Option<Identity>, TitanError> {
        match self.identities.get(identity_id.as_bytes()).map_err(storage)? {
            Some(bytes) => {
                let identity = bincode::deserialize(&bytes)
                    .map_err(|e| TitanError::Serialization(e.to_string()))?;
                Ok(Some(identity))
            }
            None => Ok(None),
        }
    }

    /// Public key PEM for a non-revoked identity. Revoked and unknown ids are
    /// indistinguishable to callers.
    pub fn get_public_key(&self, identity_id: &IdentityId) -> Result<Option<String>, TitanError> {
        Ok(self
            .get(identity_id)?
            .filter(|i| !i.revoked)
            .map(|i| i.public_key_pem))
    }

    pub fn is_authorized(&self, identity_id: &IdentityId) -> Result<bool, TitanError> {
        Ok(self.get_public_key(identity_id)?.is_some())
    }

    /// Set `revoked = true`. Returns whether a row actually transitioned.
    pub fn revoke(&self, identity_id: &IdentityId) -> Result<bool, TitanError> {
        let Some(mut identity) = self.get(identity_id)? else {
            return Ok(false);
        };
        if identity.revoked {
            return Ok(false);
        }
        identity.revoked = true;
        let bytes = bincode::serialize(&identity)
            .map_err(|e| TitanError::Serialization(e.to_string()))?;
        self.identities
            .insert(identity_id.as_bytes(), bytes)
            .map_err(storage)?;
        Ok(true)
    }

    pub fn count_identities(&self, include_revoked: bool) -> Result<u64, TitanError> {
        if include_revoked {
            return Ok(self.identities.len() as u64);
        }
        let mut count = 0u64;
        for item in self.identities.iter() {
            let (_, bytes) = item.map_err(storage)?;
            let identity: Identity = bincode::deserialize(&bytes)
                .map_err(|e| TitanError::Serialization(e.to_string()))?;
            if !identity.revoked {
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn count_revoked(&self) -> Result<u64, TitanError> {
        Ok(self.identities.len() as u64 - self.count_identities(false)?)
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), TitanError> {
        self._db.flush().map_err(storage)?;
        Ok(())
    }
}

fn storage(e: sled::Error) -> TitanError {
    TitanError::Storage(e.to_string())
}
