use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::warn;

use titan_core::constants::NONCE_BYTES;
use titan_core::{ChallengeId, IdentityId};

/// One issued challenge: the identity it was issued for and the nonce the
/// client must sign.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Challenge {
    pub identity_id: IdentityId,
    pub nonce: String,
}

struct CacheInner {
    entries: HashMap<ChallengeId, Challenge>,
    /// Insertion order for eviction. May contain ids already consumed;
    /// eviction skips those lazily instead of paying for mid-queue removal.
    order: VecDeque<ChallengeId>,
}

/// In-process one-shot challenge store, keyed by challenge id.
///
/// Keying by challenge id (not identity) lets one identity hold any number of
/// in-flight challenges; each is still consumed exactly once. A single mutex
/// covers insert, the eviction scan, and pop.
pub struct ChallengeCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
}

impl ChallengeCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            capacity,
        }
    }

    /// Issue a fresh challenge for `identity_id`: 32 bytes of OS randomness,
    /// URL-safe base64. The caller is responsible for having authorised the
    /// identity with the CA first.
    ///
    /// Crossing `capacity` evicts the oldest half in insertion order — a
    /// memory bound, not a TTL.
    pub fn issue(&self, identity_id: IdentityId) -> (ChallengeId, String) {
        let mut nonce_bytes = [0u8; NONCE_BYTES];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = URL_SAFE_NO_PAD.encode(nonce_bytes);
        let challenge_id = ChallengeId::generate();

        let mut inner = self.lock();
        inner.entries.insert(
            challenge_id.clone(),
            Challenge {
                identity_id,
                nonce: nonce.clone(),
            },
        );
        inner.order.push_back(challenge_id.clone());

        if inner.entries.len() > self.capacity {
            let evict = self.capacity / 2;
            let mut evicted = 0;
            while evicted < evict {
                let Some(oldest) = inner.order.pop_front() else {
                    break;
                };
                if inner.entries.remove(&oldest).is_some() {
                    evicted += 1;
                }
            }
            warn!(evicted, remaining = inner.entries.len(), "challenge cache over capacity");
        }

        (challenge_id, nonce)
    }

    /// Atomically remove and return a challenge. Exactly one caller can win;
    /// every later attempt on the same id gets `None`.
    pub fn consume(&self, challenge_id: &ChallengeId) -> Option<Challenge> {
        self.lock().entries.remove(challenge_id)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consume_is_one_shot() {
        let cache = ChallengeCache::new(16);
        let identity = IdentityId::generate();
        let (cid, nonce) = cache.issue(identity.clone());

        let first = cache.consume(&cid).unwrap();
        assert_eq!(first.identity_id, identity);
        assert_eq!(first.nonce, nonce);
        assert!(cache.consume(&cid).is_none());
    }

    #[test]
    fn nonces_are_long_and_distinct() {
        let cache = ChallengeCache::new(16);
        let identity = IdentityId::generate();
        let (_, a) = cache.issue(identity.clone());
        let (_, b) = cache.issue(identity);
        assert_ne!(a, b);
        // 32 bytes → 43 chars of unpadded base64.
        assert!(a.len() >= 43);
    }

    #[test]
    fn one_identity_can_hold_many_challenges() {
        let cache = ChallengeCache::new(64);
        let identity = IdentityId::generate();
        let issued: Vec<_> = (0..10).map(|_| cache.issue(identity.clone())).collect();

        let ids: std::collections::HashSet<_> =
            issued.iter().map(|(cid, _)| cid.clone()).collect();
        assert_eq!(ids.len(), 10);
        for (cid, nonce) in issued {
            let challenge = cache.consume(&cid).unwrap();
            assert_eq!(challenge.nonce, nonce);
        }
    }

    #[test]
    fn overflow_evicts_the_oldest_half() {
        let cache = ChallengeCache::new(10);
        let identity = IdentityId::generate();
        let issued: Vec<_> = (0..11).map(|_| cache.issue(identity.clone())).collect();

        // 11 entries crossed capacity 10 → the oldest 5 are gone.
        assert_eq!(cache.len(), 6);
        for (cid, _) in &issued[..5] {
            assert!(cache.consume(cid).is_none());
        }
        for (cid, _) in &issued[5..] {
            assert!(cache.consume(cid).is_some());
        }
    }

    #[test]
    fn eviction_skips_already_consumed_ids() {
        let cache = ChallengeCache::new(10);
        let identity = IdentityId::generate();
        let issued: Vec<_> = (0..10).map(|_| cache.issue(identity.clone())).collect();
        // Consume the three oldest, leaving stale ids at the front of the
        // order queue.
        for (cid, _) in &issued[..3] {
            cache.consume(cid).unwrap();
        }

        let (survivor, _) = cache.issue(identity.clone());
        let _ = cache.issue(identity.clone());
        let _ = cache.issue(identity.clone());
        let (latest, _) = cache.issue(identity);

        // 11 live entries crossed capacity → 5 live evictions, counted over
        // live entries only.
        assert_eq!(cache.len(), 6);
        assert!(cache.consume(&latest).is_some());
        assert!(cache.consume(&survivor).is_some());
    }
}
