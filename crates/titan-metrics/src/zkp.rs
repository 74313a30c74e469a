use std::sync::Mutex;
use std::time::Instant;

use serde::Serialize;

use titan_core::IdentityId;

/// Counters for the proof-of-possession pipeline. Per-process, like the rest
/// of the telemetry.
pub struct ZkpMetrics {
    started: Instant,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    identities_created: u64,
    challenges_issued: u64,
    mints_success: u64,
    mints_failed: u64,
    last_identity_id: Option<String>,
}

#[derive(Clone, Serialize, Debug)]
pub struct ZkpSnapshot {
    pub zkp_identities_created: u64,
    pub zkp_challenges_issued: u64,
    pub zkp_mints_success: u64,
    pub zkp_mints_failed: u64,
    pub zkp_mints_total: u64,
    pub zkp_mint_success_rate_pct: f64,
    pub zkp_tps: f64,
    pub zkp_last_identity_id: String,
    pub zkp_uptime_seconds: f64,
}

impl ZkpMetrics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn record_identity_created(&self, identity_id: &IdentityId) {
        let mut inner = self.lock();
        inner.identities_created += 1;
        let id = identity_id.as_str();
        inner.last_identity_id = Some(id[..id.len().min(36)].to_string());
    }

    pub fn record_challenge_issued(&self) {
        self.lock().challenges_issued += 1;
    }

    pub fn record_mint_success(&self) {
        self.lock().mints_success += 1;
    }

    pub fn record_mint_failed(&self) {
        self.lock().mints_failed += 1;
    }

    pub fn snapshot(&self) -> ZkpSnapshot {
        let uptime = self.started.elapsed().as_secs_f64();
        let inner = self.lock();
        let total = inner.mints_success + inner.mints_failed;
        let success_rate = if total > 0 {
            inner.mints_success as f64 / total as f64 * 100.0
        } else {
            100.0
        };
        let tps = if uptime > 0.0 {
            inner.mints_success as f64 / uptime
        } else {
            0.0
        };
        ZkpSnapshot {
            zkp_identities_created: inner.identities_created,
            zkp_challenges_issued: inner.challenges_issued,
            zkp_mints_success: inner.mints_success,
            zkp_mints_failed: inner.mints_failed,
            zkp_mints_total: total,
            zkp_mint_success_rate_pct: round2(success_rate),
            zkp_tps: round2(tps),
            zkp_last_identity_id: inner
                .last_identity_id
                .clone()
                .unwrap_or_else(|| "none".to_string()),
            zkp_uptime_seconds: round2(uptime),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ZkpMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
