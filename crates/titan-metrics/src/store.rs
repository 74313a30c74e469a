use std::sync::Mutex;
use std::time::Instant;

use serde::Serialize;

use titan_core::constants::{
    CIRCUIT_CLOSED_THRESHOLD, CIRCUIT_UNDER_LOAD_THRESHOLD, MINT_FLUSH_THRESHOLD,
};

/// Advisory load signal derived from the active-connection gauge. Nothing is
/// rejected on this; dashboards read it.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Debug)]
pub enum CircuitBreaker {
    #[serde(rename = "CLOSED")]
    Closed,
    #[serde(rename = "UNDER_LOAD")]
    UnderLoad,
}

/// Response status bucketed the way the latency counters want it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StatusClass {
    Success,
    ClientError,
    ServerError,
}

impl StatusClass {
    pub fn from_status(status: u16) -> Self {
        match status {
            0..=399 => Self::Success,
            400..=499 => Self::ClientError,
            _ => Self::ServerError,
        }
    }
}

/// Point-in-time copy of the per-process counters.
#[derive(Clone, Serialize, Debug)]
pub struct MetricsSnapshot {
    pub engine_version: String,
    pub engine_status: &'static str,
    pub active_workers: usize,
    pub circuit_breaker: CircuitBreaker,
    pub uptime_seconds: f64,
    pub http_req_total: u64,
    pub http_req_2xx: u64,
    pub http_req_4xx: u64,
    pub http_req_5xx: u64,
    pub http_active_connections: i64,
    pub lat_min: f64,
    pub lat_max: f64,
    pub lat_avg: f64,
    pub lat_sum: f64,
    pub sec_tokens_minted: u64,
    pub sec_signatures: u64,
    pub sec_blocked_attempts: u64,
    pub sec_last_user: String,
    pub sec_last_jti: String,
    pub q_dropped_reqs: u64,
    pub health_score: f64,
}

#[derive(Debug)]
struct Counters {
    circuit_breaker: CircuitBreaker,
    http_req_total: u64,
    http_req_2xx: u64,
    http_req_4xx: u64,
    http_req_5xx: u64,
    http_active_connections: i64,
    lat_min: f64,
    lat_max: f64,
    lat_avg: f64,
    lat_sum: f64,
    sec_tokens_minted: u64,
    sec_signatures: u64,
    sec_blocked_attempts: u64,
    sec_last_user: String,
    sec_last_jti: String,
    q_dropped_reqs: u64,
    health_score: f64,
}

#[derive(Debug, Default)]
struct MintBuffer {
    pending: u64,
    last_user: String,
    last_jti: String,
}

impl MintBuffer {
    /// Swap the buffered batch out, leaving the buffer empty.
    fn take(&mut self) -> (u64, String, String) {
        let n = std::mem::take(&mut self.pending);
        (
            n,
            std::mem::take(&mut self.last_user),
            std::mem::take(&mut self.last_jti),
        )
    }
}

/// Per-process telemetry aggregator.
///
/// Two locks: `counters` guards the shared counter block, `mint_buffer`
/// coalesces mint records so the hot path touches the main lock once per
/// `MINT_FLUSH_THRESHOLD` mints. The two locks are NEVER held at the same
/// time — every flush reads the buffer, drops its lock, then applies the
/// batch under the main lock.
pub struct MetricsStore {
    engine_version: String,
    active_workers: usize,
    started: Instant,
    counters: Mutex<Counters>,
    mint_buffer: Mutex<MintBuffer>,
}

impl MetricsStore {
    pub fn new(engine_version: impl Into<String>, active_workers: usize) -> Self {
        Self {
            engine_version: engine_version.into(),
            active_workers,
            started: Instant::now(),
            counters: Mutex::new(Counters {
                circuit_breaker: CircuitBreaker::Closed,
                http_req_total: 0,
                http_req_2xx: 0,
                http_req_4xx: 0,
                http_req_5xx: 0,
                http_active_connections: 0,
                lat_min: 0.0,
                lat_max: 0.0,
                lat_avg: 0.0,
                lat_sum: 0.0,
                sec_tokens_minted: 0,
                sec_signatures: 0,
                sec_blocked_attempts: 0,
                sec_last_user: "none".to_string(),
                sec_last_jti: "none".to_string(),
                q_dropped_reqs: 0,
                health_score: 100.0,
            }),
            mint_buffer: Mutex::new(MintBuffer::default()),
        }
    }

    /// One latency sample per finished request, classified by status.
    pub fn record_http_request(&self, class: StatusClass, latency_ms: f64) {
        let mut c = lock_unpoisoned(&self.counters);
        c.http_req_total += 1;
        match class {
            StatusClass::Success => c.http_req_2xx += 1,
            StatusClass::ClientError => c.http_req_4xx += 1,
            StatusClass::ServerError => c.http_req_5xx += 1,
        }
        c.lat_sum += latency_ms;
        c.lat_avg = c.lat_sum / c.http_req_total as f64;
        if latency_ms > c.lat_max {
            c.lat_max = latency_ms;
        }
        if c.lat_min == 0.0 || latency_ms < c.lat_min {
            c.lat_min = latency_ms;
        }
        if c.http_active_connections < CIRCUIT_CLOSED_THRESHOLD {
            c.circuit_breaker = CircuitBreaker::Closed;
        }
    }

    /// Buffer one successful mint; flush into the main block every
    /// `MINT_FLUSH_THRESHOLD` records.
    pub fn record_mint(&self, user: &str, jti: &str) {
        let batch = {
            let mut buf = lock_unpoisoned(&self.mint_buffer);
            buf.pending += 1;
            buf.last_user = user.to_string();
            buf.last_jti = jti.to_string();
            if buf.pending >= MINT_FLUSH_THRESHOLD {
                Some(buf.take())
            } else {
                None
            }
        };
        // Buffer lock is released before the main lock is touched.
        if let Some(batch) = batch {
            self.apply_mint_batch(batch);
        }
    }

    pub fn record_mint_failure(&self) {
        lock_unpoisoned(&self.counters).sec_blocked_attempts += 1;
    }

    /// Bump the gauge and return the new value.
    pub fn increment_active_connections(&self) -> i64 {
        let mut c = lock_unpoisoned(&self.counters);
        c.http_active_connections += 1;
        if c.http_active_connections > CIRCUIT_UNDER_LOAD_THRESHOLD {
            c.circuit_breaker = CircuitBreaker::UnderLoad;
        }
        c.http_active_connections
    }

    pub fn decrement_active_connections(&self) {
        lock_unpoisoned(&self.counters).http_active_connections -= 1;
    }

    /// Flush the mint buffer, then copy the counters out.
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.flush_mint_buffer();
        let c = lock_unpoisoned(&self.counters);
        MetricsSnapshot {
            engine_version: self.engine_version.clone(),
            engine_status: "RUNNING",
            active_workers: self.active_workers,
            circuit_breaker: c.circuit_breaker,
            uptime_seconds: self.started.elapsed().as_secs_f64(),
            http_req_total: c.http_req_total,
            http_req_2xx: c.http_req_2xx,
            http_req_4xx: c.http_req_4xx,
            http_req_5xx: c.http_req_5xx,
            http_active_connections: c.http_active_connections,
            lat_min: c.lat_min,
            lat_max: c.lat_max,
            lat_avg: c.lat_avg,
            lat_sum: c.lat_sum,
            sec_tokens_minted: c.sec_tokens_minted,
            sec_signatures: c.sec_signatures,
            sec_blocked_attempts: c.sec_blocked_attempts,
            sec_last_user: c.sec_last_user.clone(),
            sec_last_jti: c.sec_last_jti.clone(),
            q_dropped_reqs: c.q_dropped_reqs,
            health_score: c.health_score,
        }
    }

    fn flush_mint_buffer(&self) {
        let batch = lock_unpoisoned(&self.mint_buffer).take();
        self.apply_mint_batch(batch);
    }

    fn apply_mint_batch(&self, (n, user, jti): (u64, String, String)) {
        if n == 0 {
            return;
        }
        let mut c = lock_unpoisoned(&self.counters);
        c.sec_tokens_minted += n;
        c.sec_signatures += n;
        c.sec_last_user = user;
        c.sec_last_jti = jti;
    }
}

/// Metrics must never take the service down; a poisoned lock keeps working
/// with whatever state the panicking writer left behind.
fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
