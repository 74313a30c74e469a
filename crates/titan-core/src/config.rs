use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::constants::{MINT_SLOT_TIMEOUT_SECS, SEMAPHORE_MULTIPLIER};
use crate::error::TitanError;

/// Service signing algorithm. ECDSA P-256 is the default; RSA is kept as a
/// fallback variant behind the same signer interface.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SigningAlgorithm {
    Es256,
    Rs256,
}

impl FromStr for SigningAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ES256" => Ok(Self::Es256),
            "RS256" => Ok(Self::Rs256),
            other => Err(format!("unsupported JWT algorithm: {other}")),
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Es256 => write!(f, "ES256"),
            Self::Rs256 => write!(f, "RS256"),
        }
    }
}

/// Application settings, read from `TITAN_*` environment variables with safe
/// defaults. Constructed once in the composition root and passed down by
/// handle; nothing reads the environment after startup.
#[derive(Clone, Debug)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub version: String,
    pub token_exp_hours: i64,
    pub jwt_algorithm: SigningAlgorithm,
    pub workers: usize,
    pub threads_per_worker: usize,
    pub semaphore_multiplier: usize,
    pub max_queue_capacity: usize,
    pub mint_slot_timeout_secs: u64,
    pub backlog: u32,
    pub ca_db_path: PathBuf,
}

impl Settings {
    pub fn from_env() -> Result<Self, TitanError> {
        Ok(Self {
            host: env_or("TITAN_HOST", "0.0.0.0"),
            port: env_parse("TITAN_PORT", 8000)?,
            version: env_or("TITAN_VERSION", env!("CARGO_PKG_VERSION")),
            token_exp_hours: env_parse("TITAN_TOKEN_EXP_HOURS", 24)?,
            jwt_algorithm: env_parse("TITAN_JWT_ALGORITHM", SigningAlgorithm::Es256)?,
            workers: env_parse("TITAN_UVCORN_WORKERS", 1)?,
            threads_per_worker: env_parse("TITAN_THREADS_PER_WORKER", 32)?,
            semaphore_multiplier: SEMAPHORE_MULTIPLIER,
            max_queue_capacity: env_parse("TITAN_MAX_QUEUE_CAPACITY", 20_000)?,
            mint_slot_timeout_secs: MINT_SLOT_TIMEOUT_SECS,
            // Windows caps the accept backlog far lower than Linux.
            backlog: if cfg!(windows) { 2048 } else { 4096 },
            ca_db_path: PathBuf::from(env_or("TITAN_CA_DB_PATH", "data/ca_zkp")),
        })
    }

    /// Executor permit count: worker threads × multiplier keeps the wait
    /// queue short instead of unbounded.
    pub fn slots(&self) -> usize {
        self.threads_per_worker * self.semaphore_multiplier
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(key: &'static str, default: T) -> Result<T, TitanError>
where
    T: FromStr,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| TitanError::Config { key, value: raw }),
        Err(_) => Ok(default),
    }
}
