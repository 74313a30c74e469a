use thiserror::Error;

#[derive(Debug, Error)]
pub enum TitanError {
    // ── Request validation ───────────────────────────────────────────────────
    #[error("{0} is required")]
    MissingField(&'static str),

    // ── CA / registration ────────────────────────────────────────────────────
    #[error("invalid public key: {0}")]
    InvalidKey(String),

    #[error("public key already registered (fingerprint: {0}…)")]
    DuplicateKey(String),

    #[error("identity not authorized or unknown")]
    NotAuthorized,

    // ── Challenge / mint ─────────────────────────────────────────────────────
    #[error("challenge invalid or expired")]
    ChallengeMismatch,

    #[error("invalid signature")]
    SignatureRejected,

    #[error("Mint slot timeout")]
    SlotTimeout,

    #[error("signing failed: {0}")]
    Signing(String),

    // ── Configuration ────────────────────────────────────────────────────────
    #[error("invalid configuration value for {key}: {value}")]
    Config { key: &'static str, value: String },

    // ── Serialization / storage ──────────────────────────────────────────────
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),

    // ── General ──────────────────────────────────────────────────────────────
    #[error("{0}")]
    Internal(String),
}
