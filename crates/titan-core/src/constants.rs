/// Human-facing engine name, reported by `/health` and `/v6/engine/stats`.
pub const ENGINE_NAME: &str = "Titan Intra Service Auth Engine";

/// `iss` claim stamped into every minted token.
pub const JWT_ISSUER: &str = "titan-intra-service-auth-v6";

/// Scope granted when the request does not name one.
pub const DEFAULT_SCOPE: &str = "access_root";

/// Subject used when the mint request carries no usable user.
pub const GUEST_USER: &str = "guest_user";

/// Upper bound on in-flight challenges per process. Crossing it evicts the
/// oldest half in insertion order — a memory safety valve, not a TTL.
pub const MAX_CHALLENGES: usize = 50_000;

/// Mints buffered before a flush into the main metrics block.
pub const MINT_FLUSH_THRESHOLD: u64 = 5;

/// Executor slots = threads_per_worker × this multiplier.
pub const SEMAPHORE_MULTIPLIER: usize = 2;

/// Cooperative cap on end-to-end mint latency (slot wait + signing).
pub const MINT_SLOT_TIMEOUT_SECS: u64 = 30;

/// Active connections above which the advisory circuit breaker reports
/// UNDER_LOAD. No request is rejected on this signal.
pub const CIRCUIT_UNDER_LOAD_THRESHOLD: i64 = 18_000;

/// Active connections below which the breaker resets to CLOSED on the next
/// recorded request.
pub const CIRCUIT_CLOSED_THRESHOLD: i64 = 5_000;

/// Nonce entropy in bytes, before URL-safe base64 encoding.
pub const NONCE_BYTES: usize = 32;
