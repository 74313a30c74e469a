use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_SCOPE;
use crate::types::{Jti, Subject};

/// Claim set for a single minted token.
///
/// Serialises directly to the JWT payload; `iat` and `exp` are seconds since
/// epoch (RFC 7519 NumericDate).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct TokenClaim {
    pub iss: String,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub scope: String,
}

impl TokenClaim {
    /// Build the claim set for one mint: fresh `jti`, `iat` = now,
    /// `exp` = `iat` + `exp_hours`.
    pub fn issue(subject: &Subject, scope: Option<&str>, issuer: &str, exp_hours: i64) -> Self {
        let iat = Utc::now().timestamp();
        Self {
            iss: issuer.to_string(),
            sub: subject.as_str().to_string(),
            iat,
            exp: iat + exp_hours * 3600,
            jti: Jti::generate().to_string(),
            scope: scope
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(DEFAULT_SCOPE)
                .to_string(),
        }
    }
}
