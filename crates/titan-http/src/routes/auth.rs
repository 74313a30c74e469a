use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use titan_engine::MintRequest;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize, Default)]
pub struct MintBody {
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    /// Accepted for wire compatibility; not folded into the token.
    #[serde(default)]
    #[allow(dead_code)]
    entropy: Option<String>,
}

/// POST /v6/auth/mint — direct mint for trusted callers, no proof required.
/// Every failure surfaces as 422 with a `Minting Failure` detail.
pub async fn mint_token(
    State(state): State<AppState>,
    body: Option<Json<MintBody>>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let response = state
        .minter
        .execute(MintRequest {
            user: body.user,
            scope: body.scope,
        })
        .await
        .map_err(|e| ApiError::unprocessable(format!("Minting Failure: {e}")))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "access_token": response.access_token,
            "token_type": response.token_type,
            "expires_in": response.expires_in_seconds,
            "engine": response.engine_version,
        })),
    ))
}
