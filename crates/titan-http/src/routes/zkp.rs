use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use titan_core::{ChallengeId, IdentityId, TitanError};
use titan_engine::MintRequest;

use crate::error::ApiError;
use crate::state::AppState;

// ── POST /v6/zkp/identity ────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
pub struct IdentityBody {
    #[serde(default)]
    pubkey_pem: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

/// Register a locally generated public key; the caller gets back an opaque
/// identity id. The service never learns who is behind the key.
pub async fn create_identity(
    State(state): State<AppState>,
    body: Option<Json<IdentityBody>>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let pubkey_pem = body
        .pubkey_pem
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .ok_or(TitanError::MissingField("pubkey_pem"))?;

    let (identity_id, fingerprint) = state
        .ca
        .register_identity(pubkey_pem, body.scope.as_deref())?;
    state.zkp_metrics.record_identity_created(&identity_id);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "identity_id": identity_id,
            "pubkey_fingerprint": fingerprint,
            "scope": body.scope.as_deref().unwrap_or(titan_core::constants::DEFAULT_SCOPE),
            "message": "Store identity_id and both key PEMs client-side; the private key never leaves the client.",
        })),
    ))
}

// ── GET /v6/zkp/challenge ────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
pub struct ChallengeQuery {
    #[serde(default)]
    identity_id: Option<String>,
}

/// Issue a one-shot nonce for the identity to sign. Any number of challenges
/// may be outstanding per identity.
pub async fn get_challenge(
    State(state): State<AppState>,
    Query(query): Query<ChallengeQuery>,
) -> Result<Json<Value>, ApiError> {
    let identity_id = query
        .identity_id
        .filter(|p| !p.trim().is_empty())
        .ok_or(TitanError::MissingField("identity_id"))?;
    let identity_id = IdentityId::new(identity_id);

    if !state.ca.is_authorized(&identity_id)? {
        return Err(TitanError::NotAuthorized.into());
    }

    let (challenge_id, nonce) = state.challenges.issue(identity_id.clone());
    state.zkp_metrics.record_challenge_issued();

    Ok(Json(json!({
        "challenge_id": challenge_id,
        "nonce": nonce,
        "identity_id": identity_id,
    })))
}

// ── POST /v6/zkp/mint ────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
pub struct ZkpMintBody {
    #[serde(default)]
    challenge_id: Option<String>,
    #[serde(default)]
    identity_id: Option<String>,
    #[serde(default)]
    nonce: Option<String>,
    #[serde(default)]
    signature: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

/// Consume a challenge, verify the proof of possession, mint. The token's
/// subject is the opaque identity id; nothing else in the request can
/// influence it.
pub async fn mint_token_zkp(
    State(state): State<AppState>,
    body: Option<Json<ZkpMintBody>>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();

    let (Some(challenge_id), Some(identity_id), Some(nonce), Some(signature)) = (
        body.challenge_id.as_deref(),
        body.identity_id.as_deref(),
        body.nonce.as_deref(),
        body.signature.as_deref(),
    ) else {
        state.metrics.record_mint_failure();
        state.zkp_metrics.record_mint_failed();
        return Err(ApiError::unprocessable(
            "challenge_id, identity_id, nonce and signature are required",
        ));
    };
    let challenge_id = ChallengeId::new(challenge_id);
    let identity_id = IdentityId::new(identity_id);

    // One-shot: the lookup removes the entry, so a replay of the same
    // challenge_id can never match again.
    let stored = state.challenges.consume(&challenge_id);
    let matches = stored
        .as_ref()
        .map(|c| c.identity_id == identity_id && c.nonce == nonce)
        .unwrap_or(false);
    if !matches {
        state.metrics.record_mint_failure();
        state.zkp_metrics.record_mint_failed();
        return Err(TitanError::ChallengeMismatch.into());
    }

    if !state.ca.verify_signature(&identity_id, nonce, signature) {
        state.metrics.record_mint_failure();
        state.zkp_metrics.record_mint_failed();
        return Err(TitanError::SignatureRejected.into());
    }

    let response = state
        .minter
        .execute(MintRequest {
            user: Some(identity_id.as_str().to_string()),
            scope: body.scope.clone(),
        })
        .await
        .map_err(|e| {
            state.zkp_metrics.record_mint_failed();
            ApiError::from(e)
        })?;
    state.zkp_metrics.record_mint_success();

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "access_token": response.access_token,
            "token_type": response.token_type,
            "expires_in": response.expires_in_seconds,
            "engine": response.engine_version,
            "subject": identity_id,
        })),
    ))
}
