//! End-to-end smoke test for titan-server.
//!
//! Starts the real binary on a free port with a fresh identity store, walks
//! the register → challenge → sign → mint flow over HTTP, and exercises the
//! rejection paths (replay, wrong nonce, forged signature, missing fields).
//!
//! Run with:
//!   cargo test -p titan-server --test smoke

use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use titan_crypto::{sign_nonce, IdentityKeys};

// ── Server lifecycle ──────────────────────────────────────────────────────────

struct ServerGuard {
    child: Child,
    data_dir: PathBuf,
}

impl Drop for ServerGuard {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = std::fs::remove_dir_all(&self.data_dir);
    }
}

/// Find a free TCP port on loopback.
fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Poll until /health answers or the timeout elapses.
async fn wait_for_health(client: &reqwest::Client, base: &str, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Ok(resp) = client.get(format!("{base}/health")).send().await {
            if resp.status().is_success() {
                return true;
            }
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
    false
}

/// Decode a JWT payload without verifying the signature (the signer's public
/// key never leaves the server process).
fn decode_claims(token: &str) -> serde_json::Value {
    let payload = token.split('.').nth(1).expect("jwt payload segment");
    let bytes = URL_SAFE_NO_PAD.decode(payload).expect("payload base64");
    serde_json::from_slice(&bytes).expect("payload json")
}

async fn get_challenge(
    client: &reqwest::Client,
    base: &str,
    identity_id: &str,
) -> (String, String) {
    let resp = client
        .get(format!("{base}/v6/zkp/challenge"))
        .query(&[("identity_id", identity_id)])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["identity_id"].as_str().unwrap(), identity_id);
    (
        body["challenge_id"].as_str().unwrap().to_string(),
        body["nonce"].as_str().unwrap().to_string(),
    )
}

async fn post_mint(
    client: &reqwest::Client,
    base: &str,
    challenge_id: &str,
    identity_id: &str,
    nonce: &str,
    signature: &str,
) -> reqwest::Response {
    client
        .post(format!("{base}/v6/zkp/mint"))
        .json(&serde_json::json!({
            "challenge_id": challenge_id,
            "identity_id": identity_id,
            "nonce": nonce,
            "signature": signature,
        }))
        .send()
        .await
        .unwrap()
}

// ── Smoke test ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn zkp_register_challenge_mint_flow() {
    // ── 1. Start the server on a free port with a fresh store ─────────────────
    let data_dir = std::env::temp_dir().join(format!("titan_e2e_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&data_dir);
    std::fs::create_dir_all(&data_dir).unwrap();

    let port = free_port();
    let base = format!("http://127.0.0.1:{port}");
    let server_bin = env!("CARGO_BIN_EXE_titan-server");
    let child = Command::new(server_bin)
        .args([
            "--host", "127.0.0.1",
            "--port", &port.to_string(),
            "--ca-db", data_dir.join("ca").to_str().unwrap(),
        ])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn titan-server");
    let _guard = ServerGuard { child, data_dir };

    let http = reqwest::Client::new();
    assert!(
        wait_for_health(&http, &base, Duration::from_secs(20)).await,
        "titan-server did not become ready within 20 seconds"
    );

    // ── 2. Register an identity ───────────────────────────────────────────────
    let keys = IdentityKeys::generate().unwrap();
    let resp = http
        .post(format!("{base}/v6/zkp/identity"))
        .json(&serde_json::json!({ "pubkey_pem": keys.public_key_pem }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    assert!(resp.headers().contains_key("x-request-id"));
    assert!(resp.headers().contains_key("x-engine-lat"));
    let body: serde_json::Value = resp.json().await.unwrap();
    let identity_id = body["identity_id"].as_str().unwrap().to_string();
    assert_eq!(body["scope"].as_str().unwrap(), "access_root");
    assert_eq!(body["pubkey_fingerprint"].as_str().unwrap().len(), 64);

    // Re-registering the same key (CRLF variant included) is a 422.
    let crlf = keys.public_key_pem.replace('\n', "\r\n");
    let resp = http
        .post(format!("{base}/v6/zkp/identity"))
        .json(&serde_json::json!({ "pubkey_pem": crlf }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);

    // A garbage PEM is a 422, a missing one too.
    let resp = http
        .post(format!("{base}/v6/zkp/identity"))
        .json(&serde_json::json!({ "pubkey_pem": "not a key" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);
    let resp = http
        .post(format!("{base}/v6/zkp/identity"))
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);

    // ── 3. Happy path: challenge → sign → mint ────────────────────────────────
    let (challenge_id, nonce) = get_challenge(&http, &base, &identity_id).await;
    let signature = sign_nonce(&keys.private_key_pem, &nonce).unwrap();

    let resp = post_mint(&http, &base, &challenge_id, &identity_id, &nonce, &signature).await;
    assert_eq!(resp.status(), 201);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["subject"].as_str().unwrap(), identity_id);
    assert_eq!(body["token_type"].as_str().unwrap(), "Bearer");
    assert_eq!(body["expires_in"].as_u64().unwrap(), 24 * 3600);

    let claims = decode_claims(body["access_token"].as_str().unwrap());
    assert_eq!(claims["sub"].as_str().unwrap(), identity_id);
    assert_eq!(claims["scope"].as_str().unwrap(), "access_root");
    assert_eq!(claims["iss"].as_str().unwrap(), "titan-intra-service-auth-v6");
    assert_eq!(
        claims["exp"].as_i64().unwrap() - claims["iat"].as_i64().unwrap(),
        24 * 3600
    );

    // ── 4. Replay of a consumed challenge is refused ──────────────────────────
    let resp = post_mint(&http, &base, &challenge_id, &identity_id, &nonce, &signature).await;
    assert_eq!(resp.status(), 403);

    // ── 5. A mint must present the exact issued triple ────────────────────────
    let (second_id, _second_nonce) = get_challenge(&http, &base, &identity_id).await;
    let resp = post_mint(&http, &base, &second_id, &identity_id, &nonce, &signature).await;
    assert_eq!(resp.status(), 403, "stale nonce under a fresh challenge id");

    // ── 6. A signature by another identity's key is refused ───────────────────
    let intruder = IdentityKeys::generate().unwrap();
    let (third_id, third_nonce) = get_challenge(&http, &base, &identity_id).await;
    let forged = sign_nonce(&intruder.private_key_pem, &third_nonce).unwrap();
    let resp = post_mint(&http, &base, &third_id, &identity_id, &third_nonce, &forged).await;
    assert_eq!(resp.status(), 403);

    // ── 7. Missing fields and unknown identities ──────────────────────────────
    let resp = http
        .post(format!("{base}/v6/zkp/mint"))
        .json(&serde_json::json!({ "identity_id": identity_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);

    let resp = http
        .get(format!("{base}/v6/zkp/challenge"))
        .query(&[("identity_id", "no-such-identity")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = http
        .get(format!("{base}/v6/zkp/challenge"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);

    // ── 8. Direct mint (trusted caller path) ──────────────────────────────────
    let resp = http
        .post(format!("{base}/v6/auth/mint"))
        .json(&serde_json::json!({ "user": "", "entropy": "ignored" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: serde_json::Value = resp.json().await.unwrap();
    let claims = decode_claims(body["access_token"].as_str().unwrap());
    assert_eq!(claims["sub"].as_str().unwrap(), "guest_user");

    // ── 9. Concurrent burst: ten independent challenges, ten mints ────────────
    let challenges = futures::future::join_all(
        (0..10).map(|_| get_challenge(&http, &base, &identity_id)),
    )
    .await;
    let distinct: std::collections::HashSet<_> =
        challenges.iter().map(|(cid, _)| cid.clone()).collect();
    assert_eq!(distinct.len(), 10, "burst must yield distinct challenge ids");

    let mints = futures::future::join_all(challenges.iter().map(|(cid, nonce)| {
        let sig = sign_nonce(&keys.private_key_pem, nonce).unwrap();
        let http = http.clone();
        let base = base.clone();
        let identity_id = identity_id.clone();
        let cid = cid.clone();
        let nonce = nonce.clone();
        async move { post_mint(&http, &base, &cid, &identity_id, &nonce, &sig).await.status() }
    }))
    .await;
    assert!(mints.iter().all(|s| s.as_u16() == 201), "all burst mints succeed: {mints:?}");

    // ── 10. Telemetry reflects the session ────────────────────────────────────
    let stats: serde_json::Value = http
        .get(format!("{base}/v6/engine/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let traffic = &stats["traffic_telemetry"];
    let total = traffic["total_requests"].as_u64().unwrap();
    assert!(total >= 20);
    let zkp = &stats["zkp_performance"];
    assert_eq!(zkp["zkp_identities_created"].as_u64().unwrap(), 1);
    assert!(zkp["zkp_mints_success"].as_u64().unwrap() >= 11);
    assert!(zkp["zkp_mints_failed"].as_u64().unwrap() >= 4);
    assert_eq!(stats["ca_status"]["ca_identities_total"].as_u64().unwrap(), 1);
    assert_eq!(
        stats["cryptography_performance"]["algorithm"].as_str().unwrap(),
        "ECDSA-ES256"
    );
}
