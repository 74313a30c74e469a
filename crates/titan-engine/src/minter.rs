use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use titan_core::{Settings, Subject, TitanError, TokenClaim};
use titan_crypto::TokenSigner;
use titan_metrics::MetricsStore;

use crate::executor::SigningExecutor;

/// Input for one mint. `user` coerces to the guest subject when empty.
#[derive(Clone, Debug, Default)]
pub struct MintRequest {
    pub user: Option<String>,
    pub scope: Option<String>,
}

/// Output of a successful mint.
#[derive(Clone, Debug)]
pub struct MintResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in_seconds: u64,
    pub engine_version: String,
}

/// Orchestrates one mint: build the claim set, sign it inside an executor
/// slot under the mint timeout, record the outcome.
pub struct TokenMinter {
    signer: Arc<dyn TokenSigner>,
    executor: Arc<SigningExecutor>,
    metrics: Arc<MetricsStore>,
    issuer: String,
    exp_hours: i64,
    engine_version: String,
    slot_timeout: Duration,
}

impl TokenMinter {
    pub fn new(
        signer: Arc<dyn TokenSigner>,
        executor: Arc<SigningExecutor>,
        metrics: Arc<MetricsStore>,
        issuer: impl Into<String>,
        exp_hours: i64,
        engine_version: impl Into<String>,
        slot_timeout: Duration,
    ) -> Self {
        Self {
            signer,
            executor,
            metrics,
            issuer: issuer.into(),
            exp_hours,
            engine_version: engine_version.into(),
            slot_timeout,
        }
    }

    /// Convenience constructor wiring timeouts and claim horizon from config.
    pub fn from_settings(
        signer: Arc<dyn TokenSigner>,
        executor: Arc<SigningExecutor>,
        metrics: Arc<MetricsStore>,
        settings: &Settings,
    ) -> Self {
        Self::new(
            signer,
            executor,
            metrics,
            titan_core::constants::JWT_ISSUER,
            settings.token_exp_hours,
            settings.version.clone(),
            Duration::from_secs(settings.mint_slot_timeout_secs),
        )
    }

    pub async fn execute(&self, request: MintRequest) -> Result<MintResponse, TitanError> {
        let subject = Subject::or_guest(request.user.as_deref());
        let claim = TokenClaim::issue(
            &subject,
            request.scope.as_deref(),
            &self.issuer,
            self.exp_hours,
        );
        let jti = claim.jti.clone();

        let signer = Arc::clone(&self.signer);
        let signed = tokio::time::timeout(
            self.slot_timeout,
            self.executor.run_with_slot(move || signer.sign(&claim)),
        )
        .await;

        let token = match signed {
            Err(_) => {
                self.metrics.record_mint_failure();
                return Err(TitanError::SlotTimeout);
            }
            Ok(Err(e)) => {
                self.metrics.record_mint_failure();
                return Err(e);
            }
            Ok(Ok(token)) => token,
        };

        self.metrics.record_mint(subject.as_str(), &jti);
        debug!(subject = %subject, %jti, "token minted");

        Ok(MintResponse {
            access_token: token,
            token_type: "Bearer",
            expires_in_seconds: (self.exp_hours * 3600) as u64,
            engine_version: self.engine_version.clone(),
        })
    }
}
