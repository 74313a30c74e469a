use std::sync::Arc;

use titan_ca::CaService;
use titan_engine::{ChallengeCache, TokenMinter};
use titan_metrics::{MetricsStore, ZkpMetrics};

/// Handles shared by every request handler.
///
/// All process-wide singletons are constructed once in the composition root
/// and injected here; no handler reaches for ambient state.
#[derive(Clone)]
pub struct AppState {
    pub metrics: Arc<MetricsStore>,
    pub zkp_metrics: Arc<ZkpMetrics>,
    pub ca: Arc<CaService>,
    pub challenges: Arc<ChallengeCache>,
    pub minter: Arc<TokenMinter>,
    /// Wire name of the configured signing algorithm, for the stats payload.
    pub signing_algorithm: &'static str,
}
