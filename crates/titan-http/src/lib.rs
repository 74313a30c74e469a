pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

pub use state::AppState;

/// Build the service router: the four auth/ZKP endpoints plus health and
/// stats, wrapped in telemetry and permissive CORS.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/v6/auth/mint", post(routes::auth::mint_token))
        .route("/v6/zkp/identity", post(routes::zkp::create_identity))
        .route("/v6/zkp/challenge", get(routes::zkp::get_challenge))
        .route("/v6/zkp/mint", post(routes::zkp::mint_token_zkp))
        .route("/health", get(routes::health::health))
        .route("/v6/engine/stats", get(routes::stats::engine_stats))
        .layer(cors)
        // Added last so telemetry is outermost: every request is gauged and
        // sampled, CORS preflights included.
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::telemetry,
        ))
        .with_state(state)
}
