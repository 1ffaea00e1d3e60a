//! API routes.

pub mod health;
pub mod mock;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use crate::state::AppState;

/// Creates the API router: the `/ping`/`/` health probe plus the
/// regression replay mock endpoints.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(health::ping))
        .route("/", get(health::root))
        .route("/ccr_base", post(mock::ccr_base))
        .route("/proctor_base", post(mock::proctor_base))
        .route("/proctor_cm", post(mock::proctor_base))
        .route("/pinning_base", post(mock::pinning_base))
        .route("/clarity_base", post(mock::clarity_base))
        .route("/clarity_cm", post(mock::clarity_base))
        .route("/atb_base", post(mock::atb_base))
        .route("/sagemaker", post(mock::sagemaker))
        .route("/crosscore_token_base", post(mock::noop))
        .route("/crosscore_base", post(mock::noop))
        .route("/criteria_base", post(mock::noop))
        .route("/decision_base", post(mock::noop))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
