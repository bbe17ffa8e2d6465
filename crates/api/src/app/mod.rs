//! HTTP application wiring (axum router + service graph).
//!
//! Layout:
//! - `services.rs`: the store/ledger/sequencer graph shared by all handlers
//! - `routes/`: HTTP routes and handlers, one file per domain area
//! - `dto.rs`: request DTOs and JSON mapping helpers
//! - `errors.rs`: the failure envelope and error-to-status mapping

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use farmlink_infra::MarketStore;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router over the given store.
///
/// The store is picked by the caller: `main` reads `DATABASE_URL`, the test
/// harness passes an in-memory one.
pub fn build_app(jwt_secret: String, store: Arc<dyn MarketStore>) -> Router {
    let jwt = Arc::new(farmlink_auth::Hs256JwtValidator::new(
        jwt_secret.into_bytes(),
    ));
    let auth_state = middleware::AuthState { jwt };

    let services = Arc::new(services::AppServices::new(store));

    // Protected routes: everything except the health probe.
    let protected = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new())
}
