use axum::{routing::get, Router};

pub mod alerts;
pub mod orders;
pub mod products;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/products", products::router())
        .nest("/orders", orders::router())
        .nest("/alerts", alerts::router())
}
