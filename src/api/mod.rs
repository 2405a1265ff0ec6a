pub mod error;
pub mod health;
pub mod products;

use axum::{Router, http::HeaderMap, routing::get};

use crate::domain::{AuditContext, DomainError};
use crate::infrastructure::AppState;

pub use error::ApiError;

/// Header naming the user a request acts for
pub const ACTOR_HEADER: &str = "x-actor";

pub fn api_router_with_state(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Products
        .route(
            "/products",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/products/:id",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .with_state(state)
}

/// Audit context for a request: the `X-Actor` header, or the configured
/// system actor when the header is absent or blank.
pub fn audit_context(state: &AppState, headers: &HeaderMap) -> Result<AuditContext, DomainError> {
    let actor = headers
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(state.system_actor.as_str());

    AuditContext::system(actor)
}
