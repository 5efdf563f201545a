mod env;
mod global_state;
mod metrics;
mod middleware;
mod response;
mod routes;
mod utils;

use std::time::Duration;

use axum::Router;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

pub use routes::{image_routes, listing_routes, misc_routes, payment_routes};

pub use env::ApiServerEnv;
pub use global_state::GlobalState;
pub use utils::setup_tracing;
pub use middleware::{authenticate, SessionClaims, SESSION_TTL_SECS};
pub use response::{expose_internal_errors, AppError, AppSuccess, GenericResponse};

/// The full HTTP surface with CORS, request tracing and a per-request timeout.
pub fn app_router(state: GlobalState, request_timeout: Duration) -> Router {
    Router::new()
        .merge(misc_routes())
        .merge(listing_routes(state.clone()))
        .merge(payment_routes(state.clone()))
        .merge(image_routes())
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}
