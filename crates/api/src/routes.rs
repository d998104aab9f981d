//! Route definitions.

use crate::auth::api_key_middleware;
use crate::handlers;
use crate::middleware::request_id;
use crate::rate_limit::rate_limit_middleware;
use crate::state::AppState;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post},
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Prefix of every API route.
pub const API_PREFIX: &str = "/api/v1";

/// Builds the application router.
///
/// `cors_origin` restricts cross-origin requests to one origin; `None` allows any.
pub fn create_router(state: AppState, cors_origin: Option<&str>) -> Router {
    let protected = Router::new()
        .route("/pools", get(handlers::list_pools))
        .route("/pools/{id}", get(handlers::get_pool))
        .route("/positions/{address}", get(handlers::get_positions))
        .route("/liquidity/add", post(handlers::add_liquidity))
        .route("/liquidity/remove", post(handlers::remove_liquidity))
        .route("/cache/pools/{id}", delete(handlers::invalidate_pool_cache))
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            api_key_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.rate_limit.clone(),
            rate_limit_middleware,
        ));

    let api = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected);

    Router::new()
        .nest(API_PREFIX, api)
        .layer(cors_layer(cors_origin))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id))
        .with_state(state)
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let allow_origin = match origin.and_then(|o| HeaderValue::from_str(o).ok()) {
        Some(value) => AllowOrigin::exact(value),
        None => AllowOrigin::from(Any),
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::HeaderName::from_static("x-api-key"),
        ])
}
