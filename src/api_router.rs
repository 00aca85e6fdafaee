//! API Router
//!
//! Combines the per-module routers into the full REST surface. Everything
//! except the sign-in flow sits behind the bearer-token middleware.

use axum::{middleware, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth;
use crate::shared::state::AppState;

pub fn configure_api_routes(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .merge(crate::okr::configure_okr_routes())
        .merge(crate::membership::configure_membership_routes())
        .merge(crate::company::configure_company_routes())
        .merge(crate::directory::configure_directory_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    let api = Router::new()
        .merge(auth::configure_auth_routes())
        .merge(protected);

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
