//! Objectives and key results: records, progress engine, HTTP handlers.

pub mod key_results;
pub mod objectives;
pub mod progress;

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use std::sync::Arc;

use crate::shared::state::AppState;
use progress::MetricValueError;

#[derive(Debug, thiserror::Error)]
pub enum OkrError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Database error: {0}")]
    Database(String),
}

impl From<MetricValueError> for OkrError {
    fn from(err: MetricValueError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl IntoResponse for OkrError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Database(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub fn configure_okr_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/okr/objectives",
            post(objectives::create_objective),
        )
        .route(
            "/okr/objectives/:id",
            get(objectives::get_objective)
                .put(objectives::update_objective)
                .delete(objectives::delete_objective),
        )
        .route(
            "/okr/objectives/:id/full",
            get(objectives::get_objective_with_key_results),
        )
        .route(
            "/okr/objectives/:id/progress",
            put(objectives::update_objective_progress),
        )
        .route(
            "/okr/objectives/:id/key-results",
            get(key_results::list_key_results).post(key_results::create_key_result),
        )
        .route(
            "/okr/objectives/company/:company_id",
            get(objectives::list_objectives_by_company),
        )
        .route(
            "/okr/objectives/team/:team_id",
            get(objectives::list_objectives_by_team),
        )
        .route(
            "/okr/objectives/owner/:owner_id",
            get(objectives::list_objectives_by_owner),
        )
        .route(
            "/okr/key-results/:id",
            get(key_results::get_key_result)
                .put(key_results::update_key_result)
                .delete(key_results::delete_key_result),
        )
}
