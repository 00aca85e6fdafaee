//! OAuth sign-in and token verification.
//!
//! The handshake itself is delegated to the provider; this module exchanges
//! the callback code, upserts the account, issues a JWT and queues the
//! welcome email for first-time users.

pub mod google;
pub mod jwt;

use axum::{
    extract::{Path, Query, Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use diesel::prelude::*;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::directory::users::UserRecord;
use crate::mailer;
use crate::shared::schema::users;
use crate::shared::state::AppState;

use google::GoogleAuth;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("OAuth error: {0}")]
    OAuth(String),
    #[error("Database error: {0}")]
    Database(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            Self::UnknownProvider(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::OAuth(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            Self::Database(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserRecord,
}

// Keeps addresses out of the logs while leaving enough to correlate.
fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let head: String = local.chars().take(2).collect();
            format!("{}***@{}", head, domain)
        }
        None => "***".to_string(),
    }
}

pub async fn begin_auth(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
) -> Result<Redirect, AuthError> {
    if provider != "google" {
        return Err(AuthError::UnknownProvider(provider));
    }

    let flow_state = Uuid::new_v4().to_string();
    let url = GoogleAuth::new(state.config.google.clone()).authorization_url(&flow_state);
    debug!("Redirecting to OAuth provider: {provider}");
    Ok(Redirect::temporary(&url))
}

pub async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<AuthResponse>, AuthError> {
    if provider != "google" {
        return Err(AuthError::UnknownProvider(provider));
    }

    let code = params
        .get("code")
        .cloned()
        .ok_or_else(|| AuthError::OAuth("missing authorization code".to_string()))?;

    let client = GoogleAuth::new(state.config.google.clone());
    let tokens = client
        .exchange_code(&code)
        .await
        .map_err(|e| AuthError::OAuth(e.to_string()))?;
    let profile = client
        .fetch_user(&tokens.access_token)
        .await
        .map_err(|e| AuthError::OAuth(e.to_string()))?;

    debug!(
        "OAuth callback for {} user {}",
        provider,
        mask_email(&profile.email)
    );

    let pool = state.conn.clone();
    let (user, created) = tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|e| AuthError::Database(e.to_string()))?;

        let existing = users::table
            .filter(users::provider_id.eq(&profile.sub))
            .first::<UserRecord>(&mut conn)
            .optional()
            .map_err(|e| AuthError::Database(e.to_string()))?;

        if let Some(user) = existing {
            return Ok::<_, AuthError>((user, false));
        }

        let now = Utc::now();
        let username = if profile.name.is_empty() {
            profile.email.clone()
        } else {
            profile.name.clone()
        };
        let record = UserRecord {
            id: Uuid::new_v4(),
            provider_id: profile.sub.clone(),
            first_name: profile.given_name.clone().unwrap_or_default(),
            last_name: profile.family_name.clone().unwrap_or_default(),
            username,
            email: profile.email.clone(),
            avatar_url: profile.picture.clone(),
            created_at: now,
            updated_at: now,
        };
        diesel::insert_into(users::table)
            .values(&record)
            .execute(&mut conn)
            .map_err(|e| AuthError::Database(e.to_string()))?;

        Ok((record, true))
    })
    .await
    .map_err(|e| AuthError::Database(e.to_string()))??;

    if created {
        info!(
            "Registered user {} ({})",
            user.id,
            mask_email(&user.email)
        );
        let job = mailer::welcome_email(&user.email, &user.username);
        if state.mail_queue.send(job).is_err() {
            warn!("Mail queue is closed; welcome email dropped");
        }
    }

    let token = jwt::issue_token(
        &state.config.jwt.secret,
        user.id,
        &user.email,
        state.config.jwt.expiry_hours,
    )
    .map_err(|e| AuthError::Unauthorized(e.to_string()))?;

    Ok(Json(AuthResponse { token, user }))
}

/// Bearer-token middleware for the protected API surface. Verified claims
/// are stored in request extensions for downstream handlers.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AuthError::Unauthorized("missing authorization header".to_string()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::Unauthorized("expected bearer token".to_string()))?;

    let claims = jwt::verify_token(&state.config.jwt.secret, token)
        .map_err(|e| AuthError::Unauthorized(e.to_string()))?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

pub fn configure_auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/:provider", get(begin_auth))
        .route("/auth/:provider/callback", get(auth_callback))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_masking_keeps_domain() {
        assert_eq!(mask_email("someone@example.com"), "so***@example.com");
        assert_eq!(mask_email("a@b.io"), "a***@b.io");
        assert_eq!(mask_email("not-an-email"), "***");
    }
}
