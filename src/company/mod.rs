//! Companies and their teams.

pub mod teams;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::membership::{MembershipRecord, MembershipRole, MembershipStatus};
use crate::shared::schema::{companies, memberships};
use crate::shared::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum CompanyError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Database error: {0}")]
    Database(String),
}

impl From<diesel::result::Error> for CompanyError {
    fn from(err: diesel::result::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl IntoResponse for CompanyError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Database(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = companies)]
pub struct CompanyRecord {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub creator_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCompanyRequest {
    pub name: String,
    pub creator_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCompanyRequest {
    pub name: Option<String>,
}

/// Short human-readable company code: first three characters of the name
/// joined with the last three of the creator id, upper-cased. Inputs too
/// short to slice produce an empty code.
pub fn generate_company_code(name: &str, creator_id: &str) -> String {
    let name_chars: Vec<char> = name.chars().collect();
    let id_chars: Vec<char> = creator_id.chars().collect();
    if name_chars.len() < 3 || id_chars.len() < 3 {
        return String::new();
    }

    let head: String = name_chars[..3].iter().collect();
    let tail: String = id_chars[id_chars.len() - 3..].iter().collect();
    format!("{}{}", head.to_uppercase(), tail.to_uppercase())
}

/// Creates a company and, in the same transaction, an active admin
/// membership for its creator. A company is never without an admin from the
/// moment it exists.
pub async fn create_company(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCompanyRequest>,
) -> Result<Json<CompanyRecord>, CompanyError> {
    if req.name.trim().is_empty() {
        return Err(CompanyError::Validation("company name is required".to_string()));
    }

    let pool = state.conn.clone();
    let now = Utc::now();

    let company = CompanyRecord {
        id: Uuid::new_v4(),
        name: req.name.clone(),
        code: generate_company_code(&req.name, &req.creator_id.to_string()),
        creator_id: req.creator_id,
        created_at: now,
        updated_at: now,
    };

    let inserted = company.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|e| CompanyError::Database(e.to_string()))?;

        conn.transaction::<_, CompanyError, _>(|conn| {
            diesel::insert_into(companies::table)
                .values(&company)
                .execute(conn)
                .map_err(|e| CompanyError::Database(e.to_string()))?;

            let membership = MembershipRecord {
                id: Uuid::new_v4(),
                user_id: company.creator_id,
                company_id: company.id,
                role: MembershipRole::Admin.to_str().to_string(),
                status: MembershipStatus::Active.to_str().to_string(),
                created_at: now,
                updated_at: now,
            };
            diesel::insert_into(memberships::table)
                .values(&membership)
                .execute(conn)
                .map_err(|e| CompanyError::Database(e.to_string()))?;

            Ok(())
        })
    })
    .await
    .map_err(|e| CompanyError::Database(e.to_string()))??;

    info!(
        "Created company: {} ({}) code={} creator={}",
        inserted.name, inserted.id, inserted.code, inserted.creator_id
    );
    Ok(Json(inserted))
}

pub async fn get_company(
    State(state): State<Arc<AppState>>,
    Path(company_id): Path<Uuid>,
) -> Result<Json<CompanyRecord>, CompanyError> {
    let pool = state.conn.clone();

    let result = tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|e| CompanyError::Database(e.to_string()))?;
        companies::table
            .find(company_id)
            .first::<CompanyRecord>(&mut conn)
            .optional()
            .map_err(|e| CompanyError::Database(e.to_string()))
    })
    .await
    .map_err(|e| CompanyError::Database(e.to_string()))??;

    result
        .ok_or_else(|| CompanyError::NotFound("Company not found".to_string()))
        .map(Json)
}

pub async fn update_company(
    State(state): State<Arc<AppState>>,
    Path(company_id): Path<Uuid>,
    Json(req): Json<UpdateCompanyRequest>,
) -> Result<Json<CompanyRecord>, CompanyError> {
    let pool = state.conn.clone();

    let result = tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|e| CompanyError::Database(e.to_string()))?;

        let mut company = companies::table
            .find(company_id)
            .first::<CompanyRecord>(&mut conn)
            .optional()
            .map_err(|e| CompanyError::Database(e.to_string()))?
            .ok_or_else(|| CompanyError::NotFound("Company not found".to_string()))?;

        if let Some(name) = req.name {
            company.name = name;
        }
        company.updated_at = Utc::now();

        diesel::update(companies::table.find(company_id))
            .set(&company)
            .execute(&mut conn)
            .map_err(|e| CompanyError::Database(e.to_string()))?;

        Ok::<_, CompanyError>(company)
    })
    .await
    .map_err(|e| CompanyError::Database(e.to_string()))??;

    info!("Updated company: {} ({})", result.name, result.id);
    Ok(Json(result))
}

pub async fn delete_company(
    State(state): State<Arc<AppState>>,
    Path(company_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, CompanyError> {
    let pool = state.conn.clone();

    tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|e| CompanyError::Database(e.to_string()))?;
        let deleted = diesel::delete(companies::table.find(company_id))
            .execute(&mut conn)
            .map_err(|e| CompanyError::Database(e.to_string()))?;

        if deleted > 0 {
            info!("Deleted company: {company_id}");
            Ok::<_, CompanyError>(())
        } else {
            Err(CompanyError::NotFound("Company not found".to_string()))
        }
    })
    .await
    .map_err(|e| CompanyError::Database(e.to_string()))??;

    Ok(Json(serde_json::json!({ "success": true })))
}

pub fn configure_company_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/companies", post(create_company))
        .route(
            "/companies/:id",
            get(get_company).put(update_company).delete(delete_company),
        )
        .route("/teams", post(teams::create_team))
        .route(
            "/teams/:id",
            get(teams::get_team)
                .put(teams::update_team)
                .delete(teams::delete_team),
        )
        .route(
            "/teams/:id/members",
            get(teams::list_team_members).post(teams::add_team_member),
        )
        .route(
            "/teams/members/:member_id",
            axum::routing::delete(teams::remove_team_member),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn company_code_combines_name_and_creator() {
        let code = generate_company_code("Acme Rockets", "user-4f2a9c");
        assert_eq!(code, "ACMA9C");
        assert_eq!(code.len(), 6);
    }

    #[test]
    fn company_code_is_empty_for_short_inputs() {
        assert_eq!(generate_company_code("ab", "user-4f2a9c"), "");
        assert_eq!(generate_company_code("Acme", "ab"), "");
    }
}
