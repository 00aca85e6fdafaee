//! Company memberships: roles, statuses, and the last-admin protection.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::schema::memberships;
use crate::shared::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipRole {
    Admin,
    Member,
    Viewer,
}

impl MembershipRole {
    pub fn from_str(s: &str) -> Self {
        match s {
            "admin" => Self::Admin,
            "viewer" => Self::Viewer,
            _ => Self::Member,
        }
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
            Self::Viewer => "viewer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    Active,
    Inactive,
    Suspended,
}

impl MembershipStatus {
    pub fn from_str(s: &str) -> Self {
        match s {
            "inactive" => Self::Inactive,
            "suspended" => Self::Suspended,
            _ => Self::Active,
        }
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Suspended => "suspended",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = memberships)]
pub struct MembershipRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub role: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub role: MembershipRole,
    pub status: MembershipStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn record_to_membership(record: MembershipRecord) -> Membership {
    Membership {
        id: record.id,
        user_id: record.user_id,
        company_id: record.company_id,
        role: MembershipRole::from_str(&record.role),
        status: MembershipStatus::from_str(&record.status),
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MembershipError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("cannot delete the last admin of the company")]
    LastAdmin,
    #[error("Database error: {0}")]
    Database(String),
}

impl From<diesel::result::Error> for MembershipError {
    fn from(err: diesel::result::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl IntoResponse for MembershipError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::LastAdmin => (StatusCode::CONFLICT, self.to_string()),
            Self::Database(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Checks whether a membership may be deleted without leaving its company
/// adminless. Non-admin memberships always pass. An admin membership passes
/// only when at least one other membership of the same company is an active
/// admin. Pure check; the deletion handler re-runs it inside the delete
/// transaction.
pub fn ensure_can_delete(
    target: &Membership,
    company_memberships: &[Membership],
) -> Result<(), MembershipError> {
    if target.role != MembershipRole::Admin {
        return Ok(());
    }

    let remaining_admins = company_memberships
        .iter()
        .filter(|m| {
            m.id != target.id
                && m.company_id == target.company_id
                && m.role == MembershipRole::Admin
                && m.status == MembershipStatus::Active
        })
        .count();

    if remaining_admins == 0 {
        return Err(MembershipError::LastAdmin);
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMembershipRequest {
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub role: MembershipRole,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateMembershipRequest {
    pub role: Option<MembershipRole>,
    pub status: Option<MembershipStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: MembershipRole,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: MembershipStatus,
}

pub async fn create_membership(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateMembershipRequest>,
) -> Result<Json<Membership>, MembershipError> {
    let pool = state.conn.clone();
    let now = Utc::now();

    let record = MembershipRecord {
        id: Uuid::new_v4(),
        user_id: req.user_id,
        company_id: req.company_id,
        role: req.role.to_str().to_string(),
        status: MembershipStatus::Active.to_str().to_string(),
        created_at: now,
        updated_at: now,
    };

    let inserted = record.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|e| MembershipError::Database(e.to_string()))?;
        diesel::insert_into(memberships::table)
            .values(&record)
            .execute(&mut conn)
            .map_err(|e| MembershipError::Database(e.to_string()))?;
        Ok::<_, MembershipError>(())
    })
    .await
    .map_err(|e| MembershipError::Database(e.to_string()))??;

    info!(
        "Created membership: {} user={} company={} role={}",
        inserted.id, inserted.user_id, inserted.company_id, inserted.role
    );
    Ok(Json(record_to_membership(inserted)))
}

pub async fn get_membership(
    State(state): State<Arc<AppState>>,
    Path(membership_id): Path<Uuid>,
) -> Result<Json<Membership>, MembershipError> {
    let pool = state.conn.clone();

    let result = tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|e| MembershipError::Database(e.to_string()))?;
        memberships::table
            .find(membership_id)
            .first::<MembershipRecord>(&mut conn)
            .optional()
            .map_err(|e| MembershipError::Database(e.to_string()))
    })
    .await
    .map_err(|e| MembershipError::Database(e.to_string()))??;

    result
        .map(record_to_membership)
        .ok_or_else(|| MembershipError::NotFound("Membership not found".to_string()))
        .map(Json)
}

pub async fn list_company_members(
    State(state): State<Arc<AppState>>,
    Path(company_id): Path<Uuid>,
) -> Result<Json<Vec<Membership>>, MembershipError> {
    let pool = state.conn.clone();

    let result = tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|e| MembershipError::Database(e.to_string()))?;
        memberships::table
            .filter(memberships::company_id.eq(company_id))
            .order(memberships::created_at.asc())
            .load::<MembershipRecord>(&mut conn)
            .map_err(|e| MembershipError::Database(e.to_string()))
    })
    .await
    .map_err(|e| MembershipError::Database(e.to_string()))??;

    Ok(Json(result.into_iter().map(record_to_membership).collect()))
}

pub async fn update_membership(
    State(state): State<Arc<AppState>>,
    Path(membership_id): Path<Uuid>,
    Json(req): Json<UpdateMembershipRequest>,
) -> Result<Json<Membership>, MembershipError> {
    let pool = state.conn.clone();

    let result = tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|e| MembershipError::Database(e.to_string()))?;

        let mut membership = memberships::table
            .find(membership_id)
            .first::<MembershipRecord>(&mut conn)
            .optional()
            .map_err(|e| MembershipError::Database(e.to_string()))?
            .ok_or_else(|| MembershipError::NotFound("Membership not found".to_string()))?;

        // Role downgrades are not gated by the last-admin check here; only
        // deletion is. Promote-before-demote is up to the caller.
        if let Some(role) = req.role {
            membership.role = role.to_str().to_string();
        }
        if let Some(status) = req.status {
            membership.status = status.to_str().to_string();
        }
        membership.updated_at = Utc::now();

        diesel::update(memberships::table.find(membership_id))
            .set(&membership)
            .execute(&mut conn)
            .map_err(|e| MembershipError::Database(e.to_string()))?;

        Ok::<_, MembershipError>(membership)
    })
    .await
    .map_err(|e| MembershipError::Database(e.to_string()))??;

    info!(
        "Updated membership: {} role={} status={}",
        result.id, result.role, result.status
    );
    Ok(Json(record_to_membership(result)))
}

pub async fn update_membership_role(
    State(state): State<Arc<AppState>>,
    Path(membership_id): Path<Uuid>,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<Json<Membership>, MembershipError> {
    let patch = UpdateMembershipRequest {
        role: Some(req.role),
        status: None,
    };
    update_membership(State(state), Path(membership_id), Json(patch)).await
}

pub async fn update_membership_status(
    State(state): State<Arc<AppState>>,
    Path(membership_id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Membership>, MembershipError> {
    let patch = UpdateMembershipRequest {
        role: None,
        status: Some(req.status),
    };
    update_membership(State(state), Path(membership_id), Json(patch)).await
}

/// Deletes a membership. The last-admin check and the delete run inside one
/// transaction so two concurrent deletions of a company's final two admins
/// cannot both slip through the check.
pub async fn delete_membership(
    State(state): State<Arc<AppState>>,
    Path(membership_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, MembershipError> {
    let pool = state.conn.clone();

    tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|e| MembershipError::Database(e.to_string()))?;

        conn.transaction::<_, MembershipError, _>(|conn| {
            let target = memberships::table
                .find(membership_id)
                .first::<MembershipRecord>(conn)
                .optional()
                .map_err(|e| MembershipError::Database(e.to_string()))?
                .ok_or_else(|| {
                    MembershipError::NotFound("Membership not found".to_string())
                })?;

            let company_rows = memberships::table
                .filter(memberships::company_id.eq(target.company_id))
                .load::<MembershipRecord>(conn)
                .map_err(|e| MembershipError::Database(e.to_string()))?;

            let target = record_to_membership(target);
            let company_memberships: Vec<Membership> =
                company_rows.into_iter().map(record_to_membership).collect();

            if let Err(err) = ensure_can_delete(&target, &company_memberships) {
                warn!(
                    "Membership deletion denied: {} company={} ({})",
                    target.id, target.company_id, err
                );
                return Err(err);
            }

            diesel::delete(memberships::table.find(membership_id))
                .execute(conn)
                .map_err(|e| MembershipError::Database(e.to_string()))?;

            Ok(())
        })
    })
    .await
    .map_err(|e| MembershipError::Database(e.to_string()))??;

    info!("Deleted membership: {membership_id}");
    Ok(Json(serde_json::json!({ "success": true })))
}

pub fn configure_membership_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/memberships", post(create_membership))
        .route(
            "/memberships/:id",
            get(get_membership)
                .put(update_membership)
                .delete(delete_membership),
        )
        .route("/memberships/:id/role", put(update_membership_role))
        .route("/memberships/:id/status", put(update_membership_status))
        .route(
            "/memberships/company/:company_id",
            get(list_company_members),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn membership(
        company_id: Uuid,
        role: MembershipRole,
        status: MembershipStatus,
    ) -> Membership {
        let now = Utc::now();
        Membership {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            company_id,
            role,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn deleting_the_only_active_admin_is_denied() {
        let company = Uuid::new_v4();
        let admin = membership(company, MembershipRole::Admin, MembershipStatus::Active);
        let others = vec![
            admin.clone(),
            membership(company, MembershipRole::Member, MembershipStatus::Active),
            membership(company, MembershipRole::Viewer, MembershipStatus::Active),
        ];

        let denied = ensure_can_delete(&admin, &others);
        assert!(matches!(denied, Err(MembershipError::LastAdmin)));
    }

    #[test]
    fn deleting_one_of_two_active_admins_is_allowed() {
        let company = Uuid::new_v4();
        let first = membership(company, MembershipRole::Admin, MembershipStatus::Active);
        let second = membership(company, MembershipRole::Admin, MembershipStatus::Active);
        let all = vec![first.clone(), second];

        assert!(ensure_can_delete(&first, &all).is_ok());
    }

    #[test]
    fn non_admin_deletion_skips_the_admin_count() {
        let company = Uuid::new_v4();
        let admin = membership(company, MembershipRole::Admin, MembershipStatus::Active);
        let member = membership(company, MembershipRole::Member, MembershipStatus::Active);
        let all = vec![admin, member.clone()];

        assert!(ensure_can_delete(&member, &all).is_ok());
    }

    #[test]
    fn inactive_admins_do_not_count_as_cover() {
        let company = Uuid::new_v4();
        let active = membership(company, MembershipRole::Admin, MembershipStatus::Active);
        let suspended =
            membership(company, MembershipRole::Admin, MembershipStatus::Suspended);
        let inactive =
            membership(company, MembershipRole::Admin, MembershipStatus::Inactive);
        let all = vec![active.clone(), suspended, inactive];

        let denied = ensure_can_delete(&active, &all);
        assert!(matches!(denied, Err(MembershipError::LastAdmin)));
    }

    #[test]
    fn admins_of_other_companies_do_not_count() {
        let company = Uuid::new_v4();
        let target = membership(company, MembershipRole::Admin, MembershipStatus::Active);
        let elsewhere = membership(
            Uuid::new_v4(),
            MembershipRole::Admin,
            MembershipStatus::Active,
        );
        let all = vec![target.clone(), elsewhere];

        let denied = ensure_can_delete(&target, &all);
        assert!(matches!(denied, Err(MembershipError::LastAdmin)));
    }

    #[test]
    fn role_strings_round_trip() {
        assert_eq!(MembershipRole::from_str("admin"), MembershipRole::Admin);
        assert_eq!(MembershipRole::Admin.to_str(), "admin");
        assert_eq!(
            MembershipStatus::from_str("suspended"),
            MembershipStatus::Suspended
        );
        assert_eq!(MembershipStatus::Suspended.to_str(), "suspended");
    }
}
