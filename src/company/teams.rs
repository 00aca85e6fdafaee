use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::schema::{team_members, teams};
use crate::shared::state::AppState;

use super::CompanyError;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = teams)]
pub struct TeamRecord {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = team_members)]
pub struct TeamMemberRecord {
    pub id: Uuid,
    pub team_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTeamRequest {
    pub company_id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTeamRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddTeamMemberRequest {
    pub user_id: Uuid,
}

pub async fn create_team(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTeamRequest>,
) -> Result<Json<TeamRecord>, CompanyError> {
    if req.name.trim().is_empty() {
        return Err(CompanyError::Validation("team name is required".to_string()));
    }

    let pool = state.conn.clone();
    let now = Utc::now();

    let record = TeamRecord {
        id: Uuid::new_v4(),
        company_id: req.company_id,
        name: req.name,
        description: req.description,
        created_at: now,
        updated_at: now,
    };

    let inserted = record.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|e| CompanyError::Database(e.to_string()))?;
        diesel::insert_into(teams::table)
            .values(&record)
            .execute(&mut conn)
            .map_err(|e| CompanyError::Database(e.to_string()))?;
        Ok::<_, CompanyError>(())
    })
    .await
    .map_err(|e| CompanyError::Database(e.to_string()))??;

    info!(
        "Created team: {} ({}) company={}",
        inserted.name, inserted.id, inserted.company_id
    );
    Ok(Json(inserted))
}

pub async fn get_team(
    State(state): State<Arc<AppState>>,
    Path(team_id): Path<Uuid>,
) -> Result<Json<TeamRecord>, CompanyError> {
    let pool = state.conn.clone();

    let result = tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|e| CompanyError::Database(e.to_string()))?;
        teams::table
            .find(team_id)
            .first::<TeamRecord>(&mut conn)
            .optional()
            .map_err(|e| CompanyError::Database(e.to_string()))
    })
    .await
    .map_err(|e| CompanyError::Database(e.to_string()))??;

    result
        .ok_or_else(|| CompanyError::NotFound("Team not found".to_string()))
        .map(Json)
}

pub async fn update_team(
    State(state): State<Arc<AppState>>,
    Path(team_id): Path<Uuid>,
    Json(req): Json<UpdateTeamRequest>,
) -> Result<Json<TeamRecord>, CompanyError> {
    let pool = state.conn.clone();

    let result = tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|e| CompanyError::Database(e.to_string()))?;

        let mut team = teams::table
            .find(team_id)
            .first::<TeamRecord>(&mut conn)
            .optional()
            .map_err(|e| CompanyError::Database(e.to_string()))?
            .ok_or_else(|| CompanyError::NotFound("Team not found".to_string()))?;

        if let Some(name) = req.name {
            team.name = name;
        }
        if let Some(description) = req.description {
            team.description = Some(description);
        }
        team.updated_at = Utc::now();

        diesel::update(teams::table.find(team_id))
            .set(&team)
            .execute(&mut conn)
            .map_err(|e| CompanyError::Database(e.to_string()))?;

        Ok::<_, CompanyError>(team)
    })
    .await
    .map_err(|e| CompanyError::Database(e.to_string()))??;

    info!("Updated team: {} ({})", result.name, result.id);
    Ok(Json(result))
}

pub async fn delete_team(
    State(state): State<Arc<AppState>>,
    Path(team_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, CompanyError> {
    let pool = state.conn.clone();

    tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|e| CompanyError::Database(e.to_string()))?;
        let deleted = diesel::delete(teams::table.find(team_id))
            .execute(&mut conn)
            .map_err(|e| CompanyError::Database(e.to_string()))?;

        if deleted > 0 {
            info!("Deleted team: {team_id}");
            Ok::<_, CompanyError>(())
        } else {
            Err(CompanyError::NotFound("Team not found".to_string()))
        }
    })
    .await
    .map_err(|e| CompanyError::Database(e.to_string()))??;

    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn add_team_member(
    State(state): State<Arc<AppState>>,
    Path(team_id): Path<Uuid>,
    Json(req): Json<AddTeamMemberRequest>,
) -> Result<Json<TeamMemberRecord>, CompanyError> {
    let pool = state.conn.clone();

    let record = TeamMemberRecord {
        id: Uuid::new_v4(),
        team_id,
        user_id: req.user_id,
        created_at: Utc::now(),
    };

    let inserted = record.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|e| CompanyError::Database(e.to_string()))?;
        diesel::insert_into(team_members::table)
            .values(&record)
            .execute(&mut conn)
            .map_err(|e| CompanyError::Database(e.to_string()))?;
        Ok::<_, CompanyError>(())
    })
    .await
    .map_err(|e| CompanyError::Database(e.to_string()))??;

    info!(
        "Added team member: {} team={} user={}",
        inserted.id, inserted.team_id, inserted.user_id
    );
    Ok(Json(inserted))
}

pub async fn list_team_members(
    State(state): State<Arc<AppState>>,
    Path(team_id): Path<Uuid>,
) -> Result<Json<Vec<TeamMemberRecord>>, CompanyError> {
    let pool = state.conn.clone();

    let result = tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|e| CompanyError::Database(e.to_string()))?;
        team_members::table
            .filter(team_members::team_id.eq(team_id))
            .order(team_members::created_at.asc())
            .load::<TeamMemberRecord>(&mut conn)
            .map_err(|e| CompanyError::Database(e.to_string()))
    })
    .await
    .map_err(|e| CompanyError::Database(e.to_string()))??;

    Ok(Json(result))
}

pub async fn remove_team_member(
    State(state): State<Arc<AppState>>,
    Path(member_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, CompanyError> {
    let pool = state.conn.clone();

    tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|e| CompanyError::Database(e.to_string()))?;
        let deleted = diesel::delete(team_members::table.find(member_id))
            .execute(&mut conn)
            .map_err(|e| CompanyError::Database(e.to_string()))?;

        if deleted > 0 {
            info!("Removed team member: {member_id}");
            Ok::<_, CompanyError>(())
        } else {
            Err(CompanyError::NotFound("Team member not found".to_string()))
        }
    })
    .await
    .map_err(|e| CompanyError::Database(e.to_string()))??;

    Ok(Json(serde_json::json!({ "success": true })))
}
