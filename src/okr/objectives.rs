use axum::{
    extract::{Path, State},
    Json,
};
use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::schema::{key_results, objectives};
use crate::shared::state::AppState;

use super::key_results::{bd, record_to_key_result, KeyResult, KeyResultRecord};
use super::progress::{aggregate_progress, objective_status, ObjectiveStatus, ObjectiveType};
use super::OkrError;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = objectives)]
pub struct ObjectiveRecord {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub objective_type: String,
    pub owner_id: Uuid,
    pub company_id: Uuid,
    pub team_id: Option<Uuid>,
    pub status: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub progress: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Objective {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub objective_type: ObjectiveType,
    pub owner_id: Uuid,
    pub company_id: Uuid,
    pub team_id: Option<Uuid>,
    pub status: ObjectiveStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub progress: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An objective together with its loaded key results.
#[derive(Debug, Clone, Serialize)]
pub struct ObjectiveResponse {
    #[serde(flatten)]
    pub objective: Objective,
    pub key_results: Vec<KeyResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ObjectiveListResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub objective_type: ObjectiveType,
    pub status: ObjectiveStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub progress: f64,
    pub key_results_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateObjectiveRequest {
    pub title: String,
    pub description: Option<String>,
    pub objective_type: ObjectiveType,
    pub owner_id: Uuid,
    pub company_id: Uuid,
    pub team_id: Option<Uuid>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateObjectiveRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<ObjectiveStatus>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

fn record_to_objective(record: ObjectiveRecord) -> Objective {
    Objective {
        id: record.id,
        title: record.title,
        description: record.description,
        objective_type: ObjectiveType::from_str(&record.objective_type),
        owner_id: record.owner_id,
        company_id: record.company_id,
        team_id: record.team_id,
        status: ObjectiveStatus::from_str(&record.status),
        start_date: record.start_date,
        end_date: record.end_date,
        progress: record.progress.to_f64().unwrap_or(0.0),
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

pub async fn create_objective(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateObjectiveRequest>,
) -> Result<Json<Objective>, OkrError> {
    let pool = state.conn.clone();
    let now = Utc::now();

    let record = ObjectiveRecord {
        id: Uuid::new_v4(),
        title: req.title,
        description: req.description,
        objective_type: req.objective_type.to_str().to_string(),
        owner_id: req.owner_id,
        company_id: req.company_id,
        team_id: req.team_id,
        status: ObjectiveStatus::Draft.to_str().to_string(),
        start_date: req.start_date,
        end_date: req.end_date,
        progress: BigDecimal::from(0),
        created_at: now,
        updated_at: now,
    };

    let inserted = record.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(|e| OkrError::Database(e.to_string()))?;
        diesel::insert_into(objectives::table)
            .values(&record)
            .execute(&mut conn)
            .map_err(|e| OkrError::Database(e.to_string()))?;
        Ok::<_, OkrError>(())
    })
    .await
    .map_err(|e| OkrError::Database(e.to_string()))??;

    info!("Created objective: {} ({})", inserted.title, inserted.id);
    Ok(Json(record_to_objective(inserted)))
}

pub async fn get_objective(
    State(state): State<Arc<AppState>>,
    Path(objective_id): Path<Uuid>,
) -> Result<Json<Objective>, OkrError> {
    let pool = state.conn.clone();

    let result = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(|e| OkrError::Database(e.to_string()))?;
        objectives::table
            .find(objective_id)
            .first::<ObjectiveRecord>(&mut conn)
            .optional()
            .map_err(|e| OkrError::Database(e.to_string()))
    })
    .await
    .map_err(|e| OkrError::Database(e.to_string()))??;

    result
        .map(record_to_objective)
        .ok_or_else(|| OkrError::NotFound("Objective not found".to_string()))
        .map(Json)
}

pub async fn get_objective_with_key_results(
    State(state): State<Arc<AppState>>,
    Path(objective_id): Path<Uuid>,
) -> Result<Json<ObjectiveResponse>, OkrError> {
    let pool = state.conn.clone();

    let (objective, children) = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(|e| OkrError::Database(e.to_string()))?;

        let objective = objectives::table
            .find(objective_id)
            .first::<ObjectiveRecord>(&mut conn)
            .optional()
            .map_err(|e| OkrError::Database(e.to_string()))?
            .ok_or_else(|| OkrError::NotFound("Objective not found".to_string()))?;

        let children = key_results::table
            .filter(key_results::objective_id.eq(objective_id))
            .order(key_results::created_at.asc())
            .load::<KeyResultRecord>(&mut conn)
            .map_err(|e| OkrError::Database(e.to_string()))?;

        Ok::<_, OkrError>((objective, children))
    })
    .await
    .map_err(|e| OkrError::Database(e.to_string()))??;

    Ok(Json(ObjectiveResponse {
        objective: record_to_objective(objective),
        key_results: children.into_iter().map(record_to_key_result).collect(),
    }))
}

pub async fn update_objective(
    State(state): State<Arc<AppState>>,
    Path(objective_id): Path<Uuid>,
    Json(req): Json<UpdateObjectiveRequest>,
) -> Result<Json<Objective>, OkrError> {
    let pool = state.conn.clone();

    let result = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(|e| OkrError::Database(e.to_string()))?;

        let mut objective = objectives::table
            .find(objective_id)
            .first::<ObjectiveRecord>(&mut conn)
            .optional()
            .map_err(|e| OkrError::Database(e.to_string()))?
            .ok_or_else(|| OkrError::NotFound("Objective not found".to_string()))?;

        if let Some(title) = req.title {
            objective.title = title;
        }
        if let Some(description) = req.description {
            objective.description = Some(description);
        }
        if let Some(status) = req.status {
            objective.status = status.to_str().to_string();
        }
        if let Some(start_date) = req.start_date {
            objective.start_date = start_date;
        }
        if let Some(end_date) = req.end_date {
            objective.end_date = end_date;
        }
        objective.updated_at = Utc::now();

        diesel::update(objectives::table.find(objective_id))
            .set(&objective)
            .execute(&mut conn)
            .map_err(|e| OkrError::Database(e.to_string()))?;

        Ok::<_, OkrError>(objective)
    })
    .await
    .map_err(|e| OkrError::Database(e.to_string()))??;

    info!("Updated objective: {} ({})", result.title, result.id);
    Ok(Json(record_to_objective(result)))
}

/// Pull-based roll-up: loads the objective with its key results, takes the
/// mean of their progress, reclassifies and persists. Invoked explicitly;
/// key result writes do not trigger it.
pub async fn update_objective_progress(
    State(state): State<Arc<AppState>>,
    Path(objective_id): Path<Uuid>,
) -> Result<Json<Objective>, OkrError> {
    let pool = state.conn.clone();
    let now = Utc::now();

    let result = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(|e| OkrError::Database(e.to_string()))?;

        let mut objective = objectives::table
            .find(objective_id)
            .first::<ObjectiveRecord>(&mut conn)
            .optional()
            .map_err(|e| OkrError::Database(e.to_string()))?
            .ok_or_else(|| OkrError::NotFound("Objective not found".to_string()))?;

        let child_progress = key_results::table
            .filter(key_results::objective_id.eq(objective_id))
            .select(key_results::progress)
            .load::<BigDecimal>(&mut conn)
            .map_err(|e| OkrError::Database(e.to_string()))?;

        let values: Vec<f64> = child_progress
            .iter()
            .map(|p| p.to_f64().unwrap_or(0.0))
            .collect();

        let old_progress = objective.progress.to_f64().unwrap_or(0.0);
        let old_status = ObjectiveStatus::from_str(&objective.status);

        let progress = aggregate_progress(&values);
        let status = objective_status(
            progress,
            objective.start_date,
            objective.end_date,
            now,
            old_status,
        );

        debug!(
            "Objective {} roll-up over {} key results: progress {} -> {}, status {} -> {}",
            objective_id,
            values.len(),
            old_progress,
            progress,
            old_status.to_str(),
            status.to_str()
        );

        objective.progress = bd(progress);
        objective.status = status.to_str().to_string();
        objective.updated_at = now;

        diesel::update(objectives::table.find(objective_id))
            .set(&objective)
            .execute(&mut conn)
            .map_err(|e| OkrError::Database(e.to_string()))?;

        Ok::<_, OkrError>(objective)
    })
    .await
    .map_err(|e| OkrError::Database(e.to_string()))??;

    info!(
        "Updated objective progress: {} progress={} status={}",
        result.id, result.progress, result.status
    );
    Ok(Json(record_to_objective(result)))
}

pub async fn delete_objective(
    State(state): State<Arc<AppState>>,
    Path(objective_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, OkrError> {
    let pool = state.conn.clone();

    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(|e| OkrError::Database(e.to_string()))?;
        let deleted = diesel::delete(objectives::table.find(objective_id))
            .execute(&mut conn)
            .map_err(|e| OkrError::Database(e.to_string()))?;

        if deleted > 0 {
            info!("Deleted objective: {objective_id}");
            Ok::<_, OkrError>(())
        } else {
            Err(OkrError::NotFound("Objective not found".to_string()))
        }
    })
    .await
    .map_err(|e| OkrError::Database(e.to_string()))??;

    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn list_objectives_by_company(
    State(state): State<Arc<AppState>>,
    Path(company_id): Path<Uuid>,
) -> Result<Json<Vec<ObjectiveListResponse>>, OkrError> {
    list_objectives(state, ObjectiveFilter::Company(company_id)).await
}

pub async fn list_objectives_by_team(
    State(state): State<Arc<AppState>>,
    Path(team_id): Path<Uuid>,
) -> Result<Json<Vec<ObjectiveListResponse>>, OkrError> {
    list_objectives(state, ObjectiveFilter::Team(team_id)).await
}

pub async fn list_objectives_by_owner(
    State(state): State<Arc<AppState>>,
    Path(owner_id): Path<Uuid>,
) -> Result<Json<Vec<ObjectiveListResponse>>, OkrError> {
    list_objectives(state, ObjectiveFilter::Owner(owner_id)).await
}

enum ObjectiveFilter {
    Company(Uuid),
    Team(Uuid),
    Owner(Uuid),
}

async fn list_objectives(
    state: Arc<AppState>,
    filter: ObjectiveFilter,
) -> Result<Json<Vec<ObjectiveListResponse>>, OkrError> {
    let pool = state.conn.clone();

    let result = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(|e| OkrError::Database(e.to_string()))?;

        let mut query = objectives::table.into_boxed();
        query = match filter {
            ObjectiveFilter::Company(id) => query.filter(objectives::company_id.eq(id)),
            ObjectiveFilter::Team(id) => query.filter(objectives::team_id.eq(id)),
            ObjectiveFilter::Owner(id) => query.filter(objectives::owner_id.eq(id)),
        };

        let rows = query
            .order(objectives::created_at.desc())
            .load::<ObjectiveRecord>(&mut conn)
            .map_err(|e| OkrError::Database(e.to_string()))?;

        let mut listed = Vec::with_capacity(rows.len());
        for record in rows {
            let count: i64 = key_results::table
                .filter(key_results::objective_id.eq(record.id))
                .count()
                .get_result(&mut conn)
                .map_err(|e| OkrError::Database(e.to_string()))?;
            listed.push(ObjectiveListResponse {
                id: record.id,
                title: record.title,
                description: record.description,
                objective_type: ObjectiveType::from_str(&record.objective_type),
                status: ObjectiveStatus::from_str(&record.status),
                start_date: record.start_date,
                end_date: record.end_date,
                progress: record.progress.to_f64().unwrap_or(0.0),
                key_results_count: count,
            });
        }

        Ok::<_, OkrError>(listed)
    })
    .await
    .map_err(|e| OkrError::Database(e.to_string()))??;

    Ok(Json(result))
}
