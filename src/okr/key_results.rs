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

use crate::shared::schema::key_results;
use crate::shared::state::AppState;

use super::progress::{
    compute_progress, key_result_status, validate_metric_values, AssigneeType, KeyResultStatus,
    MetricType,
};
use super::OkrError;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = key_results)]
pub struct KeyResultRecord {
    pub id: Uuid,
    pub objective_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub metric_type: String,
    pub current_value: BigDecimal,
    pub target_value: BigDecimal,
    pub progress: BigDecimal,
    pub status: String,
    pub assignee_type: String,
    pub assignee_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyResult {
    pub id: Uuid,
    pub objective_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub metric_type: MetricType,
    pub current_value: f64,
    pub target_value: f64,
    pub progress: f64,
    pub status: KeyResultStatus,
    pub assignee_type: AssigneeType,
    pub assignee_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateKeyResultRequest {
    pub title: String,
    pub description: Option<String>,
    pub metric_type: MetricType,
    pub current_value: Option<f64>,
    pub target_value: f64,
    pub assignee_type: AssigneeType,
    pub assignee_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateKeyResultRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub metric_type: Option<MetricType>,
    pub current_value: Option<f64>,
    pub target_value: Option<f64>,
    pub assignee_type: Option<AssigneeType>,
    pub assignee_id: Option<Uuid>,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
}

pub(crate) fn bd(value: f64) -> BigDecimal {
    BigDecimal::try_from(value).unwrap_or_else(|_| BigDecimal::from(0))
}

pub(crate) fn record_to_key_result(record: KeyResultRecord) -> KeyResult {
    KeyResult {
        id: record.id,
        objective_id: record.objective_id,
        title: record.title,
        description: record.description,
        metric_type: MetricType::from_str(&record.metric_type),
        current_value: record.current_value.to_f64().unwrap_or(0.0),
        target_value: record.target_value.to_f64().unwrap_or(0.0),
        progress: record.progress.to_f64().unwrap_or(0.0),
        status: KeyResultStatus::from_str(&record.status),
        assignee_type: AssigneeType::from_str(&record.assignee_type),
        assignee_id: record.assignee_id,
        start_date: record.start_date,
        due_date: record.due_date,
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

// Runs validation, normalization and classification over raw values and
// writes the results back into the record.
fn recompute(record: &mut KeyResultRecord, now: DateTime<Utc>) -> Result<(), OkrError> {
    let metric_type = MetricType::from_str(&record.metric_type);
    let current = record.current_value.to_f64().unwrap_or(0.0);
    let target = record.target_value.to_f64().unwrap_or(0.0);
    let prior = record.progress.to_f64().unwrap_or(0.0);

    validate_metric_values(metric_type, current, target)?;

    let outcome = compute_progress(metric_type, current, target, prior);
    record.target_value = bd(outcome.target_value);
    record.progress = bd(outcome.progress);

    let status = key_result_status(outcome.progress, record.start_date, record.due_date, now);
    record.status = status.to_str().to_string();

    debug!(
        "Recomputed key result {}: progress={} status={}",
        record.id,
        outcome.progress,
        record.status
    );
    Ok(())
}

pub async fn create_key_result(
    State(state): State<Arc<AppState>>,
    Path(objective_id): Path<Uuid>,
    Json(req): Json<CreateKeyResultRequest>,
) -> Result<Json<KeyResult>, OkrError> {
    let pool = state.conn.clone();
    let now = Utc::now();

    let mut record = KeyResultRecord {
        id: Uuid::new_v4(),
        objective_id,
        title: req.title,
        description: req.description,
        metric_type: req.metric_type.to_str().to_string(),
        current_value: bd(req.current_value.unwrap_or(0.0)),
        target_value: bd(req.target_value),
        progress: BigDecimal::from(0),
        status: KeyResultStatus::NotStarted.to_str().to_string(),
        assignee_type: req.assignee_type.to_str().to_string(),
        assignee_id: req.assignee_id,
        start_date: req.start_date,
        due_date: req.due_date,
        created_at: now,
        updated_at: now,
    };

    recompute(&mut record, now)?;

    let inserted = record.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(|e| OkrError::Database(e.to_string()))?;
        diesel::insert_into(key_results::table)
            .values(&record)
            .execute(&mut conn)
            .map_err(|e| OkrError::Database(e.to_string()))?;
        Ok::<_, OkrError>(())
    })
    .await
    .map_err(|e| OkrError::Database(e.to_string()))??;

    info!(
        "Created key result: {} ({}) progress={} status={}",
        inserted.title, inserted.id, inserted.progress, inserted.status
    );
    Ok(Json(record_to_key_result(inserted)))
}

pub async fn get_key_result(
    State(state): State<Arc<AppState>>,
    Path(key_result_id): Path<Uuid>,
) -> Result<Json<KeyResult>, OkrError> {
    let pool = state.conn.clone();

    let result = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(|e| OkrError::Database(e.to_string()))?;
        key_results::table
            .find(key_result_id)
            .first::<KeyResultRecord>(&mut conn)
            .optional()
            .map_err(|e| OkrError::Database(e.to_string()))
    })
    .await
    .map_err(|e| OkrError::Database(e.to_string()))??;

    result
        .map(record_to_key_result)
        .ok_or_else(|| OkrError::NotFound("Key result not found".to_string()))
        .map(Json)
}

pub async fn list_key_results(
    State(state): State<Arc<AppState>>,
    Path(objective_id): Path<Uuid>,
) -> Result<Json<Vec<KeyResult>>, OkrError> {
    let pool = state.conn.clone();

    let result = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(|e| OkrError::Database(e.to_string()))?;
        key_results::table
            .filter(key_results::objective_id.eq(objective_id))
            .order(key_results::created_at.asc())
            .load::<KeyResultRecord>(&mut conn)
            .map_err(|e| OkrError::Database(e.to_string()))
    })
    .await
    .map_err(|e| OkrError::Database(e.to_string()))??;

    Ok(Json(result.into_iter().map(record_to_key_result).collect()))
}

pub async fn update_key_result(
    State(state): State<Arc<AppState>>,
    Path(key_result_id): Path<Uuid>,
    Json(req): Json<UpdateKeyResultRequest>,
) -> Result<Json<KeyResult>, OkrError> {
    let pool = state.conn.clone();
    let now = Utc::now();

    let result = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(|e| OkrError::Database(e.to_string()))?;

        let mut kr = key_results::table
            .find(key_result_id)
            .first::<KeyResultRecord>(&mut conn)
            .optional()
            .map_err(|e| OkrError::Database(e.to_string()))?
            .ok_or_else(|| OkrError::NotFound("Key result not found".to_string()))?;

        if let Some(title) = req.title {
            kr.title = title;
        }
        if let Some(description) = req.description {
            kr.description = Some(description);
        }
        if let Some(metric_type) = req.metric_type {
            kr.metric_type = metric_type.to_str().to_string();
        }
        if let Some(current_value) = req.current_value {
            kr.current_value = bd(current_value);
        }
        if let Some(target_value) = req.target_value {
            kr.target_value = bd(target_value);
        }
        if let Some(assignee_type) = req.assignee_type {
            kr.assignee_type = assignee_type.to_str().to_string();
        }
        if let Some(assignee_id) = req.assignee_id {
            kr.assignee_id = assignee_id;
        }
        if let Some(start_date) = req.start_date {
            kr.start_date = start_date;
        }
        if let Some(due_date) = req.due_date {
            kr.due_date = due_date;
        }
        kr.updated_at = now;

        recompute(&mut kr, now)?;

        diesel::update(key_results::table.find(key_result_id))
            .set(&kr)
            .execute(&mut conn)
            .map_err(|e| OkrError::Database(e.to_string()))?;

        Ok::<_, OkrError>(kr)
    })
    .await
    .map_err(|e| OkrError::Database(e.to_string()))??;

    info!(
        "Updated key result: {} ({}) progress={} status={}",
        result.title, result.id, result.progress, result.status
    );
    Ok(Json(record_to_key_result(result)))
}

pub async fn delete_key_result(
    State(state): State<Arc<AppState>>,
    Path(key_result_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, OkrError> {
    let pool = state.conn.clone();

    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(|e| OkrError::Database(e.to_string()))?;
        let deleted = diesel::delete(key_results::table.find(key_result_id))
            .execute(&mut conn)
            .map_err(|e| OkrError::Database(e.to_string()))?;

        if deleted > 0 {
            info!("Deleted key result: {key_result_id}");
            Ok::<_, OkrError>(())
        } else {
            Err(OkrError::NotFound("Key result not found".to_string()))
        }
    })
    .await
    .map_err(|e| OkrError::Database(e.to_string()))??;

    Ok(Json(serde_json::json!({ "success": true })))
}
