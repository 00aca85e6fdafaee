use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::schema::users;
use crate::shared::state::AppState;

use super::DirectoryError;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = users)]
pub struct UserRecord {
    pub id: Uuid,
    pub provider_id: String,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub async fn get_user_profile(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserRecord>, DirectoryError> {
    let pool = state.conn.clone();

    let result = tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|e| DirectoryError::Database(e.to_string()))?;
        users::table
            .find(user_id)
            .first::<UserRecord>(&mut conn)
            .optional()
            .map_err(|e| DirectoryError::Database(e.to_string()))
    })
    .await
    .map_err(|e| DirectoryError::Database(e.to_string()))??;

    result
        .ok_or_else(|| DirectoryError::NotFound("User not found".to_string()))
        .map(Json)
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserRecord>>, DirectoryError> {
    let pool = state.conn.clone();

    let result = tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|e| DirectoryError::Database(e.to_string()))?;
        users::table
            .order(users::created_at.asc())
            .load::<UserRecord>(&mut conn)
            .map_err(|e| DirectoryError::Database(e.to_string()))
    })
    .await
    .map_err(|e| DirectoryError::Database(e.to_string()))??;

    Ok(Json(result))
}
