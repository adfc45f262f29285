// src/handlers/badges.rs

use axum::{Json, extract::State, response::IntoResponse};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::badge::{BADGE_COLUMNS, Badge},
};

/// The full badge catalog with unlock rules.
#[utoipa::path(
    get,
    path = "/api/badges",
    responses((status = 200, description = "Badge catalog")),
    tag = "badges"
)]
pub async fn list_badges(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let badges = sqlx::query_as::<_, Badge>(&format!(
        "SELECT {BADGE_COLUMNS} FROM badges ORDER BY rule_kind, threshold"
    ))
    .fetch_all(&pool)
    .await?;

    Ok(Json(badges))
}
