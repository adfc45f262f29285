// src/handlers/leaderboard.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::{
    config::{LEADERBOARD_DEFAULT_LIMIT, LEADERBOARD_MAX_LIMIT},
    error::AppError,
    handlers::clamp_limit,
};

#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    pub limit: Option<i64>,
}

/// Row of the global and weekly XP boards.
#[derive(Debug, Serialize, FromRow)]
pub struct XpEntry {
    pub rank: i64,
    pub user_id: i64,
    pub username: String,
    pub level: i32,
    pub xp: i64,
}

/// Row of a per-quiz board: each user's best run.
#[derive(Debug, Serialize, FromRow)]
pub struct QuizEntry {
    pub rank: i64,
    pub user_id: i64,
    pub username: String,
    pub score: i32,
    pub duration_secs: i32,
    pub achieved_at: chrono::DateTime<chrono::Utc>,
}

fn limit_of(params: &LeaderboardParams) -> i64 {
    clamp_limit(params.limit, LEADERBOARD_DEFAULT_LIMIT, LEADERBOARD_MAX_LIMIT)
}

/// All-time XP ranking. Ties go to the older account.
#[utoipa::path(
    get,
    path = "/api/leaderboard",
    params(("limit" = Option<i64>, Query, description = "Rows to return (default 10, max 100)")),
    responses((status = 200, description = "Top users by XP")),
    tag = "leaderboard"
)]
pub async fn global(
    State(pool): State<PgPool>,
    Query(params): Query<LeaderboardParams>,
) -> Result<impl IntoResponse, AppError> {
    let rows = sqlx::query_as::<_, XpEntry>(
        r#"
        SELECT
            ROW_NUMBER() OVER (ORDER BY xp DESC, created_at ASC) AS rank,
            id AS user_id, username, level, xp
        FROM users
        ORDER BY xp DESC, created_at ASC
        LIMIT $1
        "#,
    )
    .bind(limit_of(&params))
    .fetch_all(&pool)
    .await?;

    Ok(Json(rows))
}

/// XP earned from attempts during the last seven days.
pub async fn weekly(
    State(pool): State<PgPool>,
    Query(params): Query<LeaderboardParams>,
) -> Result<impl IntoResponse, AppError> {
    let rows = sqlx::query_as::<_, XpEntry>(
        r#"
        SELECT
            ROW_NUMBER() OVER (ORDER BY SUM(a.xp_earned) DESC, u.created_at ASC) AS rank,
            u.id AS user_id, u.username, u.level,
            SUM(a.xp_earned)::BIGINT AS xp
        FROM attempts a
        JOIN users u ON u.id = a.user_id
        WHERE a.created_at >= NOW() - INTERVAL '7 days'
        GROUP BY u.id
        ORDER BY xp DESC, u.created_at ASC
        LIMIT $1
        "#,
    )
    .bind(limit_of(&params))
    .fetch_all(&pool)
    .await?;

    Ok(Json(rows))
}

/// Best score per user on one quiz; ties go to the faster run.
pub async fn quiz(
    State(pool): State<PgPool>,
    Path(quiz_id): Path<i64>,
    Query(params): Query<LeaderboardParams>,
) -> Result<impl IntoResponse, AppError> {
    let rows = sqlx::query_as::<_, QuizEntry>(
        r#"
        WITH best AS (
            SELECT DISTINCT ON (a.user_id)
                a.user_id, a.score, a.duration_secs, a.created_at
            FROM attempts a
            WHERE a.quiz_id = $1
            ORDER BY a.user_id, a.score DESC, a.duration_secs ASC, a.created_at ASC
        )
        SELECT
            ROW_NUMBER() OVER (ORDER BY b.score DESC, b.duration_secs ASC, b.created_at ASC) AS rank,
            b.user_id, u.username, b.score, b.duration_secs, b.created_at AS achieved_at
        FROM best b
        JOIN users u ON u.id = b.user_id
        ORDER BY b.score DESC, b.duration_secs ASC, b.created_at ASC
        LIMIT $2
        "#,
    )
    .bind(quiz_id)
    .bind(limit_of(&params))
    .fetch_all(&pool)
    .await?;

    Ok(Json(rows))
}
