// src/handlers/profile.rs

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::{PAGE_DEFAULT_LIMIT, PAGE_MAX_LIMIT},
    error::AppError,
    gamification,
    handlers::clamp_limit,
    models::{
        attempt::{AttemptHistoryEntry, HistoryParams},
        badge::UnlockedBadge,
        user::{EquippedItem, MeResponse, USER_COLUMNS, UpdateProfileRequest, User},
    },
    utils::{html::clean_opt, jwt::Claims},
};

/// Get current user's profile and statistics.
#[utoipa::path(
    get,
    path = "/api/profile/me",
    responses(
        (status = 200, description = "Profile with level progress"),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = [])),
    tag = "profile"
)]
pub async fn get_me(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(user_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let (attempts_count, badges_count): (i64, i64) = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM attempts WHERE user_id = $1),
            (SELECT COUNT(*) FROM user_badges WHERE user_id = $1)
        "#,
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await?;

    let equipped = sqlx::query_as::<_, EquippedItem>(
        r#"
        SELECT s.id AS item_id, s.name, s.kind, s.image_url
        FROM user_items ui
        JOIN shop_items s ON s.id = ui.item_id
        WHERE ui.user_id = $1 AND ui.equipped = TRUE
        ORDER BY s.kind
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(MeResponse {
        level_progress: gamification::level_progress(user.xp),
        user,
        attempts_count,
        badges_count,
        equipped,
    }))
}

/// Updates the caller's display name and bio.
pub async fn update_me(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user_id = claims.user_id()?;

    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users
        SET display_name = COALESCE($1, display_name),
            bio = COALESCE($2, bio)
        WHERE id = $3
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(clean_opt(payload.display_name))
    .bind(clean_opt(payload.bio))
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Attempt history of the current user, newest first, cursor-paginated.
pub async fn list_my_attempts(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let limit = clamp_limit(params.limit, PAGE_DEFAULT_LIMIT, PAGE_MAX_LIMIT);

    let attempts = sqlx::query_as::<_, AttemptHistoryEntry>(
        r#"
        SELECT
            a.id, a.quiz_id, q.title AS quiz_title, a.score, a.correct_count,
            a.total_questions, a.duration_secs, a.xp_earned, a.created_at
        FROM attempts a
        JOIN quizzes q ON q.id = a.quiz_id
        WHERE a.user_id = $1
          AND ($2::TIMESTAMPTZ IS NULL OR a.created_at < $2)
        ORDER BY a.created_at DESC
        LIMIT $3
        "#,
    )
    .bind(user_id)
    .bind(params.cursor)
    .bind(limit)
    .fetch_all(&pool)
    .await?;

    Ok(Json(attempts))
}

/// Badges unlocked by the current user.
pub async fn list_my_badges(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let badges = sqlx::query_as::<_, UnlockedBadge>(
        r#"
        SELECT b.id, b.code, b.name, b.description, b.icon_url, ub.unlocked_at
        FROM user_badges ub
        JOIN badges b ON b.id = ub.badge_id
        WHERE ub.user_id = $1
        ORDER BY ub.unlocked_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(badges))
}
