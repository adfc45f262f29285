// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder, types::Json as SqlJson};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppError,
    gamification,
    handlers::{quiz::load_questions, tracks::TRACK_COLUMNS},
    models::{
        badge::{BADGE_COLUMNS, Badge, CreateBadgeRequest, UpdateBadgeRequest},
        question::{CreateQuestionRequest, QUESTION_COLUMNS, Question, UpdateQuestionRequest},
        quiz::{CreateQuizRequest, QUIZ_SELECT, Quiz, UpdateQuizRequest},
        shop::{CreateShopItemRequest, SHOP_ITEM_COLUMNS, ShopItem, UpdateShopItemRequest},
        tournament::{CreateTournamentRequest, TOURNAMENT_COLUMNS, Tournament},
        track::{CreateTrackRequest, SkillTrack, UpdateTrackRequest},
        user::{USER_COLUMNS, User},
    },
    utils::{
        hash::hash_password,
        html::{clean_html, clean_opt},
        jwt::{Claims, ROLE_USER},
        validate::{validate_role, validate_username},
    },
};

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Lists all users in the system.
pub async fn list_users(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let users = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id DESC"))
        .fetch_all(&pool)
        .await?;

    Ok(Json(users))
}

/// DTO for an admin creating a user; the role may be chosen.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AdminCreateUserRequest {
    #[validate(length(min = 3, max = 30), custom(function = validate_username))]
    pub username: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    #[validate(custom(function = validate_role))]
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    ROLE_USER.to_string()
}

pub async fn create_user(
    State(pool): State<PgPool>,
    Json(payload): Json<AdminCreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let hashed_password = hash_password(&payload.password)?;

    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (username, password, role) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
    ))
    .bind(&payload.username)
    .bind(hashed_password)
    .bind(&payload.role)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        AppError::conflict_on_unique(e, format!("Username '{}' already exists", payload.username))
    })?;

    tracing::info!(user_id = user.id, role = %user.role, "user created by admin");

    Ok((StatusCode::CREATED, Json(user)))
}

/// DTO for updating a user. Fields are optional.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AdminUpdateUserRequest {
    #[validate(length(min = 3, max = 30), custom(function = validate_username))]
    pub username: Option<String>,
    #[validate(custom(function = validate_role))]
    pub role: Option<String>,
    #[validate(length(min = 6, max = 128))]
    pub password: Option<String>,
    #[validate(range(min = 0))]
    pub coins: Option<i64>,
    /// Setting XP also recomputes the level.
    #[validate(range(min = 0))]
    pub xp: Option<i64>,
}

pub async fn update_user(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<AdminUpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE users SET ");
    let mut separated = builder.separated(", ");
    // Keeps the statement valid when nothing else changes.
    separated.push("id = id");

    if let Some(username) = payload.username {
        separated.push("username = ");
        separated.push_bind_unseparated(username);
    }

    if let Some(role) = payload.role {
        separated.push("role = ");
        separated.push_bind_unseparated(role);
    }

    if let Some(password) = payload.password {
        separated.push("password = ");
        separated.push_bind_unseparated(hash_password(&password)?);
    }

    if let Some(coins) = payload.coins {
        separated.push("coins = ");
        separated.push_bind_unseparated(coins);
    }

    if let Some(xp) = payload.xp {
        separated.push("xp = ");
        separated.push_bind_unseparated(xp);
        separated.push("level = ");
        separated.push_bind_unseparated(gamification::calculate_level(xp));
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(format!(" RETURNING {USER_COLUMNS}"));

    let user = builder
        .build_query_as::<User>()
        .fetch_optional(&pool)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, "Username already exists"))?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Deletes a user by ID. An admin cannot delete their own account.
pub async fn delete_user(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if id == claims.user_id()? {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Quizzes and questions
// ---------------------------------------------------------------------------

/// Every quiz, drafts included.
pub async fn list_quizzes(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let quizzes = sqlx::query_as::<_, Quiz>(&format!("{QUIZ_SELECT} ORDER BY q.id DESC"))
        .fetch_all(&pool)
        .await?;
    Ok(Json(quizzes))
}

async fn load_quiz(conn: &mut PgConnection, id: i64) -> Result<Quiz, AppError> {
    sqlx::query_as::<_, Quiz>(&format!("{QUIZ_SELECT} WHERE q.id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))
}

/// A quiz with its questions, answers included.
pub async fn get_quiz(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = pool.acquire().await?;
    let quiz = load_quiz(&mut conn, id).await?;
    drop(conn);
    let questions = load_questions(&pool, id).await?;
    Ok(Json(serde_json::json!({ "quiz": quiz, "questions": questions })))
}

pub async fn create_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let admin_id = claims.user_id()?;

    let mut conn = pool.acquire().await?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO quizzes (title, description, category, difficulty, time_limit_secs, is_published, created_by)
        VALUES ($1, $2, $3, $4, $5, FALSE, $6)
        RETURNING id
        "#,
    )
    .bind(clean_html(&payload.title))
    .bind(clean_html(&payload.description))
    .bind(&payload.category)
    .bind(&payload.difficulty)
    .bind(payload.time_limit_secs)
    .bind(admin_id)
    .fetch_one(&mut *conn)
    .await?;

    let quiz = load_quiz(&mut conn, id).await?;
    Ok((StatusCode::CREATED, Json(quiz)))
}

pub async fn update_quiz(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE quizzes SET ");
    let mut separated = builder.separated(", ");
    separated.push("id = id");

    if let Some(title) = payload.title {
        separated.push("title = ");
        separated.push_bind_unseparated(clean_html(&title));
    }

    if let Some(description) = payload.description {
        separated.push("description = ");
        separated.push_bind_unseparated(clean_html(&description));
    }

    if let Some(category) = payload.category {
        separated.push("category = ");
        separated.push_bind_unseparated(category);
    }

    if let Some(difficulty) = payload.difficulty {
        separated.push("difficulty = ");
        separated.push_bind_unseparated(difficulty);
    }

    if let Some(time_limit) = payload.time_limit_secs {
        separated.push("time_limit_secs = ");
        separated.push_bind_unseparated(time_limit);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let mut conn = pool.acquire().await?;
    let result = builder.build().execute(&mut *conn).await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    let quiz = load_quiz(&mut conn, id).await?;
    Ok(Json(quiz))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PublishRequest {
    pub is_published: bool,
}

/// Publishes or unpublishes a quiz. An empty quiz cannot go live.
pub async fn set_quiz_published(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<PublishRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = pool.acquire().await?;
    let quiz = load_quiz(&mut conn, id).await?;

    if payload.is_published && quiz.question_count == 0 {
        return Err(AppError::BadRequest("Quiz has no questions".to_string()));
    }

    sqlx::query("UPDATE quizzes SET is_published = $1 WHERE id = $2")
        .bind(payload.is_published)
        .bind(id)
        .execute(&mut *conn)
        .await?;

    tracing::info!(quiz_id = id, is_published = payload.is_published, "quiz publication changed");

    let quiz = load_quiz(&mut conn, id).await?;
    Ok(Json(quiz))
}

pub async fn delete_quiz(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM quizzes WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Adds a question to a quiz.
pub async fn create_question(
    State(pool): State<PgPool>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let question = sqlx::query_as::<_, Question>(&format!(
        r#"
        INSERT INTO questions (quiz_id, type, content, options, answer, analysis, position)
        SELECT id, $2, $3, $4, $5, $6, $7 FROM quizzes WHERE id = $1
        RETURNING {QUESTION_COLUMNS}
        "#
    ))
    .bind(quiz_id)
    .bind(&payload.question_type)
    .bind(clean_html(&payload.content))
    .bind(SqlJson(&payload.options))
    .bind(payload.answer.trim())
    .bind(clean_opt(payload.analysis))
    .bind(payload.position)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    Ok((StatusCode::CREATED, Json(question)))
}

/// Updates a question by ID.
///
/// The merged question is validated as a whole so a partial update cannot
/// leave an answer that is missing from the options.
pub async fn update_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tx = pool.begin().await?;

    let current = sqlx::query_as::<_, Question>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Question not found".to_string()))?;

    let merged = CreateQuestionRequest {
        question_type: payload.question_type.unwrap_or(current.question_type),
        content: payload.content.map(|c| clean_html(&c)).unwrap_or(current.content),
        options: payload.options.unwrap_or(current.options.0),
        answer: payload.answer.map(|a| a.trim().to_string()).unwrap_or(current.answer),
        analysis: clean_opt(payload.analysis).or(current.analysis),
        position: payload.position.unwrap_or(current.position),
    };
    merged.validate()?;

    let question = sqlx::query_as::<_, Question>(&format!(
        r#"
        UPDATE questions
        SET type = $1, content = $2, options = $3, answer = $4, analysis = $5, position = $6
        WHERE id = $7
        RETURNING {QUESTION_COLUMNS}
        "#
    ))
    .bind(&merged.question_type)
    .bind(&merged.content)
    .bind(SqlJson(&merged.options))
    .bind(&merged.answer)
    .bind(&merged.analysis)
    .bind(merged.position)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Json(question))
}

pub async fn delete_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM questions WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Badges
// ---------------------------------------------------------------------------

pub async fn create_badge(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateBadgeRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let badge = sqlx::query_as::<_, Badge>(&format!(
        r#"
        INSERT INTO badges (code, name, description, icon_url, rule_kind, threshold)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {BADGE_COLUMNS}
        "#
    ))
    .bind(&payload.code)
    .bind(clean_html(&payload.name))
    .bind(clean_html(&payload.description))
    .bind(&payload.icon_url)
    .bind(&payload.rule_kind)
    .bind(payload.threshold)
    .fetch_one(&pool)
    .await
    .map_err(|e| AppError::conflict_on_unique(e, format!("Badge code '{}' already exists", payload.code)))?;

    Ok((StatusCode::CREATED, Json(badge)))
}

pub async fn update_badge(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateBadgeRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let badge = sqlx::query_as::<_, Badge>(&format!(
        r#"
        UPDATE badges
        SET name = COALESCE($1, name),
            description = COALESCE($2, description),
            icon_url = COALESCE($3, icon_url),
            rule_kind = COALESCE($4, rule_kind),
            threshold = COALESCE($5, threshold)
        WHERE id = $6
        RETURNING {BADGE_COLUMNS}
        "#
    ))
    .bind(clean_opt(payload.name))
    .bind(clean_opt(payload.description))
    .bind(payload.icon_url)
    .bind(payload.rule_kind)
    .bind(payload.threshold)
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Badge not found".to_string()))?;

    Ok(Json(badge))
}

pub async fn delete_badge(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM badges WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Badge not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Shop
// ---------------------------------------------------------------------------

/// All shop items, inactive ones included.
pub async fn list_shop_items(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let items = sqlx::query_as::<_, ShopItem>(&format!(
        "SELECT {SHOP_ITEM_COLUMNS} FROM shop_items ORDER BY id DESC"
    ))
    .fetch_all(&pool)
    .await?;
    Ok(Json(items))
}

pub async fn create_shop_item(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateShopItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let item = sqlx::query_as::<_, ShopItem>(&format!(
        r#"
        INSERT INTO shop_items (name, description, kind, price, image_url)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {SHOP_ITEM_COLUMNS}
        "#
    ))
    .bind(clean_html(&payload.name))
    .bind(clean_html(&payload.description))
    .bind(&payload.kind)
    .bind(payload.price)
    .bind(&payload.image_url)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_shop_item(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateShopItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let item = sqlx::query_as::<_, ShopItem>(&format!(
        r#"
        UPDATE shop_items
        SET name = COALESCE($1, name),
            description = COALESCE($2, description),
            price = COALESCE($3, price),
            image_url = COALESCE($4, image_url),
            is_active = COALESCE($5, is_active)
        WHERE id = $6
        RETURNING {SHOP_ITEM_COLUMNS}
        "#
    ))
    .bind(clean_opt(payload.name))
    .bind(clean_opt(payload.description))
    .bind(payload.price)
    .bind(payload.image_url)
    .bind(payload.is_active)
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Item not found".to_string()))?;

    Ok(Json(item))
}

/// Takes an item off sale. Owned copies stay in inventories.
pub async fn deactivate_shop_item(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("UPDATE shop_items SET is_active = FALSE WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Item not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Tournaments
// ---------------------------------------------------------------------------

pub async fn create_tournament(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateTournamentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let tournament = sqlx::query_as::<_, Tournament>(&format!(
        r#"
        INSERT INTO tournaments (name, description, quiz_id, starts_at, ends_at, prize_coins)
        SELECT $1, $2, id, $4, $5, $6 FROM quizzes WHERE id = $3
        RETURNING {TOURNAMENT_COLUMNS}
        "#
    ))
    .bind(clean_html(&payload.name))
    .bind(clean_html(&payload.description))
    .bind(payload.quiz_id)
    .bind(payload.starts_at)
    .bind(payload.ends_at)
    .bind(payload.prize_coins)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::BadRequest("Quiz does not exist".to_string()))?;

    tracing::info!(tournament_id = tournament.id, quiz_id = tournament.quiz_id, "tournament created");

    Ok((StatusCode::CREATED, Json(tournament)))
}

pub async fn delete_tournament(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM tournaments WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Tournament not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Skill tracks
// ---------------------------------------------------------------------------

/// Replaces the ordered quiz list of a track. Unknown quiz ids are rejected.
async fn set_track_quizzes(conn: &mut PgConnection, track_id: i64, quiz_ids: &[i64]) -> Result<(), AppError> {
    let mut unique = quiz_ids.to_vec();
    unique.sort_unstable();
    unique.dedup();
    if unique.len() != quiz_ids.len() {
        return Err(AppError::BadRequest("Quiz ids must be unique".to_string()));
    }

    let known: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quizzes WHERE id = ANY($1)")
        .bind(quiz_ids)
        .fetch_one(&mut *conn)
        .await?;
    if known as usize != quiz_ids.len() {
        return Err(AppError::BadRequest("Unknown quiz id in track".to_string()));
    }

    sqlx::query("DELETE FROM track_quizzes WHERE track_id = $1")
        .bind(track_id)
        .execute(&mut *conn)
        .await?;

    if quiz_ids.is_empty() {
        return Ok(());
    }

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO track_quizzes (track_id, quiz_id, position) ");
    builder.push_values(quiz_ids.iter().enumerate(), |mut row, (position, quiz_id)| {
        row.push_bind(track_id)
            .push_bind(*quiz_id)
            .push_bind(position as i32 + 1);
    });
    builder.build().execute(&mut *conn).await?;

    Ok(())
}

pub async fn create_track(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateTrackRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tx = pool.begin().await?;

    let track = sqlx::query_as::<_, SkillTrack>(&format!(
        "INSERT INTO skill_tracks (title, description, category) VALUES ($1, $2, $3) RETURNING {TRACK_COLUMNS}"
    ))
    .bind(clean_html(&payload.title))
    .bind(clean_html(&payload.description))
    .bind(&payload.category)
    .fetch_one(&mut *tx)
    .await?;

    set_track_quizzes(&mut tx, track.id, &payload.quiz_ids).await?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(track)))
}

pub async fn update_track(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateTrackRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tx = pool.begin().await?;

    let track = sqlx::query_as::<_, SkillTrack>(&format!(
        r#"
        UPDATE skill_tracks
        SET title = COALESCE($1, title),
            description = COALESCE($2, description),
            category = COALESCE($3, category)
        WHERE id = $4
        RETURNING {TRACK_COLUMNS}
        "#
    ))
    .bind(clean_opt(payload.title))
    .bind(clean_opt(payload.description))
    .bind(payload.category)
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Track not found".to_string()))?;

    if let Some(quiz_ids) = payload.quiz_ids {
        set_track_quizzes(&mut tx, id, &quiz_ids).await?;
    }

    tx.commit().await?;

    Ok(Json(track))
}

pub async fn delete_track(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM skill_tracks WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Track not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, FromRow)]
pub struct PlatformStats {
    pub users: i64,
    pub quizzes: i64,
    pub attempts: i64,
    pub attempts_last_24h: i64,
}

/// Platform-wide counters for the admin dashboard.
pub async fn stats(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let stats = sqlx::query_as::<_, PlatformStats>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM users) AS users,
            (SELECT COUNT(*) FROM quizzes) AS quizzes,
            (SELECT COUNT(*) FROM attempts) AS attempts,
            (SELECT COUNT(*) FROM attempts WHERE created_at > NOW() - INTERVAL '24 hours') AS attempts_last_24h
        "#,
    )
    .fetch_one(&pool)
    .await?;

    Ok(Json(stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_created_users_default_to_user_role() {
        let req: AdminCreateUserRequest =
            serde_json::from_str(r#"{"username":"new_player","password":"secret123"}"#).unwrap();
        assert_eq!(req.role, ROLE_USER);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn admin_update_rejects_negative_balances() {
        let req = AdminUpdateUserRequest {
            username: None,
            role: None,
            password: None,
            coins: Some(-1),
            xp: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn admin_update_rejects_unknown_role() {
        let req = AdminUpdateUserRequest {
            username: None,
            role: Some("superuser".into()),
            password: None,
            coins: None,
            xp: Some(250),
        };
        assert!(req.validate().is_err());
    }
}
