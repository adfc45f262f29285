// src/handlers/studio.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgConnection, PgPool, types::Json as SqlJson};
use validator::Validate;

use crate::{
    error::AppError,
    models::material::{
        CreateMaterialRequest, MATERIAL_COLUMNS, Material, MaterialSummary, STATUS_FAILED,
        STATUS_PENDING, STATUS_PROCESSED,
    },
    studio::{ContentGenerator, StudyContent},
    utils::{html::plain_text, jwt::Claims},
};

/// Quiz fields used for every studio-generated quiz.
const STUDIO_CATEGORY: &str = "studio";
const STUDIO_DIFFICULTY: &str = "medium";
const DECK_TITLE_MAX: usize = 100;

async fn load_own_material(
    conn: &mut PgConnection,
    material_id: i64,
    user_id: i64,
) -> Result<Material, AppError> {
    sqlx::query_as::<_, Material>(&format!(
        "SELECT {MATERIAL_COLUMNS} FROM materials WHERE id = $1 AND user_id = $2"
    ))
    .bind(material_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(AppError::NotFound("Material not found".to_string()))
}

/// Uploads study material; it waits as `pending` until processed.
#[utoipa::path(
    post,
    path = "/api/studio/materials",
    request_body = CreateMaterialRequest,
    responses(
        (status = 201, description = "Material stored as pending"),
        (status = 400, description = "Text outside 50-50000 characters")
    ),
    security(("bearer" = [])),
    tag = "studio"
)]
pub async fn create_material(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateMaterialRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user_id = claims.user_id()?;

    let material = sqlx::query_as::<_, Material>(&format!(
        r#"
        INSERT INTO materials (user_id, title, source_text, status)
        VALUES ($1, $2, $3, $4)
        RETURNING {MATERIAL_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(plain_text(&payload.title))
    .bind(plain_text(&payload.text))
    .bind(STATUS_PENDING)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(material)))
}

pub async fn list_materials(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let materials = sqlx::query_as::<_, MaterialSummary>(
        r#"
        SELECT id, title, status, deck_id, quiz_id, created_at
        FROM materials
        WHERE user_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(materials))
}

pub async fn get_material(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let mut conn = pool.acquire().await?;
    let material = load_own_material(&mut conn, id, user_id).await?;
    Ok(Json(material))
}

/// Deletes the material. Generated decks and quizzes are kept.
pub async fn delete_material(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let result = sqlx::query("DELETE FROM materials WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Material not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Writes the generated deck and draft quiz, returning their ids.
async fn store_content(
    conn: &mut PgConnection,
    user_id: i64,
    material: &Material,
    content: &StudyContent,
) -> Result<(i64, Option<i64>), AppError> {
    let deck_title: String = material.title.chars().take(DECK_TITLE_MAX).collect();

    let deck_id: i64 = sqlx::query_scalar(
        "INSERT INTO decks (user_id, title, description) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(user_id)
    .bind(&deck_title)
    .bind(&content.summary)
    .fetch_one(&mut *conn)
    .await?;

    for card in &content.cards {
        sqlx::query("INSERT INTO cards (deck_id, front, back) VALUES ($1, $2, $3)")
            .bind(deck_id)
            .bind(&card.front)
            .bind(&card.back)
            .execute(&mut *conn)
            .await?;
    }

    if content.questions.is_empty() {
        return Ok((deck_id, None));
    }

    let quiz_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO quizzes (title, description, category, difficulty, is_published, created_by)
        VALUES ($1, $2, $3, $4, FALSE, $5)
        RETURNING id
        "#,
    )
    .bind(&material.title)
    .bind(&content.summary)
    .bind(STUDIO_CATEGORY)
    .bind(STUDIO_DIFFICULTY)
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;

    for (position, question) in content.questions.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO questions (quiz_id, type, content, options, answer, position)
            VALUES ($1, 'single', $2, $3, $4, $5)
            "#,
        )
        .bind(quiz_id)
        .bind(&question.content)
        .bind(SqlJson(&question.options))
        .bind(&question.answer)
        .bind(position as i32)
        .execute(&mut *conn)
        .await?;
    }

    Ok((deck_id, Some(quiz_id)))
}

/// Runs the content generator over a material.
///
/// On success a deck of cloze cards and (given enough distinct keywords) an
/// unpublished quiz are created for the owner and the material becomes
/// `processed`. Text with nothing usable leaves the material `failed` with
/// the reason in `error`.
#[utoipa::path(
    post,
    path = "/api/studio/materials/{id}/process",
    params(("id" = i64, Path, description = "Material id")),
    responses(
        (status = 200, description = "Material processed or marked failed"),
        (status = 404, description = "Material not found"),
        (status = 409, description = "Material already processed")
    ),
    security(("bearer" = [])),
    tag = "studio"
)]
pub async fn process_material(
    State(pool): State<PgPool>,
    State(generator): State<Arc<dyn ContentGenerator>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let mut tx = pool.begin().await?;

    let material = load_own_material(&mut tx, id, user_id).await?;
    if material.status == STATUS_PROCESSED {
        return Err(AppError::Conflict("Material already processed".to_string()));
    }

    let content = match generator.generate(&material.source_text).await {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(material_id = id, generator = generator.name(), error = %e, "material processing failed");
            let failed = sqlx::query_as::<_, Material>(&format!(
                r#"
                UPDATE materials
                SET status = $1, error = $2, processed_at = NOW()
                WHERE id = $3
                RETURNING {MATERIAL_COLUMNS}
                "#
            ))
            .bind(STATUS_FAILED)
            .bind(e.to_string())
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
            tx.commit().await?;
            return Ok(Json(failed));
        }
    };

    let (deck_id, quiz_id) = store_content(&mut tx, user_id, &material, &content).await?;

    let processed = sqlx::query_as::<_, Material>(&format!(
        r#"
        UPDATE materials
        SET status = $1, summary = $2, deck_id = $3, quiz_id = $4, error = NULL, processed_at = NOW()
        WHERE id = $5 AND status <> $1
        RETURNING {MATERIAL_COLUMNS}
        "#
    ))
    .bind(STATUS_PROCESSED)
    .bind(&content.summary)
    .bind(deck_id)
    .bind(quiz_id)
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::Conflict("Material already processed".to_string()))?;

    tx.commit().await?;

    tracing::info!(
        material_id = id,
        generator = generator.name(),
        cards = content.cards.len(),
        questions = content.questions.len(),
        "material processed"
    );

    Ok(Json(processed))
}

/// Publishes a draft quiz owned by the caller.
#[utoipa::path(
    post,
    path = "/api/studio/quizzes/{id}/publish",
    params(("id" = i64, Path, description = "Quiz id")),
    responses(
        (status = 200, description = "Quiz published"),
        (status = 400, description = "Quiz has no questions"),
        (status = 404, description = "Quiz not found or not owned")
    ),
    security(("bearer" = [])),
    tag = "studio"
)]
pub async fn publish_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let question_count: i64 = sqlx::query_scalar(
        r#"
        SELECT (SELECT COUNT(*) FROM questions WHERE quiz_id = q.id)
        FROM quizzes q
        WHERE q.id = $1 AND q.created_by = $2
        "#,
    )
    .bind(quiz_id)
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    if question_count == 0 {
        return Err(AppError::BadRequest("Quiz has no questions".to_string()));
    }

    sqlx::query("UPDATE quizzes SET is_published = TRUE WHERE id = $1")
        .bind(quiz_id)
        .execute(&pool)
        .await?;

    tracing::info!(quiz_id, user_id, "studio quiz published");

    Ok(Json(serde_json::json!({ "quiz_id": quiz_id, "is_published": true })))
}
