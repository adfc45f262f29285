// src/handlers/decks.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use validator::Validate;

use crate::{
    config::CARD_REVIEW_XP,
    error::AppError,
    models::deck::{
        CARD_COLUMNS, Card, CreateCardRequest, CreateDeckRequest, DECK_SELECT, Deck,
        ReviewCardRequest, UpdateCardRequest, UpdateDeckRequest,
    },
    rewards, srs,
    utils::{
        html::{clean_html, clean_opt},
        jwt::Claims,
    },
};

/// Decks are private: anything not owned by the caller is reported as missing.
async fn load_own_deck(conn: &mut PgConnection, deck_id: i64, user_id: i64) -> Result<Deck, AppError> {
    sqlx::query_as::<_, Deck>(&format!("{DECK_SELECT} WHERE d.id = $1 AND d.user_id = $2"))
        .bind(deck_id)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::NotFound("Deck not found".to_string()))
}

async fn load_own_card(conn: &mut PgConnection, card_id: i64, user_id: i64) -> Result<Card, AppError> {
    sqlx::query_as::<_, Card>(&format!(
        "SELECT {} FROM cards c JOIN decks d ON d.id = c.deck_id WHERE c.id = $1 AND d.user_id = $2",
        qualified_card_columns()
    ))
    .bind(card_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(AppError::NotFound("Card not found".to_string()))
}

fn qualified_card_columns() -> String {
    CARD_COLUMNS
        .split(", ")
        .map(|col| format!("c.{col}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Decks owned by the current user.
#[utoipa::path(
    get,
    path = "/api/decks",
    responses((status = 200, description = "Own decks with card counters")),
    security(("bearer" = [])),
    tag = "decks"
)]
pub async fn list_decks(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let decks = sqlx::query_as::<_, Deck>(&format!(
        "{DECK_SELECT} WHERE d.user_id = $1 ORDER BY d.created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(decks))
}

#[utoipa::path(
    post,
    path = "/api/decks",
    request_body = CreateDeckRequest,
    responses((status = 201, description = "Deck created")),
    security(("bearer" = [])),
    tag = "decks"
)]
pub async fn create_deck(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateDeckRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user_id = claims.user_id()?;

    let mut conn = pool.acquire().await?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO decks (user_id, title, description) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(user_id)
    .bind(clean_html(&payload.title))
    .bind(clean_html(&payload.description))
    .fetch_one(&mut *conn)
    .await?;

    let deck = load_own_deck(&mut conn, id, user_id).await?;

    Ok((StatusCode::CREATED, Json(deck)))
}

pub async fn get_deck(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(deck_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let mut conn = pool.acquire().await?;

    let deck = load_own_deck(&mut conn, deck_id, user_id).await?;

    let cards = sqlx::query_as::<_, Card>(&format!(
        "SELECT {CARD_COLUMNS} FROM cards WHERE deck_id = $1 ORDER BY id"
    ))
    .bind(deck_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Json(serde_json::json!({ "deck": deck, "cards": cards })))
}

pub async fn update_deck(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(deck_id): Path<i64>,
    Json(payload): Json<UpdateDeckRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user_id = claims.user_id()?;

    let mut conn = pool.acquire().await?;

    let result = sqlx::query(
        r#"
        UPDATE decks
        SET title = COALESCE($1, title),
            description = COALESCE($2, description)
        WHERE id = $3 AND user_id = $4
        "#,
    )
    .bind(clean_opt(payload.title))
    .bind(clean_opt(payload.description))
    .bind(deck_id)
    .bind(user_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Deck not found".to_string()));
    }

    let deck = load_own_deck(&mut conn, deck_id, user_id).await?;
    Ok(Json(deck))
}

pub async fn delete_deck(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(deck_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let result = sqlx::query("DELETE FROM decks WHERE id = $1 AND user_id = $2")
        .bind(deck_id)
        .bind(user_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Deck not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/decks/{id}/cards",
    params(("id" = i64, Path, description = "Deck id")),
    request_body = CreateCardRequest,
    responses(
        (status = 201, description = "Card created, due immediately"),
        (status = 404, description = "Deck not found")
    ),
    security(("bearer" = [])),
    tag = "decks"
)]
pub async fn create_card(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(deck_id): Path<i64>,
    Json(payload): Json<CreateCardRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user_id = claims.user_id()?;

    let mut conn = pool.acquire().await?;
    load_own_deck(&mut conn, deck_id, user_id).await?;

    let card = sqlx::query_as::<_, Card>(&format!(
        "INSERT INTO cards (deck_id, front, back) VALUES ($1, $2, $3) RETURNING {CARD_COLUMNS}"
    ))
    .bind(deck_id)
    .bind(clean_html(&payload.front))
    .bind(clean_html(&payload.back))
    .fetch_one(&mut *conn)
    .await?;

    Ok((StatusCode::CREATED, Json(card)))
}

pub async fn update_card(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(card_id): Path<i64>,
    Json(payload): Json<UpdateCardRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user_id = claims.user_id()?;

    let mut conn = pool.acquire().await?;
    load_own_card(&mut conn, card_id, user_id).await?;

    let card = sqlx::query_as::<_, Card>(&format!(
        r#"
        UPDATE cards
        SET front = COALESCE($1, front),
            back = COALESCE($2, back)
        WHERE id = $3
        RETURNING {CARD_COLUMNS}
        "#
    ))
    .bind(clean_opt(payload.front))
    .bind(clean_opt(payload.back))
    .bind(card_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(Json(card))
}

pub async fn delete_card(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(card_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let result = sqlx::query(
        "DELETE FROM cards c USING decks d WHERE c.deck_id = d.id AND c.id = $1 AND d.user_id = $2",
    )
    .bind(card_id)
    .bind(user_id)
    .execute(&pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Card not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Cards of a deck that are due now, oldest due first.
#[utoipa::path(
    get,
    path = "/api/decks/{id}/due",
    params(("id" = i64, Path, description = "Deck id")),
    responses(
        (status = 200, description = "Due cards"),
        (status = 404, description = "Deck not found")
    ),
    security(("bearer" = [])),
    tag = "decks"
)]
pub async fn due_cards(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(deck_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let mut conn = pool.acquire().await?;
    load_own_deck(&mut conn, deck_id, user_id).await?;

    let cards = sqlx::query_as::<_, Card>(&format!(
        "SELECT {CARD_COLUMNS} FROM cards WHERE deck_id = $1 AND due_at <= NOW() ORDER BY due_at, id"
    ))
    .bind(deck_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Json(cards))
}

/// Grades recall of a card and reschedules it.
///
/// Every review is logged and earns a small XP reward, which also feeds the
/// `cards_reviewed` badge rule.
#[utoipa::path(
    post,
    path = "/api/decks/cards/{id}/review",
    params(("id" = i64, Path, description = "Card id")),
    request_body = ReviewCardRequest,
    responses(
        (status = 200, description = "Card rescheduled"),
        (status = 400, description = "Quality outside 0-5"),
        (status = 404, description = "Card not found")
    ),
    security(("bearer" = [])),
    tag = "decks"
)]
pub async fn review_card(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(card_id): Path<i64>,
    Json(payload): Json<ReviewCardRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user_id = claims.user_id()?;

    let mut tx = pool.begin().await?;

    let card = load_own_card(&mut tx, card_id, user_id).await?;
    let next = srs::review(&card.schedule(), payload.quality, Utc::now());

    let card = sqlx::query_as::<_, Card>(&format!(
        r#"
        UPDATE cards
        SET ease_factor = $1, interval_days = $2, repetitions = $3, due_at = $4
        WHERE id = $5
        RETURNING {CARD_COLUMNS}
        "#
    ))
    .bind(next.ease_factor)
    .bind(next.interval_days)
    .bind(next.repetitions)
    .bind(next.due_at)
    .bind(card_id)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO card_reviews (card_id, user_id, quality) VALUES ($1, $2, $3)")
        .bind(card_id)
        .bind(user_id)
        .bind(i16::from(payload.quality))
        .execute(&mut *tx)
        .await?;

    let award = rewards::award_xp(&mut tx, user_id, CARD_REVIEW_XP, 0).await?;
    rewards::touch_streak(&mut tx, user_id, rewards::today()).await?;
    let new_badges = rewards::unlock_badges(&mut tx, user_id).await?;

    tx.commit().await?;

    Ok(Json(serde_json::json!({
        "card": card,
        "xp_earned": CARD_REVIEW_XP,
        "total_xp": award.total_xp,
        "level": award.level,
        "leveled_up": award.leveled_up(),
        "new_badges": new_badges,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_columns_are_qualified_for_joins() {
        let cols = qualified_card_columns();
        assert!(cols.starts_with("c.id, c.deck_id"));
        assert!(cols.ends_with("c.due_at"));
        assert!(!cols.contains(" id"));
    }
}
