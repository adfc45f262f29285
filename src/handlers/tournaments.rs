// src/handlers/tournaments.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::{FromRow, PgPool};

use crate::{
    error::AppError,
    models::tournament::{
        Standing, TOURNAMENT_COLUMNS, Tournament, TournamentDetail, TournamentView,
    },
    rewards,
    utils::jwt::Claims,
};

#[derive(FromRow)]
struct TournamentRow {
    #[sqlx(flatten)]
    tournament: Tournament,
    participants: i64,
}

impl TournamentRow {
    fn into_view(self) -> TournamentView {
        let status = self.tournament.status_at(Utc::now());
        TournamentView {
            tournament: self.tournament,
            status,
            participants: self.participants,
        }
    }
}

fn select_with_participants() -> String {
    format!(
        "SELECT {TOURNAMENT_COLUMNS}, \
         (SELECT COUNT(*) FROM tournament_entries WHERE tournament_id = t.id) AS participants \
         FROM tournaments t"
    )
}

/// All tournaments, newest window first, with derived status.
#[utoipa::path(
    get,
    path = "/api/tournaments",
    responses((status = 200, description = "Tournaments with status")),
    tag = "tournaments"
)]
pub async fn list_tournaments(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let rows = sqlx::query_as::<_, TournamentRow>(&format!(
        "{} ORDER BY t.starts_at DESC",
        select_with_participants()
    ))
    .fetch_all(&pool)
    .await?;

    let views: Vec<TournamentView> = rows.into_iter().map(TournamentRow::into_view).collect();
    Ok(Json(views))
}

pub(crate) async fn load_standings(pool: &PgPool, tournament_id: i64) -> Result<Vec<Standing>, AppError> {
    let standings = sqlx::query_as::<_, Standing>(
        r#"
        SELECT e.user_id, u.username, e.best_score, e.best_duration_secs
        FROM tournament_entries e
        JOIN users u ON u.id = e.user_id
        WHERE e.tournament_id = $1
        ORDER BY e.best_score DESC NULLS LAST, e.best_duration_secs ASC NULLS LAST, e.joined_at ASC
        "#,
    )
    .bind(tournament_id)
    .fetch_all(pool)
    .await?;
    Ok(standings)
}

/// One tournament with its standings.
pub async fn get_tournament(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let row = sqlx::query_as::<_, TournamentRow>(&format!(
        "{} WHERE t.id = $1",
        select_with_participants()
    ))
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Tournament not found".to_string()))?;

    let standings = load_standings(&pool, id).await?;

    Ok(Json(TournamentDetail {
        view: row.into_view(),
        standings,
    }))
}

/// Registers the current user for a tournament that has not ended yet.
#[utoipa::path(
    post,
    path = "/api/tournaments/{id}/join",
    params(("id" = i64, Path, description = "Tournament id")),
    responses(
        (status = 201, description = "Joined"),
        (status = 400, description = "Tournament already finished"),
        (status = 409, description = "Already joined")
    ),
    security(("bearer" = [])),
    tag = "tournaments"
)]
pub async fn join(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let tournament = sqlx::query_as::<_, Tournament>(&format!(
        "SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Tournament not found".to_string()))?;

    if Utc::now() >= tournament.ends_at {
        return Err(AppError::BadRequest("Tournament has already finished".to_string()));
    }

    let mut tx = pool.begin().await?;

    sqlx::query("INSERT INTO tournament_entries (tournament_id, user_id) VALUES ($1, $2)")
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, "You already joined this tournament"))?;

    let new_badges = rewards::unlock_badges(&mut tx, user_id).await?;

    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "tournament_id": id, "new_badges": new_badges })),
    ))
}

/// Pays the prize to the top entry of a finished tournament, once.
pub async fn finalize(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = pool.begin().await?;

    let tournament = sqlx::query_as::<_, Tournament>(&format!(
        "SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Tournament not found".to_string()))?;

    if Utc::now() < tournament.ends_at {
        return Err(AppError::BadRequest("Tournament has not finished yet".to_string()));
    }
    if tournament.prize_awarded {
        return Err(AppError::Conflict("Prize already awarded".to_string()));
    }

    let winner: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT user_id
        FROM tournament_entries
        WHERE tournament_id = $1 AND best_score IS NOT NULL
        ORDER BY best_score DESC, best_duration_secs ASC NULLS LAST, joined_at ASC
        LIMIT 1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;

    if let Some(winner_id) = winner {
        sqlx::query("UPDATE users SET coins = coins + $1 WHERE id = $2")
            .bind(tournament.prize_coins)
            .bind(winner_id)
            .execute(&mut *tx)
            .await?;
    }

    sqlx::query("UPDATE tournaments SET prize_awarded = TRUE WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(tournament_id = id, ?winner, prize = tournament.prize_coins, "tournament finalized");

    Ok(Json(serde_json::json!({
        "tournament_id": id,
        "winner_id": winner,
        "prize_coins": tournament.prize_coins,
    })))
}
