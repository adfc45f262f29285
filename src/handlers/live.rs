// src/handlers/live.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use sqlx::PgPool;

use crate::{
    config::{CHALLENGE_WIN_XP, PAGE_DEFAULT_LIMIT, PAGE_MAX_LIMIT},
    error::AppError,
    handlers::clamp_limit,
    live::{
        hub::{ChallengeOutcome, LiveError, LiveHub},
        protocol::{ClientMessage, ServerMessage},
    },
    models::{attempt::HistoryParams, challenge::ChallengeRecord},
    rewards,
    state::AppState,
    utils::{
        html::clean_html,
        jwt::{Claims, verify_jwt},
    },
};

const MAX_ROOM_MESSAGE_CHARS: usize = 500;

#[derive(Debug, Deserialize)]
pub struct LiveParams {
    pub token: String,
}

/// Upgrades to the live WebSocket. Browsers cannot set headers on the
/// handshake, so the JWT travels in the `token` query parameter.
pub async fn live_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<LiveParams>,
) -> Result<impl IntoResponse, AppError> {
    let claims = verify_jwt(&params.token, &state.config.jwt_secret)?;
    let user_id = claims.user_id()?;

    let username: String = sqlx::query_scalar("SELECT username FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(AppError::AuthError("User no longer exists".to_string()))?;

    Ok(ws.on_upgrade(move |socket| run_session(socket, state, user_id, username)))
}

async fn run_session(socket: WebSocket, state: AppState, user_id: i64, username: String) {
    let (conn_id, mut outbound) = state.live.connect(user_id, &username);
    tracing::info!(user_id, %conn_id, "live socket connected");

    let (mut sink, mut stream) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = outbound.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("Failed to encode live frame: {:?}", e);
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(frame)) = stream.next().await {
            match frame {
                Message::Text(text) => handle_frame(&recv_state, user_id, text.as_str()).await,
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Whichever side stops first ends the session; the outbound side also
    // stops when a newer socket for the same user takes over.
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    for outcome in state.live.disconnect(user_id, conn_id) {
        record_outcome(state.pool.clone(), outcome).await;
    }
    tracing::info!(user_id, %conn_id, "live socket closed");
}

fn reply_error(hub: &LiveHub, user_id: i64, message: impl Into<String>) {
    hub.send(
        user_id,
        ServerMessage::Error {
            message: message.into(),
        },
    );
}

async fn quiz_is_published(pool: &PgPool, quiz_id: i64) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM quizzes WHERE id = $1 AND is_published = TRUE)")
        .bind(quiz_id)
        .fetch_one(pool)
        .await
}

async fn handle_frame(state: &AppState, user_id: i64, raw: &str) {
    let hub = state.live.as_ref();

    let msg: ClientMessage = match serde_json::from_str(raw) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::debug!(user_id, error = %e, "unparseable live frame");
            reply_error(hub, user_id, "Invalid message");
            return;
        }
    };

    let result: Result<(), LiveError> = match msg {
        ClientMessage::Invite { to_user_id, quiz_id } => {
            match quiz_is_published(&state.pool, quiz_id).await {
                Ok(true) => hub.invite(user_id, to_user_id, quiz_id).map(|_| ()),
                Ok(false) => {
                    reply_error(hub, user_id, "Quiz not found");
                    return;
                }
                Err(e) => {
                    tracing::error!("Database error: {:?}", e);
                    reply_error(hub, user_id, "Internal server error");
                    return;
                }
            }
        }
        ClientMessage::Accept { challenge_id } => hub.accept(user_id, challenge_id),
        ClientMessage::Decline { challenge_id } => hub.decline(user_id, challenge_id),
        ClientMessage::Cancel { challenge_id } => hub.cancel(user_id, challenge_id),
        ClientMessage::Finish {
            challenge_id,
            score,
            duration_secs,
        } => match hub.finish(user_id, challenge_id, score, duration_secs) {
            Ok(Some(outcome)) => {
                // Detached so closing the socket right after `finish` cannot cancel the write.
                tokio::spawn(record_outcome(state.pool.clone(), outcome));
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        },
        ClientMessage::RoomMessage { challenge_id, text } => {
            let text = clean_html(text.trim());
            if text.is_empty() || text.chars().count() > MAX_ROOM_MESSAGE_CHARS {
                reply_error(hub, user_id, "Message must be 1-500 characters");
                return;
            }
            hub.room_message(user_id, challenge_id, &text)
        }
        ClientMessage::Ping => {
            hub.send(user_id, ServerMessage::Pong);
            Ok(())
        }
    };

    if let Err(e) = result {
        reply_error(hub, user_id, e.message());
    }
}

/// Stores a finished challenge and rewards the winner.
///
/// Runs after the result frames were sent; failures are logged only.
async fn record_outcome(pool: PgPool, outcome: ChallengeOutcome) {
    if let Err(e) = persist_outcome(&pool, &outcome).await {
        tracing::error!(challenge_id = %outcome.challenge_id, "Failed to record challenge: {:?}", e);
    }
}

pub async fn persist_outcome(pool: &PgPool, outcome: &ChallengeOutcome) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO challenges
            (id, quiz_id, challenger_id, opponent_id, challenger_score, opponent_score, winner_id, outcome)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(outcome.challenge_id)
    .bind(outcome.quiz_id)
    .bind(outcome.challenger_id)
    .bind(outcome.opponent_id)
    .bind(outcome.challenger_score)
    .bind(outcome.opponent_score)
    .bind(outcome.winner_id)
    .bind(outcome.outcome.as_str())
    .execute(&mut *tx)
    .await?;

    if let Some(winner_id) = outcome.winner_id {
        rewards::award_xp(&mut tx, winner_id, CHALLENGE_WIN_XP, 0).await?;
        rewards::unlock_badges(&mut tx, winner_id).await?;
    }

    tx.commit().await?;

    tracing::info!(
        challenge_id = %outcome.challenge_id,
        winner_id = ?outcome.winner_id,
        outcome = outcome.outcome.as_str(),
        "challenge recorded"
    );
    Ok(())
}

/// Users currently connected to the live socket.
pub async fn online_users(State(hub): State<Arc<LiveHub>>) -> impl IntoResponse {
    Json(hub.online_users())
}

/// Finished challenges the current user took part in, newest first.
pub async fn my_challenges(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let limit = clamp_limit(params.limit, PAGE_DEFAULT_LIMIT, PAGE_MAX_LIMIT);

    let records = sqlx::query_as::<_, ChallengeRecord>(
        r#"
        SELECT id, quiz_id, challenger_id, opponent_id, challenger_score, opponent_score,
               winner_id, outcome, finished_at
        FROM challenges
        WHERE (challenger_id = $1 OR opponent_id = $1)
          AND ($2::TIMESTAMPTZ IS NULL OR finished_at < $2)
        ORDER BY finished_at DESC
        LIMIT $3
        "#,
    )
    .bind(user_id)
    .bind(params.cursor)
    .bind(limit)
    .fetch_all(&pool)
    .await?;

    Ok(Json(records))
}
