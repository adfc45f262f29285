// src/models/challenge.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Represents the 'challenges' table: finished live challenges.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ChallengeRecord {
    pub id: Uuid,
    pub quiz_id: i64,
    pub challenger_id: i64,
    pub opponent_id: i64,
    pub challenger_score: Option<i32>,
    pub opponent_score: Option<i32>,
    pub winner_id: Option<i64>,
    /// 'win', 'draw' or 'forfeit'.
    pub outcome: String,
    pub finished_at: DateTime<Utc>,
}
