// src/models/deck.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::srs::Schedule;

/// Represents the 'decks' table, with card counters computed on read.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Deck {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub card_count: i64,
    pub due_count: i64,
}

pub const DECK_SELECT: &str = "SELECT d.id, d.user_id, d.title, d.description, d.created_at, \
     (SELECT COUNT(*) FROM cards WHERE deck_id = d.id) AS card_count, \
     (SELECT COUNT(*) FROM cards WHERE deck_id = d.id AND due_at <= NOW()) AS due_count \
     FROM decks d";

/// Represents the 'cards' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Card {
    pub id: i64,
    pub deck_id: i64,
    pub front: String,
    pub back: String,
    pub ease_factor: f64,
    pub interval_days: i32,
    pub repetitions: i32,
    pub due_at: DateTime<Utc>,
}

pub const CARD_COLUMNS: &str = "id, deck_id, front, back, ease_factor, interval_days, repetitions, due_at";

impl Card {
    pub fn schedule(&self) -> Schedule {
        Schedule {
            ease_factor: self.ease_factor,
            interval_days: self.interval_days,
            repetitions: self.repetitions,
            due_at: self.due_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateDeckRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateDeckRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCardRequest {
    #[validate(length(min = 1, max = 2000))]
    pub front: String,
    #[validate(length(min = 1, max = 2000))]
    pub back: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCardRequest {
    #[validate(length(min = 1, max = 2000))]
    pub front: Option<String>,
    #[validate(length(min = 1, max = 2000))]
    pub back: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReviewCardRequest {
    /// Recall quality, 0 (blackout) to 5 (perfect).
    #[validate(range(max = 5))]
    pub quality: u8,
}
