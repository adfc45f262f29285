// src/models/tournament.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

/// Represents the 'tournaments' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Tournament {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub quiz_id: i64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub prize_coins: i64,
    pub prize_awarded: bool,
}

pub const TOURNAMENT_COLUMNS: &str =
    "id, name, description, quiz_id, starts_at, ends_at, prize_coins, prize_awarded";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TournamentStatus {
    Upcoming,
    Active,
    Finished,
}

impl Tournament {
    /// Status derived from the tournament window; `ends_at` is exclusive.
    pub fn status_at(&self, now: DateTime<Utc>) -> TournamentStatus {
        if now < self.starts_at {
            TournamentStatus::Upcoming
        } else if now < self.ends_at {
            TournamentStatus::Active
        } else {
            TournamentStatus::Finished
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TournamentView {
    #[serde(flatten)]
    pub tournament: Tournament,
    pub status: TournamentStatus,
    pub participants: i64,
}

#[derive(Debug, Serialize, FromRow)]
pub struct Standing {
    pub user_id: i64,
    pub username: String,
    pub best_score: Option<i32>,
    pub best_duration_secs: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct TournamentDetail {
    #[serde(flatten)]
    pub view: TournamentView,
    pub standings: Vec<Standing>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[validate(schema(function = validate_window))]
pub struct CreateTournamentRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub description: String,
    pub quiz_id: i64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[validate(range(min = 0, max = 1_000_000))]
    #[serde(default)]
    pub prize_coins: i64,
}

fn validate_window(req: &CreateTournamentRequest) -> Result<(), ValidationError> {
    if req.ends_at <= req.starts_at {
        return Err(ValidationError::new("ends_before_start"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn status_follows_window() {
        let now = Utc::now();
        let t = Tournament {
            id: 1,
            name: "Spring Cup".into(),
            description: String::new(),
            quiz_id: 1,
            starts_at: now,
            ends_at: now + Duration::hours(1),
            prize_coins: 100,
            prize_awarded: false,
        };
        assert_eq!(t.status_at(now - Duration::seconds(1)), TournamentStatus::Upcoming);
        assert_eq!(t.status_at(now), TournamentStatus::Active);
        assert_eq!(t.status_at(t.ends_at), TournamentStatus::Finished);
    }

    #[test]
    fn window_must_be_positive() {
        let now = Utc::now();
        let req = CreateTournamentRequest {
            name: "Cup".into(),
            description: String::new(),
            quiz_id: 1,
            starts_at: now,
            ends_at: now,
            prize_coins: 0,
        };
        assert!(req.validate().is_err());
    }
}
