// src/models/track.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Represents the 'skill_tracks' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SkillTrack {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
}

/// Quiz entry inside a track, in track order.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TrackQuiz {
    pub track_id: i64,
    pub quiz_id: i64,
    pub title: String,
    pub difficulty: String,
    pub position: i32,
}

#[derive(Debug, Serialize)]
pub struct TrackView {
    #[serde(flatten)]
    pub track: SkillTrack,
    pub quizzes: Vec<TrackQuiz>,
}

#[derive(Debug, Serialize)]
pub struct TrackStep {
    pub quiz_id: i64,
    pub title: String,
    pub best_score: Option<i32>,
    pub completed: bool,
}

#[derive(Debug, Serialize)]
pub struct TrackProgress {
    pub track_id: i64,
    pub completed: usize,
    pub total: usize,
    pub percent: u32,
    pub next_quiz_id: Option<i64>,
    pub steps: Vec<TrackStep>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTrackRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, max = 50))]
    pub category: String,
    /// Ordered quiz ids making up the track.
    #[validate(length(max = 100))]
    #[serde(default)]
    pub quiz_ids: Vec<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateTrackRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub category: Option<String>,
    /// Replaces the ordered quiz list when present.
    #[validate(length(max = 100))]
    pub quiz_ids: Option<Vec<i64>>,
}
