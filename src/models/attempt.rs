// src/models/attempt.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::models::badge::Badge;

/// Represents the 'attempts' table in the database.
/// Stores the results of user quizzes.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    pub user_id: i64,
    pub quiz_id: i64,
    /// Percentage of correct answers, 0-100.
    pub score: i32,
    pub correct_count: i32,
    pub total_questions: i32,
    pub duration_secs: i32,
    pub xp_earned: i64,
    pub coins_earned: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Attempt joined with its quiz title for the profile history.
#[derive(Debug, Serialize, FromRow)]
pub struct AttemptHistoryEntry {
    pub id: i64,
    pub quiz_id: i64,
    pub quiz_title: String,
    pub score: i32,
    pub correct_count: i32,
    pub total_questions: i32,
    pub duration_secs: i32,
    pub xp_earned: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for submitting a quiz attempt.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitAttemptRequest {
    /// User's answers map.
    /// Key: Question ID
    /// Value: User's selected option(s); comma-separated for multiple choice.
    pub answers: HashMap<i64, String>,

    /// Time the user spent, as measured by the client.
    #[serde(default)]
    pub duration_secs: i32,
}

/// Per-question feedback returned after grading.
#[derive(Debug, Serialize)]
pub struct QuestionReview {
    pub question_id: i64,
    pub given: Option<String>,
    pub correct_answer: String,
    pub is_correct: bool,
    pub analysis: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AttemptResult {
    pub attempt_id: i64,
    pub score: i32,
    pub correct_count: i32,
    pub total_questions: i32,
    pub xp_earned: i64,
    pub coins_earned: i64,
    pub total_xp: i64,
    pub level: i32,
    pub leveled_up: bool,
    pub streak_days: i32,
    pub new_badges: Vec<Badge>,
    pub review: Vec<QuestionReview>,
}

/// Query parameters for paginated history.
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    /// Cursor for pagination: the created_at timestamp of the last item in the previous page.
    pub cursor: Option<chrono::DateTime<chrono::Utc>>,

    /// Number of items to return (default: 20, max: 100).
    pub limit: Option<i64>,
}
