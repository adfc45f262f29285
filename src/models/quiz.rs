// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::{models::question::PublicQuestion, utils::validate::validate_difficulty};

/// Represents the 'quizzes' table, plus the question count computed on read.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    /// 'easy', 'medium' or 'hard'.
    pub difficulty: String,
    pub time_limit_secs: Option<i32>,
    pub is_published: bool,
    pub created_by: Option<i64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub question_count: i64,
}

/// Select list producing a [`Quiz`] row from `quizzes q`.
pub const QUIZ_SELECT: &str = "SELECT q.id, q.title, q.description, q.category, q.difficulty, \
     q.time_limit_secs, q.is_published, q.created_by, q.created_at, \
     (SELECT COUNT(*) FROM questions WHERE quiz_id = q.id) AS question_count \
     FROM quizzes q";

/// Quiz as served to a player: questions without answers.
#[derive(Debug, Serialize)]
pub struct QuizDetail {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub questions: Vec<PublicQuestion>,
}

/// Query parameters for listing quizzes.
#[derive(Debug, Deserialize)]
pub struct QuizListParams {
    pub category: Option<String>,
    pub difficulty: Option<String>,
    /// Search keyword for title match.
    pub q: Option<String>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct CategoryCount {
    pub category: String,
    pub quiz_count: i64,
}

/// DTO for creating a new quiz. Quizzes start as drafts.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 5000))]
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, max = 50))]
    pub category: String,
    #[validate(custom(function = validate_difficulty))]
    pub difficulty: String,
    #[validate(range(min = 10, max = 7200))]
    pub time_limit_secs: Option<i32>,
}

/// DTO for updating a quiz. Fields are optional; publication has its own route.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub category: Option<String>,
    #[validate(custom(function = validate_difficulty))]
    pub difficulty: Option<String>,
    #[validate(range(min = 10, max = 7200))]
    pub time_limit_secs: Option<i32>,
}
