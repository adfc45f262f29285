// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::utils::validate::validate_options;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    pub quiz_id: i64,

    /// Question type: 'single', 'multiple' or 'boolean'.
    /// Mapped from the database column 'type' since `type` is a reserved keyword in Rust.
    #[sqlx(rename = "type")]
    pub question_type: String,

    /// The text content of the question.
    pub content: String,

    /// List of options (e.g., ["Option A", "Option B"]).
    /// Stored as a JSON array in the database.
    pub options: Json<Vec<String>>,

    /// The correct answer. For 'multiple' questions, a comma-separated list.
    pub answer: String,

    /// Explanation or analysis of the correct answer.
    pub analysis: Option<String>,

    pub position: i32,
}

pub const QUESTION_COLUMNS: &str = "id, quiz_id, type, content, options, answer, analysis, position";

/// DTO for sending question to client (excludes answer and analysis).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    #[serde(rename = "type")]
    pub question_type: String,
    pub content: String,
    pub options: Json<Vec<String>>,
    pub position: i32,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            question_type: q.question_type,
            content: q.content,
            options: q.options,
            position: q.position,
        }
    }
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[validate(schema(function = validate_answer_matches_type))]
pub struct CreateQuestionRequest {
    #[validate(custom(function = validate_question_type))]
    pub question_type: String,
    #[validate(length(min = 1, max = 1000))]
    pub content: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[validate(length(min = 1, max = 500))]
    pub answer: String,
    #[validate(length(max = 2000))]
    pub analysis: Option<String>,
    #[serde(default)]
    pub position: i32,
}

/// DTO for updating a question. Fields are optional.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateQuestionRequest {
    #[validate(custom(function = validate_question_type))]
    pub question_type: Option<String>,
    #[validate(length(min = 1, max = 1000))]
    pub content: Option<String>,
    #[validate(custom(function = validate_options))]
    pub options: Option<Vec<String>>,
    #[validate(length(min = 1, max = 500))]
    pub answer: Option<String>,
    #[validate(length(max = 2000))]
    pub analysis: Option<String>,
    pub position: Option<i32>,
}

pub fn validate_question_type(q_type: &str) -> Result<(), ValidationError> {
    match q_type {
        "single" | "multiple" | "boolean" => Ok(()),
        _ => Err(ValidationError::new("invalid_question_type")),
    }
}

/// Every listed answer must be one of the options; only 'multiple' may list several.
fn validate_answer_matches_type(req: &CreateQuestionRequest) -> Result<(), ValidationError> {
    let parts: Vec<&str> = req.answer.split(',').map(str::trim).collect();
    if req.question_type != "multiple" && parts.len() != 1 {
        return Err(ValidationError::new("single_answer_expected"));
    }
    let known = |p: &str| req.options.iter().any(|o| o.trim().eq_ignore_ascii_case(p));
    if !parts.iter().all(|p| known(p)) {
        return Err(ValidationError::new("answer_not_in_options"));
    }
    Ok(())
}
