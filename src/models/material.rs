// src/models/material.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_PROCESSED: &str = "processed";
pub const STATUS_FAILED: &str = "failed";

/// Represents the 'materials' table: source text uploaded to the studio.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Material {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub source_text: String,
    /// 'pending', 'processed' or 'failed'.
    pub status: String,
    pub summary: Option<String>,
    pub deck_id: Option<i64>,
    pub quiz_id: Option<i64>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

pub const MATERIAL_COLUMNS: &str = "id, user_id, title, source_text, status, summary, deck_id, \
     quiz_id, error, created_at, processed_at";

/// Listing row without the (possibly large) source text.
#[derive(Debug, Serialize, FromRow)]
pub struct MaterialSummary {
    pub id: i64,
    pub title: String,
    pub status: String,
    pub deck_id: Option<i64>,
    pub quiz_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateMaterialRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 50, max = 50000))]
    pub text: String,
}
