// src/models/badge.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::{gamification::BadgeRule, utils::validate::validate_url_string};

/// Represents the 'badges' table: the unlockable achievement catalog.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Badge {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: String,
    pub icon_url: Option<String>,
    /// One of the [`BadgeRule`] names.
    pub rule_kind: String,
    pub threshold: i64,
}

pub const BADGE_COLUMNS: &str = "id, code, name, description, icon_url, rule_kind, threshold";

/// Badge owned by a user.
#[derive(Debug, Serialize, FromRow)]
pub struct UnlockedBadge {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: String,
    pub icon_url: Option<String>,
    pub unlocked_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBadgeRequest {
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 1000))]
    #[serde(default)]
    pub description: String,
    #[validate(custom(function = validate_url_string))]
    pub icon_url: Option<String>,
    #[validate(custom(function = validate_rule_kind))]
    pub rule_kind: String,
    #[validate(range(min = 0))]
    pub threshold: i64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBadgeRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(custom(function = validate_url_string))]
    pub icon_url: Option<String>,
    #[validate(custom(function = validate_rule_kind))]
    pub rule_kind: Option<String>,
    #[validate(range(min = 0))]
    pub threshold: Option<i64>,
}

fn validate_rule_kind(kind: &str) -> Result<(), ValidationError> {
    if BadgeRule::parse(kind).is_none() {
        return Err(ValidationError::new("invalid_rule_kind"));
    }
    Ok(())
}
