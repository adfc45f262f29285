// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::{gamification::LevelProgress, utils::validate::validate_username};

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique username.
    pub username: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    /// User role: 'user' or 'admin'.
    pub role: String,

    pub display_name: Option<String>,
    pub bio: Option<String>,

    pub xp: i64,
    pub level: i32,
    pub coins: i64,
    pub streak_days: i32,
    pub last_active_on: Option<chrono::NaiveDate>,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Column list matching [`User`], shared by every query that loads a full row.
pub const USER_COLUMNS: &str = "id, username, password, role, display_name, bio, xp, level, \
     coins, streak_days, last_active_on, created_at";

/// Item currently equipped by a user, shown on the profile.
#[derive(Debug, Serialize, FromRow)]
pub struct EquippedItem {
    pub item_id: i64,
    pub name: String,
    pub kind: String,
    pub image_url: Option<String>,
}

/// Aggregated user profile data for the current user.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: User,
    pub level_progress: LevelProgress,
    pub attempts_count: i64,
    pub badges_count: i64,
    pub equipped: Vec<EquippedItem>,
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(
        length(
            min = 3,
            max = 30,
            message = "Username length must be between 3 and 30 characters."
        ),
        custom(function = validate_username)
    )]
    pub username: String,
    #[validate(length(
        min = 6,
        max = 128,
        message = "Password length must be between 6 and 128 characters."
    ))]
    pub password: String,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 30))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// DTO for a user editing their own profile.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 50))]
    pub display_name: Option<String>,
    #[validate(length(max = 500))]
    pub bio: Option<String>,
}
