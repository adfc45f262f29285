// src/rewards.rs

//! Database side of gamification: applying XP and coins, keeping the streak
//! current and unlocking badges. Callers pass an open transaction so the
//! reward lands atomically with whatever earned it.

use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use sqlx::PgConnection;

use crate::{
    error::AppError,
    gamification::{self, UserStats},
    models::badge::{BADGE_COLUMNS, Badge},
};

/// XP/level state of a user after a reward was applied.
#[derive(Debug, Clone, Copy)]
pub struct Award {
    pub total_xp: i64,
    pub previous_level: i32,
    pub level: i32,
}

impl Award {
    pub fn leveled_up(&self) -> bool {
        self.level > self.previous_level
    }
}

/// Adds `xp` and `coins` to the user and recomputes their level.
pub async fn award_xp(
    conn: &mut PgConnection,
    user_id: i64,
    xp: i64,
    coins: i64,
) -> Result<Award, AppError> {
    let (current_xp, previous_level): (i64, i32) =
        sqlx::query_as("SELECT xp, level FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(AppError::NotFound("User not found".to_string()))?;

    let total_xp = (current_xp + xp.max(0)).max(0);
    let level = gamification::calculate_level(total_xp);

    sqlx::query("UPDATE users SET xp = $1, level = $2, coins = coins + $3 WHERE id = $4")
        .bind(total_xp)
        .bind(level)
        .bind(coins.max(0))
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    if level > previous_level {
        tracing::info!(user_id, level, "user leveled up");
    }

    Ok(Award {
        total_xp,
        previous_level,
        level,
    })
}

/// Records activity on `today` and returns the resulting streak.
pub async fn touch_streak(
    conn: &mut PgConnection,
    user_id: i64,
    today: NaiveDate,
) -> Result<i32, AppError> {
    let (last_active_on, current): (Option<NaiveDate>, i32) =
        sqlx::query_as("SELECT last_active_on, streak_days FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&mut *conn)
            .await?;

    let streak = gamification::next_streak(last_active_on, today, current);

    sqlx::query("UPDATE users SET streak_days = $1, last_active_on = $2 WHERE id = $3")
        .bind(streak)
        .bind(today)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    Ok(streak)
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub async fn load_stats(conn: &mut PgConnection, user_id: i64) -> Result<UserStats, AppError> {
    let stats = sqlx::query_as::<_, UserStats>(
        r#"
        SELECT
            (SELECT COUNT(DISTINCT quiz_id) FROM attempts WHERE user_id = u.id) AS quizzes_completed,
            (SELECT COUNT(*) FROM attempts WHERE user_id = u.id AND score = 100) AS perfect_scores,
            u.level,
            u.streak_days,
            u.xp,
            (SELECT COUNT(*) FROM challenges WHERE winner_id = u.id) AS challenges_won,
            (SELECT COUNT(*) FROM tournament_entries WHERE user_id = u.id) AS tournaments_joined,
            (SELECT COUNT(*) FROM card_reviews WHERE user_id = u.id) AS cards_reviewed
        FROM users u
        WHERE u.id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(stats)
}

/// Evaluates the badge catalog for the user and stores any newly met badges.
pub async fn unlock_badges(conn: &mut PgConnection, user_id: i64) -> Result<Vec<Badge>, AppError> {
    let stats = load_stats(conn, user_id).await?;

    let catalog = sqlx::query_as::<_, Badge>(&format!("SELECT {BADGE_COLUMNS} FROM badges"))
        .fetch_all(&mut *conn)
        .await?;

    let owned: HashSet<i64> =
        sqlx::query_scalar::<_, i64>("SELECT badge_id FROM user_badges WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&mut *conn)
            .await?
            .into_iter()
            .collect();

    let unlocked = gamification::check_new_badges(&stats, &catalog, &owned);

    for badge in &unlocked {
        sqlx::query(
            "INSERT INTO user_badges (user_id, badge_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(badge.id)
        .execute(&mut *conn)
        .await?;
        tracing::info!(user_id, badge = %badge.code, "badge unlocked");
    }

    Ok(unlocked)
}
