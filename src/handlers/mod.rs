// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod badges;
pub mod decks;
pub mod health;
pub mod leaderboard;
pub mod live;
pub mod profile;
pub mod quiz;
pub mod shop;
pub mod studio;
pub mod tournaments;
pub mod tracks;

/// Clamps a client-supplied page size into `1..=max`.
pub(crate) fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).clamp(1, max)
}
