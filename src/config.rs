// src/config.rs

use std::env;

use dotenvy::dotenv;

/// Minimum XP unit used by the level curve.
pub const XP_PER_LEVEL_BASE: i64 = 100;

/// Coins granted to a freshly registered account.
pub const STARTER_COINS: i64 = 100;

/// Score (percentage) at which a quiz counts as completed for skill tracks.
pub const TRACK_COMPLETION_SCORE: i32 = 60;

/// XP awarded to the winner of a live challenge.
pub const CHALLENGE_WIN_XP: i64 = 30;

/// XP awarded per reviewed study card.
pub const CARD_REVIEW_XP: i64 = 2;

pub const LEADERBOARD_DEFAULT_LIMIT: i64 = 10;
pub const LEADERBOARD_MAX_LIMIT: i64 = 100;

pub const PAGE_DEFAULT_LIMIT: i64 = 20;
pub const PAGE_MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86_400);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let server_port = env::var("SERVER_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|v| parse_origins(&v))
            .unwrap_or_else(|_| {
                vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ]
            });

        let admin_username = env::var("ADMIN_USERNAME").ok().filter(|v| !v.is_empty());
        let admin_password = env::var("ADMIN_PASSWORD").ok().filter(|v| !v.is_empty());

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            server_port,
            cors_origins,
            admin_username,
            admin_password,
        }
    }

    /// Configuration used by tests and tooling that never read the environment.
    pub fn for_tests(database_url: &str, jwt_secret: &str) -> Self {
        Self {
            database_url: database_url.to_string(),
            jwt_secret: jwt_secret.to_string(),
            jwt_expiration: 600,
            rust_log: "error".to_string(),
            server_port: 0,
            cors_origins: vec!["http://localhost:3000".to_string()],
            admin_username: None,
            admin_password: None,
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_origins_skips_blanks() {
        let origins = parse_origins(" http://a.test , ,http://b.test,");
        assert_eq!(origins, vec!["http://a.test", "http://b.test"]);
    }
}
