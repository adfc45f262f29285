// src/docs.rs

use axum::{Json, response::IntoResponse};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::{handlers, models};

/// OpenAPI document for the public and player-facing endpoints.
#[derive(OpenApi)]
#[openapi(
    info(title = "Quiz Arena API", description = "Gamified quiz and study platform"),
    paths(
        handlers::health::health,
        handlers::auth::register,
        handlers::auth::login,
        handlers::profile::get_me,
        handlers::quiz::list_quizzes,
        handlers::quiz::get_quiz,
        handlers::quiz::submit_attempt,
        handlers::leaderboard::global,
        handlers::badges::list_badges,
        handlers::shop::list_items,
        handlers::shop::purchase,
        handlers::tournaments::list_tournaments,
        handlers::tournaments::join,
        handlers::decks::list_decks,
        handlers::decks::create_deck,
        handlers::decks::create_card,
        handlers::decks::due_cards,
        handlers::decks::review_card,
        handlers::tracks::list_tracks,
        handlers::tracks::track_progress,
        handlers::studio::create_material,
        handlers::studio::process_material,
        handlers::studio::publish_quiz,
    ),
    components(schemas(
        models::user::CreateUserRequest,
        models::user::LoginRequest,
        models::user::UpdateProfileRequest,
        models::attempt::SubmitAttemptRequest,
        models::deck::CreateDeckRequest,
        models::deck::UpdateDeckRequest,
        models::deck::CreateCardRequest,
        models::deck::UpdateCardRequest,
        models::deck::ReviewCardRequest,
        models::material::CreateMaterialRequest,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration and login"),
        (name = "profile", description = "Current user"),
        (name = "quizzes", description = "Browsing and playing quizzes"),
        (name = "leaderboard", description = "Rankings"),
        (name = "badges", description = "Achievement catalog"),
        (name = "shop", description = "Coins, items and inventory"),
        (name = "tournaments", description = "Timed competitions"),
        (name = "decks", description = "Flashcards with spaced repetition"),
        (name = "tracks", description = "Ordered learning paths"),
        (name = "studio", description = "Study content from uploaded material"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` JWT scheme referenced by protected paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_core_paths_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/auth/register",
            "/api/quizzes/{id}/attempts",
            "/api/decks/cards/{id}/review",
            "/api/studio/materials/{id}/process",
            "/api/health",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer"));
        assert!(components.schemas.contains_key("SubmitAttemptRequest"));
    }
}
