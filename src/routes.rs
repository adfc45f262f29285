// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    docs,
    handlers::{
        admin, auth, badges, decks, health, leaderboard, live, profile, quiz, shop, studio,
        tournaments, tracks,
    },
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Assembles the main application router.
///
/// * Public browsing routes (quizzes, leaderboards, badges, shop catalog,
///   tournaments, tracks) need no token.
/// * Player routes sit behind `auth_middleware`; admin routes additionally
///   behind `admin_middleware`.
/// * The live socket authenticates itself from its `token` query parameter.
pub fn create_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let quiz_routes = Router::new()
        .route("/", get(quiz::list_quizzes))
        .route("/categories", get(quiz::list_categories))
        .route("/{id}", get(quiz::get_quiz))
        .merge(
            Router::new()
                .route("/{id}/attempts", post(quiz::submit_attempt))
                .layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        );

    let leaderboard_routes = Router::new()
        .route("/", get(leaderboard::global))
        .route("/weekly", get(leaderboard::weekly))
        .route("/quizzes/{id}", get(leaderboard::quiz));

    let badge_routes = Router::new().route("/", get(badges::list_badges));

    let shop_routes = Router::new()
        .route("/items", get(shop::list_items))
        .merge(
            Router::new()
                .route("/items/{id}/purchase", post(shop::purchase))
                .route("/inventory", get(shop::inventory))
                .route("/inventory/{id}/equip", post(shop::equip))
                .layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        );

    let profile_routes = Router::new()
        .route("/me", get(profile::get_me).put(profile::update_me))
        .route("/me/attempts", get(profile::list_my_attempts))
        .route("/me/badges", get(profile::list_my_badges))
        .route("/me/challenges", get(live::my_challenges))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let deck_routes = Router::new()
        .route("/", get(decks::list_decks).post(decks::create_deck))
        .route(
            "/{id}",
            get(decks::get_deck)
                .put(decks::update_deck)
                .delete(decks::delete_deck),
        )
        .route("/{id}/due", get(decks::due_cards))
        .route("/{id}/cards", post(decks::create_card))
        .route(
            "/cards/{id}",
            put(decks::update_card).delete(decks::delete_card),
        )
        .route("/cards/{id}/review", post(decks::review_card))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let track_routes = Router::new().route("/", get(tracks::list_tracks)).merge(
        Router::new()
            .route("/{id}/progress", get(tracks::track_progress))
            .layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
    );

    let tournament_routes = Router::new()
        .route("/", get(tournaments::list_tournaments))
        .route("/{id}", get(tournaments::get_tournament))
        .merge(
            Router::new()
                .route("/{id}/join", post(tournaments::join))
                .layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        );

    let studio_routes = Router::new()
        .route(
            "/materials",
            get(studio::list_materials).post(studio::create_material),
        )
        .route(
            "/materials/{id}",
            get(studio::get_material).delete(studio::delete_material),
        )
        .route("/materials/{id}/process", post(studio::process_material))
        .route("/quizzes/{id}/publish", post(studio::publish_quiz))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let live_routes = Router::new()
        .route("/", get(live::live_socket))
        .route("/online", get(live::online_users));

    let admin_routes = Router::new()
        .route("/stats", get(admin::stats))
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route(
            "/users/{id}",
            put(admin::update_user).delete(admin::delete_user),
        )
        .route("/quizzes", get(admin::list_quizzes).post(admin::create_quiz))
        .route(
            "/quizzes/{id}",
            get(admin::get_quiz)
                .put(admin::update_quiz)
                .delete(admin::delete_quiz),
        )
        .route("/quizzes/{id}/publish", put(admin::set_quiz_published))
        .route("/quizzes/{id}/questions", post(admin::create_question))
        .route(
            "/questions/{id}",
            put(admin::update_question).delete(admin::delete_question),
        )
        .route("/badges", post(admin::create_badge))
        .route(
            "/badges/{id}",
            put(admin::update_badge).delete(admin::delete_badge),
        )
        .route(
            "/shop/items",
            get(admin::list_shop_items).post(admin::create_shop_item),
        )
        .route(
            "/shop/items/{id}",
            put(admin::update_shop_item).delete(admin::deactivate_shop_item),
        )
        .route("/tournaments", post(admin::create_tournament))
        .route("/tournaments/{id}", delete(admin::delete_tournament))
        .route("/tournaments/{id}/finalize", post(tournaments::finalize))
        .route("/tracks", post(admin::create_track))
        .route(
            "/tracks/{id}",
            put(admin::update_track).delete(admin::delete_track),
        )
        // Auth runs first, then the admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/leaderboard", leaderboard_routes)
        .nest("/api/badges", badge_routes)
        .nest("/api/shop", shop_routes)
        .nest("/api/profile", profile_routes)
        .nest("/api/decks", deck_routes)
        .nest("/api/tracks", track_routes)
        .nest("/api/tournaments", tournament_routes)
        .nest("/api/studio", studio_routes)
        .nest("/api/live", live_routes)
        .nest("/api/admin", admin_routes)
        .route("/api/health", get(health::health))
        .route("/api/docs/openapi.json", get(docs::openapi_json))
        // Global middleware, outermost first
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
