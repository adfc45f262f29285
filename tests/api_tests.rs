// tests/api_tests.rs

mod common;

use common::{spawn_app, unique_name};
use serde_json::{Value, json};

#[tokio::test]
async fn unknown_path_is_404() {
    let Some(app) = spawn_app().await else { return };

    let response = app
        .client
        .get(app.url("/random_path_that_does_not_exist"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn health_reports_ok_with_database() {
    let Some(app) = spawn_app().await else { return };

    let response = app.client.get(app.url("/api/health")).send().await.unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn register_creates_user_with_starter_coins() {
    let Some(app) = spawn_app().await else { return };
    let username = unique_name("u");

    let response = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&json!({ "username": username, "password": "password123" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 201);
    let user: Value = response.json().await.unwrap();
    assert_eq!(user["username"], username.as_str());
    assert_eq!(user["xp"], 0);
    assert_eq!(user["level"], 1);
    assert_eq!(user["coins"], 100);
    assert!(user.get("password").is_none(), "password hash must not leak");
}

#[tokio::test]
async fn register_rejects_duplicates_and_bad_input() {
    let Some(app) = spawn_app().await else { return };
    let username = unique_name("dup");
    let body = json!({ "username": username, "password": "password123" });

    let first = app.client.post(app.url("/api/auth/register")).json(&body).send().await.unwrap();
    assert_eq!(first.status().as_u16(), 201);

    let second = app.client.post(app.url("/api/auth/register")).json(&body).send().await.unwrap();
    assert_eq!(second.status().as_u16(), 409);

    for bad in [
        json!({ "username": "yo", "password": "password123" }),
        json!({ "username": "has space", "password": "password123" }),
        json!({ "username": unique_name("short"), "password": "12345" }),
    ] {
        let response = app.client.post(app.url("/api/auth/register")).json(&bad).send().await.unwrap();
        assert_eq!(response.status().as_u16(), 400, "payload {bad} should be rejected");
    }
}

#[tokio::test]
async fn login_failures_share_one_message() {
    let Some(app) = spawn_app().await else { return };
    let (_, _) = app.register_and_login("lg").await;

    let unknown = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "username": unique_name("ghost"), "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status().as_u16(), 401);
    let unknown_body: Value = unknown.json().await.unwrap();

    let username = unique_name("lg2");
    app.client
        .post(app.url("/api/auth/register"))
        .json(&json!({ "username": username, "password": "password123" }))
        .send()
        .await
        .unwrap();
    let wrong = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "username": username, "password": "not-the-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status().as_u16(), 401);
    let wrong_body: Value = wrong.json().await.unwrap();

    assert_eq!(unknown_body["error"], wrong_body["error"]);
}

#[tokio::test]
async fn login_returns_bearer_token_usable_for_profile() {
    let Some(app) = spawn_app().await else { return };
    let (user_id, token) = app.register_and_login("me").await;

    let me: Value = app
        .client
        .get(app.url("/api/profile/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(me["id"], user_id);
    assert_eq!(me["attempts_count"], 0);
    assert_eq!(me["badges_count"], 0);
    assert_eq!(me["level_progress"]["level"], 1);
    assert_eq!(me["level_progress"]["needed"], 100);
}

#[tokio::test]
async fn quiz_attempt_awards_xp_coins_and_badges() {
    let Some(app) = spawn_app().await else { return };
    let (_, token) = app.register_and_login("play").await;
    let quiz_id = app.seed_quiz("easy", 4).await;

    // The public quiz view hides answers
    let quiz: Value = app
        .client
        .get(app.url(&format!("/api/quizzes/{}", quiz_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(quiz["question_count"], 4);
    assert!(quiz["questions"][0].get("answer").is_none());

    // Perfect first run: 4 * 10 + 50 bonus
    let response = app.submit(&token, quiz_id, 4, 30).await;
    assert_eq!(response.status().as_u16(), 200);
    let result: Value = response.json().await.unwrap();
    assert_eq!(result["score"], 100);
    assert_eq!(result["xp_earned"], 90);
    assert_eq!(result["coins_earned"], 9);
    assert_eq!(result["level"], 1);
    assert_eq!(result["streak_days"], 1);
    let codes: Vec<&str> = result["new_badges"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|b| b["code"].as_str())
        .collect();
    assert!(codes.contains(&"first_quiz"));
    assert!(codes.contains(&"perfect_1"));

    // Repeat run at half rate: 2 * 10 / 2
    let result: Value = app.submit(&token, quiz_id, 2, 30).await.json().await.unwrap();
    assert_eq!(result["score"], 50);
    assert_eq!(result["xp_earned"], 10);
    assert_eq!(result["total_xp"], 100);
    assert_eq!(result["level"], 2);
    assert_eq!(result["leveled_up"], true);
    assert_eq!(result["review"][3]["is_correct"], false);

    let me: Value = app
        .client
        .get(app.url("/api/profile/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["coins"], 100 + 9 + 1);
    assert_eq!(me["attempts_count"], 2);

    let history: Vec<Value> = app
        .client
        .get(app.url("/api/profile/me/attempts?limit=1"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["score"], 50);
}

#[tokio::test]
async fn attempt_requires_auth_and_answers() {
    let Some(app) = spawn_app().await else { return };
    let quiz_id = app.seed_quiz("medium", 2).await;

    let anonymous = app
        .client
        .post(app.url(&format!("/api/quizzes/{}/attempts", quiz_id)))
        .json(&json!({ "answers": {} }))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status().as_u16(), 401);

    let (_, token) = app.register_and_login("empty").await;
    let empty = app
        .client
        .post(app.url(&format!("/api/quizzes/{}/attempts", quiz_id)))
        .bearer_auth(&token)
        .json(&json!({ "answers": {} }))
        .send()
        .await
        .unwrap();
    assert_eq!(empty.status().as_u16(), 400);

    let missing = app
        .client
        .post(app.url(&format!("/api/quizzes/{}/attempts", i64::MAX)))
        .bearer_auth(&token)
        .json(&json!({ "answers": { "1": "A" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);
}

#[tokio::test]
async fn quiz_listing_filters_by_category_and_difficulty() {
    let Some(app) = spawn_app().await else { return };
    let hard_id = app.seed_quiz("hard", 1).await;

    let quizzes: Vec<Value> = app
        .client
        .get(app.url("/api/quizzes?category=testing&difficulty=hard"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(quizzes.iter().any(|q| q["id"] == hard_id));
    assert!(quizzes.iter().all(|q| q["difficulty"] == "hard"));
}

#[tokio::test]
async fn quiz_leaderboard_keeps_best_run_per_user() {
    let Some(app) = spawn_app().await else { return };
    let quiz_id = app.seed_quiz("easy", 2).await;
    let (fast_id, fast) = app.register_and_login("fast").await;
    let (slow_id, slow) = app.register_and_login("slow").await;

    app.submit(&slow, quiz_id, 2, 90).await;
    app.submit(&fast, quiz_id, 1, 5).await;
    app.submit(&fast, quiz_id, 2, 20).await;

    let board: Vec<Value> = app
        .client
        .get(app.url(&format!("/api/leaderboard/quizzes/{}", quiz_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(board.len(), 2);
    assert_eq!(board[0]["user_id"], fast_id);
    assert_eq!(board[0]["score"], 100);
    assert_eq!(board[0]["rank"], 1);
    assert_eq!(board[1]["user_id"], slow_id);

    let global: Vec<Value> = app
        .client
        .get(app.url("/api/leaderboard?limit=500"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(global.len() <= 100);
}
