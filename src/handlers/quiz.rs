// src/handlers/quiz.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    config::Config,
    error::AppError,
    gamification::{self, Difficulty, QuizOutcome},
    models::{
        attempt::{AttemptResult, QuestionReview, SubmitAttemptRequest},
        question::{PublicQuestion, QUESTION_COLUMNS, Question},
        quiz::{CategoryCount, QUIZ_SELECT, Quiz, QuizDetail, QuizListParams},
    },
    rewards,
    utils::jwt::{Claims, optional_claims},
};

/// Splits a stored or submitted answer into its comparable parts.
///
/// Multiple-choice answers are comma-separated sets: order, case and
/// surrounding whitespace do not matter.
fn normalize_answer(question_type: &str, raw: &str) -> Vec<String> {
    if question_type == "multiple" {
        let mut parts: Vec<String> = raw
            .split(',')
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        parts.sort();
        parts.dedup();
        parts
    } else {
        vec![raw.trim().to_lowercase()]
    }
}

fn is_correct(question_type: &str, given: &str, expected: &str) -> bool {
    let given = normalize_answer(question_type, given);
    !given.iter().all(String::is_empty) && given == normalize_answer(question_type, expected)
}

/// Grades the answers against the quiz's questions.
///
/// Unanswered questions count as wrong; answers for ids outside the quiz are ignored.
fn grade(questions: &[Question], answers: &HashMap<i64, String>) -> (i32, Vec<QuestionReview>) {
    let mut correct_count = 0;
    let review = questions
        .iter()
        .map(|q| {
            let given = answers.get(&q.id).cloned();
            let ok = given
                .as_deref()
                .is_some_and(|g| is_correct(&q.question_type, g, &q.answer));
            if ok {
                correct_count += 1;
            }
            QuestionReview {
                question_id: q.id,
                given,
                correct_answer: q.answer.clone(),
                is_correct: ok,
                analysis: q.analysis.clone(),
            }
        })
        .collect();
    (correct_count, review)
}

fn score_percent(correct: i32, total: i32) -> i32 {
    if total <= 0 {
        return 0;
    }
    ((f64::from(correct) / f64::from(total)) * 100.0).round() as i32
}

/// Lists published quizzes, optionally filtered by category, difficulty and title keyword.
#[utoipa::path(
    get,
    path = "/api/quizzes",
    params(
        ("category" = Option<String>, Query, description = "Exact category"),
        ("difficulty" = Option<String>, Query, description = "easy | medium | hard"),
        ("q" = Option<String>, Query, description = "Title keyword")
    ),
    responses((status = 200, description = "Published quizzes")),
    tag = "quizzes"
)]
pub async fn list_quizzes(
    State(pool): State<PgPool>,
    Query(params): Query<QuizListParams>,
) -> Result<impl IntoResponse, AppError> {
    let search_pattern = params.q.map(|k| format!("%{}%", k));

    let quizzes = sqlx::query_as::<_, Quiz>(&format!(
        r#"
        {QUIZ_SELECT}
        WHERE q.is_published = TRUE
          AND ($1::TEXT IS NULL OR q.category = $1)
          AND ($2::TEXT IS NULL OR q.difficulty = $2)
          AND ($3::TEXT IS NULL OR q.title ILIKE $3)
        ORDER BY q.created_at DESC
        "#
    ))
    .bind(params.category)
    .bind(params.difficulty)
    .bind(search_pattern)
    .fetch_all(&pool)
    .await?;

    Ok(Json(quizzes))
}

/// Distinct categories of published quizzes with their sizes.
pub async fn list_categories(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let categories = sqlx::query_as::<_, CategoryCount>(
        r#"
        SELECT category, COUNT(*) AS quiz_count
        FROM quizzes
        WHERE is_published = TRUE
        GROUP BY category
        ORDER BY category
        "#,
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(categories))
}

/// Loads a quiz the caller may play: published, or a draft they own.
pub(crate) async fn load_playable_quiz(
    pool: &PgPool,
    quiz_id: i64,
    user_id: Option<i64>,
) -> Result<Quiz, AppError> {
    sqlx::query_as::<_, Quiz>(&format!(
        "{QUIZ_SELECT} WHERE q.id = $1 AND (q.is_published = TRUE OR q.created_by = $2)"
    ))
    .bind(quiz_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))
}

pub(crate) async fn load_questions(pool: &PgPool, quiz_id: i64) -> Result<Vec<Question>, AppError> {
    let questions = sqlx::query_as::<_, Question>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE quiz_id = $1 ORDER BY position, id"
    ))
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;
    Ok(questions)
}

/// Returns a quiz with its questions (answers hidden).
///
/// Drafts are visible to their author when a bearer token is sent.
#[utoipa::path(
    get,
    path = "/api/quizzes/{id}",
    params(("id" = i64, Path, description = "Quiz id")),
    responses(
        (status = 200, description = "Quiz with questions"),
        (status = 404, description = "Unknown quiz, or a draft of someone else")
    ),
    tag = "quizzes"
)]
pub async fn get_quiz(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let viewer = optional_claims(&headers, &config.jwt_secret).and_then(|c| c.user_id().ok());
    let quiz = load_playable_quiz(&pool, id, viewer).await?;
    let questions = load_questions(&pool, id)
        .await?
        .into_iter()
        .map(PublicQuestion::from)
        .collect();

    Ok(Json(QuizDetail { quiz, questions }))
}

/// Submits answers for a quiz and applies the rewards.
///
/// * Grades every question of the quiz.
/// * Awards XP and coins (halved on repeat attempts), updates level and streak.
/// * Updates the user's entry in any running tournament on this quiz.
/// * Unlocks badges whose rules are now met.
#[utoipa::path(
    post,
    path = "/api/quizzes/{id}/attempts",
    params(("id" = i64, Path, description = "Quiz id")),
    request_body = SubmitAttemptRequest,
    responses(
        (status = 200, description = "Graded attempt"),
        (status = 400, description = "No answers or empty quiz"),
        (status = 404, description = "Unknown quiz")
    ),
    security(("bearer" = [])),
    tag = "quizzes"
)]
pub async fn submit_attempt(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Json(req): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.answers.is_empty() {
        return Err(AppError::BadRequest("No answers submitted".to_string()));
    }
    let user_id = claims.user_id()?;

    let quiz = load_playable_quiz(&pool, quiz_id, Some(user_id)).await?;
    let questions = load_questions(&pool, quiz_id).await?;
    if questions.is_empty() {
        return Err(AppError::BadRequest("Quiz has no questions".to_string()));
    }

    let (correct_count, review) = grade(&questions, &req.answers);
    let total_questions = questions.len() as i32;
    let score = score_percent(correct_count, total_questions);
    let duration_secs = req.duration_secs.max(0);

    let mut tx = pool.begin().await?;

    let previous_attempts: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM attempts WHERE user_id = $1 AND quiz_id = $2")
            .bind(user_id)
            .bind(quiz_id)
            .fetch_one(&mut *tx)
            .await?;

    let xp_earned = gamification::calculate_xp_for_quiz(&QuizOutcome {
        correct: i64::from(correct_count),
        total: i64::from(total_questions),
        difficulty: Difficulty::parse(&quiz.difficulty).unwrap_or(Difficulty::Easy),
        duration_secs: i64::from(duration_secs),
        time_limit_secs: quiz.time_limit_secs.map(i64::from),
        attempt_number: previous_attempts + 1,
    });
    let coins_earned = gamification::coins_for_xp(xp_earned);

    let attempt_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO attempts
            (user_id, quiz_id, score, correct_count, total_questions, duration_secs, xp_earned, coins_earned)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(quiz_id)
    .bind(score)
    .bind(correct_count)
    .bind(total_questions)
    .bind(duration_secs)
    .bind(xp_earned)
    .bind(coins_earned)
    .fetch_one(&mut *tx)
    .await?;

    let award = rewards::award_xp(&mut tx, user_id, xp_earned, coins_earned).await?;
    let streak_days = rewards::touch_streak(&mut tx, user_id, rewards::today()).await?;

    // Running tournaments on this quiz keep each participant's best run.
    sqlx::query(
        r#"
        UPDATE tournament_entries e
        SET best_score = $3, best_duration_secs = $4
        FROM tournaments t
        WHERE e.tournament_id = t.id
          AND t.quiz_id = $2
          AND e.user_id = $1
          AND NOW() >= t.starts_at AND NOW() < t.ends_at
          AND (e.best_score IS NULL
               OR $3 > e.best_score
               OR ($3 = e.best_score AND $4 < e.best_duration_secs))
        "#,
    )
    .bind(user_id)
    .bind(quiz_id)
    .bind(score)
    .bind(duration_secs)
    .execute(&mut *tx)
    .await?;

    let new_badges = rewards::unlock_badges(&mut tx, user_id).await?;

    tx.commit().await?;

    tracing::info!(user_id, quiz_id, score, xp_earned, "attempt submitted");

    Ok(Json(AttemptResult {
        attempt_id,
        score,
        correct_count,
        total_questions,
        xp_earned,
        coins_earned,
        total_xp: award.total_xp,
        level: award.level,
        leveled_up: award.leveled_up(),
        streak_days,
        new_badges,
        review,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Json as SqlJson;

    fn question(id: i64, q_type: &str, answer: &str) -> Question {
        Question {
            id,
            quiz_id: 1,
            question_type: q_type.to_string(),
            content: format!("Question {id}"),
            options: SqlJson(vec!["A".into(), "B".into(), "C".into(), "D".into()]),
            answer: answer.to_string(),
            analysis: Some("because".to_string()),
            position: id as i32,
        }
    }

    #[test]
    fn single_choice_ignores_case_and_whitespace() {
        assert!(is_correct("single", "  b ", "B"));
        assert!(!is_correct("single", "C", "B"));
        assert!(!is_correct("single", "", "B"));
    }

    #[test]
    fn multiple_choice_compares_sets() {
        assert!(is_correct("multiple", "C, a", "A,C"));
        assert!(is_correct("multiple", "a,c,a", "A,C"));
        assert!(!is_correct("multiple", "A", "A,C"));
        assert!(!is_correct("multiple", "A,B,C", "A,C"));
        assert!(!is_correct("multiple", " , ", "A,C"));
    }

    #[test]
    fn grade_counts_missing_answers_as_wrong() {
        let questions = vec![
            question(1, "single", "A"),
            question(2, "multiple", "B,D"),
            question(3, "boolean", "True"),
        ];
        let mut answers = HashMap::new();
        answers.insert(1, "A".to_string());
        answers.insert(2, "D,B".to_string());
        answers.insert(99, "A".to_string()); // not in this quiz

        let (correct, review) = grade(&questions, &answers);
        assert_eq!(correct, 2);
        assert_eq!(review.len(), 3);
        assert!(review[0].is_correct);
        assert!(review[1].is_correct);
        assert!(!review[2].is_correct);
        assert_eq!(review[2].given, None);
        assert_eq!(review[2].correct_answer, "True");
    }

    #[test]
    fn score_is_a_rounded_percentage() {
        assert_eq!(score_percent(2, 3), 67);
        assert_eq!(score_percent(3, 3), 100);
        assert_eq!(score_percent(0, 5), 0);
        assert_eq!(score_percent(1, 0), 0);
    }
}
