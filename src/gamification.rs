//! XP, levels, streaks and badge unlocking.
//!
//! Everything here is pure: handlers gather the numbers from the database,
//! call into this module, and persist whatever comes back.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::{config::XP_PER_LEVEL_BASE, models::badge::Badge};

const XP_PER_CORRECT: f64 = 10.0;
const PERFECT_BONUS: f64 = 50.0;
const FAST_FINISH_MULTIPLIER: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    fn multiplier(&self) -> f64 {
        match self {
            Difficulty::Easy => 1.0,
            Difficulty::Medium => 1.5,
            Difficulty::Hard => 2.0,
        }
    }
}

/// Level for a given XP total. Level 1 starts at 0 XP, level n at 100 * (n-1)^2.
pub fn calculate_level(xp: i64) -> i32 {
    if xp <= 0 {
        return 1;
    }
    let root = (xp / XP_PER_LEVEL_BASE).isqrt();
    i32::try_from(root).unwrap_or(i32::MAX - 1) + 1
}

/// Minimum XP required to be at `level`.
pub fn xp_for_level(level: i32) -> i64 {
    let steps = i64::from(level.max(1) - 1);
    XP_PER_LEVEL_BASE * steps * steps
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LevelProgress {
    pub level: i32,
    pub current_level_xp: i64,
    pub next_level_xp: i64,
    /// XP earned since reaching the current level.
    pub into_level: i64,
    /// XP still missing for the next level.
    pub needed: i64,
}

pub fn level_progress(xp: i64) -> LevelProgress {
    let xp = xp.max(0);
    let level = calculate_level(xp);
    let current_level_xp = xp_for_level(level);
    let next_level_xp = xp_for_level(level + 1);
    LevelProgress {
        level,
        current_level_xp,
        next_level_xp,
        into_level: xp - current_level_xp,
        needed: next_level_xp - xp,
    }
}

/// Inputs for scoring one graded quiz attempt.
#[derive(Debug, Clone)]
pub struct QuizOutcome {
    pub correct: i64,
    pub total: i64,
    pub difficulty: Difficulty,
    pub duration_secs: i64,
    pub time_limit_secs: Option<i64>,
    /// 1 for the user's first attempt on this quiz.
    pub attempt_number: i64,
}

pub fn calculate_xp_for_quiz(outcome: &QuizOutcome) -> i64 {
    if outcome.total <= 0 || outcome.correct <= 0 {
        return 0;
    }
    let correct = outcome.correct.min(outcome.total);

    let mut xp = correct as f64 * XP_PER_CORRECT * outcome.difficulty.multiplier();
    if correct == outcome.total {
        xp += PERFECT_BONUS;
    }
    if let Some(limit) = outcome.time_limit_secs.filter(|l| *l > 0) {
        if outcome.duration_secs >= 0 && outcome.duration_secs * 2 <= limit {
            xp *= FAST_FINISH_MULTIPLIER;
        }
    }
    if outcome.attempt_number > 1 {
        xp /= 2.0;
    }
    xp.round() as i64
}

pub fn coins_for_xp(xp: i64) -> i64 {
    xp.max(0) / 10
}

/// Consecutive-day activity streak after activity on `today`.
pub fn next_streak(last_active_on: Option<NaiveDate>, today: NaiveDate, current: i32) -> i32 {
    match last_active_on {
        Some(last) if last == today => current.max(1),
        Some(last) if last.succ_opt() == Some(today) => current + 1,
        _ => 1,
    }
}

/// Condition a badge is unlocked by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeRule {
    QuizzesCompleted,
    PerfectScores,
    LevelReached,
    StreakDays,
    XpTotal,
    ChallengesWon,
    TournamentsJoined,
    CardsReviewed,
}

impl BadgeRule {
    pub const ALL: [BadgeRule; 8] = [
        BadgeRule::QuizzesCompleted,
        BadgeRule::PerfectScores,
        BadgeRule::LevelReached,
        BadgeRule::StreakDays,
        BadgeRule::XpTotal,
        BadgeRule::ChallengesWon,
        BadgeRule::TournamentsJoined,
        BadgeRule::CardsReviewed,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == s)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeRule::QuizzesCompleted => "quizzes_completed",
            BadgeRule::PerfectScores => "perfect_scores",
            BadgeRule::LevelReached => "level_reached",
            BadgeRule::StreakDays => "streak_days",
            BadgeRule::XpTotal => "xp_total",
            BadgeRule::ChallengesWon => "challenges_won",
            BadgeRule::TournamentsJoined => "tournaments_joined",
            BadgeRule::CardsReviewed => "cards_reviewed",
        }
    }
}

/// Aggregated counters a badge rule is evaluated against.
#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct UserStats {
    pub quizzes_completed: i64,
    pub perfect_scores: i64,
    pub level: i32,
    pub streak_days: i32,
    pub xp: i64,
    pub challenges_won: i64,
    pub tournaments_joined: i64,
    pub cards_reviewed: i64,
}

impl UserStats {
    fn value_for(&self, rule: BadgeRule) -> i64 {
        match rule {
            BadgeRule::QuizzesCompleted => self.quizzes_completed,
            BadgeRule::PerfectScores => self.perfect_scores,
            BadgeRule::LevelReached => i64::from(self.level),
            BadgeRule::StreakDays => i64::from(self.streak_days),
            BadgeRule::XpTotal => self.xp,
            BadgeRule::ChallengesWon => self.challenges_won,
            BadgeRule::TournamentsJoined => self.tournaments_joined,
            BadgeRule::CardsReviewed => self.cards_reviewed,
        }
    }
}

/// Badges from `catalog` whose rule `stats` satisfies and that are not in `owned`.
pub fn check_new_badges(stats: &UserStats, catalog: &[Badge], owned: &HashSet<i64>) -> Vec<Badge> {
    catalog
        .iter()
        .filter(|badge| !owned.contains(&badge.id))
        .filter(|badge| match BadgeRule::parse(&badge.rule_kind) {
            Some(rule) => stats.value_for(rule) >= badge.threshold,
            None => false,
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn badge(id: i64, rule: &str, threshold: i64) -> Badge {
        Badge {
            id,
            code: format!("b{id}"),
            name: format!("Badge {id}"),
            description: String::new(),
            icon_url: None,
            rule_kind: rule.to_string(),
            threshold,
        }
    }

    fn outcome(correct: i64, total: i64, difficulty: Difficulty) -> QuizOutcome {
        QuizOutcome {
            correct,
            total,
            difficulty,
            duration_secs: 100,
            time_limit_secs: None,
            attempt_number: 1,
        }
    }

    #[test]
    fn level_curve_boundaries() {
        assert_eq!(calculate_level(-5), 1);
        assert_eq!(calculate_level(0), 1);
        assert_eq!(calculate_level(99), 1);
        assert_eq!(calculate_level(100), 2);
        assert_eq!(calculate_level(399), 2);
        assert_eq!(calculate_level(400), 3);
        assert_eq!(calculate_level(2_500), 6);
    }

    #[test]
    fn xp_for_level_inverts_calculate_level() {
        for level in 1..50 {
            assert_eq!(calculate_level(xp_for_level(level)), level);
            assert_eq!(calculate_level(xp_for_level(level + 1) - 1), level);
        }
    }

    #[test]
    fn level_progress_midway() {
        let p = level_progress(250);
        assert_eq!(p.level, 2);
        assert_eq!(p.current_level_xp, 100);
        assert_eq!(p.next_level_xp, 400);
        assert_eq!(p.into_level, 150);
        assert_eq!(p.needed, 150);
    }

    #[test]
    fn quiz_xp_scales_with_difficulty() {
        assert_eq!(calculate_xp_for_quiz(&outcome(3, 5, Difficulty::Easy)), 30);
        assert_eq!(calculate_xp_for_quiz(&outcome(3, 5, Difficulty::Medium)), 45);
        assert_eq!(calculate_xp_for_quiz(&outcome(3, 5, Difficulty::Hard)), 60);
    }

    #[test]
    fn perfect_fast_and_repeat_modifiers() {
        let mut o = outcome(10, 10, Difficulty::Medium);
        assert_eq!(calculate_xp_for_quiz(&o), 200);

        o.time_limit_secs = Some(300);
        o.duration_secs = 150;
        assert_eq!(calculate_xp_for_quiz(&o), 240);

        o.duration_secs = 151;
        assert_eq!(calculate_xp_for_quiz(&o), 200);

        o.attempt_number = 2;
        assert_eq!(calculate_xp_for_quiz(&o), 100);
    }

    #[test]
    fn zero_questions_or_zero_correct_earn_nothing() {
        assert_eq!(calculate_xp_for_quiz(&outcome(0, 0, Difficulty::Hard)), 0);
        assert_eq!(calculate_xp_for_quiz(&outcome(0, 8, Difficulty::Hard)), 0);
    }

    #[test]
    fn coins_are_a_tenth_of_xp() {
        assert_eq!(coins_for_xp(245), 24);
        assert_eq!(coins_for_xp(-10), 0);
    }

    #[test]
    fn streak_rules() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        let long_ago = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();

        assert_eq!(next_streak(None, today, 0), 1);
        assert_eq!(next_streak(Some(today), today, 4), 4);
        assert_eq!(next_streak(Some(yesterday), today, 4), 5);
        assert_eq!(next_streak(Some(long_ago), today, 9), 1);
    }

    #[test]
    fn badges_unlock_once() {
        let catalog = vec![
            badge(1, "quizzes_completed", 1),
            badge(2, "quizzes_completed", 10),
            badge(3, "level_reached", 2),
            badge(4, "mystery_rule", 0),
        ];
        let stats = UserStats {
            quizzes_completed: 1,
            level: 2,
            ..Default::default()
        };

        let unlocked: Vec<i64> = check_new_badges(&stats, &catalog, &HashSet::new())
            .iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(unlocked, vec![1, 3]);

        let owned: HashSet<i64> = [1].into_iter().collect();
        let unlocked: Vec<i64> = check_new_badges(&stats, &catalog, &owned)
            .iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(unlocked, vec![3]);
    }

    #[test]
    fn rule_names_round_trip() {
        for rule in BadgeRule::ALL {
            assert_eq!(BadgeRule::parse(rule.as_str()), Some(rule));
        }
        assert_eq!(Difficulty::parse("extreme"), None);
    }
}
