//! SM-2 spaced repetition scheduling for study cards.

use chrono::{DateTime, Duration, Utc};

pub const MIN_EASE_FACTOR: f64 = 1.3;
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;
/// Longest gap between two reviews, about a century.
pub const MAX_INTERVAL_DAYS: i32 = 36_500;

/// Scheduling state carried by each card.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Schedule {
    pub ease_factor: f64,
    pub interval_days: i32,
    pub repetitions: i32,
    pub due_at: DateTime<Utc>,
}

/// Next schedule after a review graded `quality` (0 = blackout, 5 = perfect).
///
/// Grades below 3 reset the repetition count and make the card due again
/// immediately; the ease factor is still adjusted and never drops below 1.3.
/// Intervals are capped at `MAX_INTERVAL_DAYS`.
pub fn review(current: &Schedule, quality: u8, now: DateTime<Utc>) -> Schedule {
    let q = f64::from(quality.min(5));

    let ease_factor = (current.ease_factor + (0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02)))
        .max(MIN_EASE_FACTOR);

    let (interval_days, repetitions) = if q < 3.0 {
        (0, 0)
    } else {
        let repetitions = current.repetitions.saturating_add(1);
        let interval = match repetitions {
            1 => 1,
            2 => 6,
            _ => (f64::from(current.interval_days) * ease_factor)
                .round()
                .min(f64::from(MAX_INTERVAL_DAYS)) as i32,
        };
        (interval.clamp(0, MAX_INTERVAL_DAYS), repetitions)
    };

    Schedule {
        ease_factor,
        interval_days,
        repetitions,
        due_at: now
            .checked_add_signed(Duration::days(i64::from(interval_days)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh(now: DateTime<Utc>) -> Schedule {
        Schedule {
            ease_factor: DEFAULT_EASE_FACTOR,
            interval_days: 0,
            repetitions: 0,
            due_at: now,
        }
    }

    #[test]
    fn first_two_intervals_are_fixed() {
        let now = Utc::now();
        let first = review(&fresh(now), 4, now);
        assert_eq!(first.interval_days, 1);
        assert_eq!(first.repetitions, 1);
        assert_eq!(first.due_at, now + Duration::days(1));

        let second = review(&first, 4, now);
        assert_eq!(second.interval_days, 6);
        assert_eq!(second.repetitions, 2);
    }

    #[test]
    fn third_interval_uses_ease_factor() {
        let now = Utc::now();
        let card = Schedule {
            ease_factor: 2.5,
            interval_days: 6,
            repetitions: 2,
            due_at: now,
        };
        // quality 5 raises EF to 2.6 before it is applied.
        let next = review(&card, 5, now);
        assert_eq!(next.interval_days, 16);
        assert!((next.ease_factor - 2.6).abs() < 1e-9);
    }

    #[test]
    fn low_quality_resets_but_adjusts_ease() {
        let now = Utc::now();
        let card = Schedule {
            ease_factor: 2.5,
            interval_days: 10,
            repetitions: 5,
            due_at: now,
        };
        let next = review(&card, 2, now);
        assert_eq!(next.interval_days, 0);
        assert_eq!(next.repetitions, 0);
        assert_eq!(next.due_at, now);
        assert!(next.ease_factor < 2.5);
    }

    #[test]
    fn ease_factor_has_a_floor() {
        let now = Utc::now();
        let mut card = fresh(now);
        for _ in 0..10 {
            card = review(&card, 0, now);
        }
        assert_eq!(card.ease_factor, MIN_EASE_FACTOR);
    }

    #[test]
    fn long_perfect_streak_stays_within_cap() {
        let now = Utc::now();
        let mut card = fresh(now);
        for _ in 0..200 {
            card = review(&card, 5, now);
            assert!(card.interval_days <= MAX_INTERVAL_DAYS);
            assert!(card.due_at >= now);
        }
        assert_eq!(card.interval_days, MAX_INTERVAL_DAYS);
        assert_eq!(card.repetitions, 200);
        assert_eq!(card.due_at, now + Duration::days(i64::from(MAX_INTERVAL_DAYS)));
    }

    #[test]
    fn stored_oversized_interval_is_pulled_back() {
        let now = Utc::now();
        let card = Schedule {
            ease_factor: 4.0,
            interval_days: i32::MAX,
            repetitions: i32::MAX,
            due_at: now,
        };
        let next = review(&card, 5, now);
        assert_eq!(next.interval_days, MAX_INTERVAL_DAYS);
        assert_eq!(next.repetitions, i32::MAX);
    }

    #[test]
    fn quality_above_five_is_clamped() {
        let now = Utc::now();
        assert_eq!(review(&fresh(now), 9, now), review(&fresh(now), 5, now));
    }
}
