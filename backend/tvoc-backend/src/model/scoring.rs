//! The award and streak policy.
//!
//! The numbers are a fixed policy, not configuration.

use chrono::{DateTime, Duration, NaiveTime, Utc};

pub const DIAMONDS_PER_CORRECT_ANSWER: i32 = 2;
pub const XP_PER_CORRECT_ANSWER: i32 = 10;
pub const FAST_FINISH_SECONDS: i32 = 60;
pub const FAST_FINISH_DIAMOND_BONUS: i32 = 5;
pub const PERFECT_SCORE_DIAMOND_BONUS: i32 = 10;
pub const PERFECT_SCORE_XP_BONUS: i32 = 20;

/// The diamonds and experience awarded for a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameAward {
    pub diamonds: i32,
    pub xp: i32,
}

/// Compute the award for a finished game.
///
/// Expects validated input: `0 < total_questions`,
/// `0 <= correct_answers <= total_questions`, and `total_questions` bounded
/// to the configured maximum question count, which keeps the arithmetic
/// from overflowing.
pub fn compute_award(total_questions: i32, correct_answers: i32, time_spent_seconds: i32) -> GameAward {
    let perfect = correct_answers == total_questions;

    let mut diamonds = DIAMONDS_PER_CORRECT_ANSWER * correct_answers;
    if time_spent_seconds < FAST_FINISH_SECONDS {
        diamonds += FAST_FINISH_DIAMOND_BONUS;
    }
    if perfect {
        diamonds += PERFECT_SCORE_DIAMOND_BONUS;
    }

    let mut xp = XP_PER_CORRECT_ANSWER * correct_answers;
    if perfect {
        xp += PERFECT_SCORE_XP_BONUS;
    }

    GameAward { diamonds, xp }
}

/// The award for a single arranged sentence.
/// A correct arrangement earns the per-correct-answer rate, an incorrect one nothing.
pub fn arrangement_award(correct: bool) -> GameAward {
    if correct {
        GameAward {
            diamonds: DIAMONDS_PER_CORRECT_ANSWER,
            xp: XP_PER_CORRECT_ANSWER,
        }
    } else {
        GameAward { diamonds: 0, xp: 0 }
    }
}

/// Advance a streak after a game played at `now`.
///
/// Days are UTC calendar days: the first game ever starts a streak of one,
/// another game on the same day leaves it unchanged, a game on the day after
/// the previous one extends it, and any longer gap resets it to one.
///
/// Returns the new `(current_streak, longest_streak)` pair.
pub fn advance_streak(
    current_streak: i32,
    longest_streak: i32,
    last_played_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> (i32, i32) {
    let current_streak = match last_played_at {
        None => 1,
        Some(last_played_at) => {
            let last_day = last_played_at.date_naive();
            let today = now.date_naive();

            if last_day == today {
                current_streak.max(1)
            } else if last_day.succ_opt() == Some(today) {
                current_streak + 1
            } else {
                1
            }
        }
    };

    (current_streak, longest_streak.max(current_streak))
}

/// The point in time before which a last game means the streak is broken.
///
/// A user who last played before the start of yesterday (UTC) can no longer
/// extend their streak today, so it is reset to zero by maintenance.
pub fn streak_expiry_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    let yesterday = (now - Duration::days(1)).date_naive();
    yesterday.and_time(NaiveTime::MIN).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_award_per_correct_answer() {
        let award = compute_award(10, 4, 300);
        assert_eq!(award, GameAward { diamonds: 8, xp: 40 });
    }

    #[test]
    fn test_award_fast_finish_bonus() {
        let award = compute_award(10, 4, 59);
        assert_eq!(award, GameAward { diamonds: 13, xp: 40 });
    }

    #[test]
    fn test_award_perfect_score_bonus() {
        let award = compute_award(5, 5, 300);
        assert_eq!(
            award,
            GameAward {
                diamonds: 20,
                xp: 70
            }
        );
    }

    #[test]
    fn test_award_fast_and_perfect() {
        let award = compute_award(5, 5, 30);
        assert_eq!(
            award,
            GameAward {
                diamonds: 25,
                xp: 70
            }
        );
    }

    #[test]
    fn test_award_nothing_correct() {
        let award = compute_award(5, 0, 300);
        assert_eq!(award, GameAward { diamonds: 0, xp: 0 });
    }

    #[test]
    fn test_arrangement_award() {
        assert_eq!(
            arrangement_award(true),
            GameAward {
                diamonds: 2,
                xp: 10
            }
        );
        assert_eq!(arrangement_award(false), GameAward { diamonds: 0, xp: 0 });
    }

    #[test]
    fn test_first_game_starts_streak() {
        assert_eq!(advance_streak(0, 0, None, utc(2024, 3, 10, 12)), (1, 1));
    }

    #[test]
    fn test_same_day_keeps_streak() {
        let last = utc(2024, 3, 10, 8);
        let now = utc(2024, 3, 10, 23);
        assert_eq!(advance_streak(4, 7, Some(last), now), (4, 7));
    }

    #[test]
    fn test_next_day_extends_streak() {
        let last = utc(2024, 3, 10, 23);
        let now = utc(2024, 3, 11, 1);
        assert_eq!(advance_streak(7, 7, Some(last), now), (8, 8));
    }

    #[test]
    fn test_gap_resets_streak() {
        let last = utc(2024, 3, 10, 12);
        let now = utc(2024, 3, 13, 12);
        assert_eq!(advance_streak(7, 9, Some(last), now), (1, 9));
    }

    #[test]
    fn test_streak_crosses_month_boundary() {
        let last = utc(2024, 2, 29, 23);
        let now = utc(2024, 3, 1, 0);
        assert_eq!(advance_streak(2, 2, Some(last), now), (3, 3));
    }

    #[test]
    fn test_expiry_cutoff_is_start_of_yesterday() {
        let now = utc(2024, 3, 10, 15);
        assert_eq!(streak_expiry_cutoff(now), utc(2024, 3, 9, 0));

        // Playing late yesterday keeps the streak alive.
        assert!(utc(2024, 3, 9, 23) >= streak_expiry_cutoff(now));
        // Playing the day before yesterday does not.
        assert!(utc(2024, 3, 8, 23) < streak_expiry_cutoff(now));
    }
}
