//! # Derived Statistics
//!
//! Pure functions over `(habits, completions, today)`. Nothing here is cached:
//! the tracker calls these on every read so the view can never lag a mutation.
//!
//! ## Streak Walk
//!
//! [`calculate_streak`] walks a habit's completion days from newest to oldest:
//!
//! 1. The newest day seeds the running streak at 1. If it is today or
//!    yesterday the current streak is seeded at 1 as well (the streak is
//!    "live"); otherwise the current streak stays 0.
//! 2. A one-day gap to the previously visited day extends the running streak,
//!    and the current streak too while it is still live.
//! 3. Any other gap folds the running streak into the longest, restarts the
//!    running streak at 1 and ends the live run. The current streak keeps
//!    whatever it had reached; it is never reset to 0.
//! 4. The longest streak is the maximum of the folded runs, the final running
//!    streak and the current streak.

use crate::model::{Completion, Habit, HabitWithStats};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Streak {
    pub current: u32,
    pub longest: u32,
}

/// Computes the current and longest streak for one habit's completion days.
///
/// `dates` may arrive in any order; duplicates are ignored.
pub fn calculate_streak<I>(dates: I, today: NaiveDate) -> Streak
where
    I: IntoIterator<Item = NaiveDate>,
{
    let mut days: Vec<NaiveDate> = dates.into_iter().collect();
    days.sort_unstable_by(|a, b| b.cmp(a));
    days.dedup();

    let Some((&newest, older)) = days.split_first() else {
        return Streak::default();
    };

    let yesterday = today.pred_opt();
    let mut live = newest == today || Some(newest) == yesterday;
    let mut current = u32::from(live);
    let mut longest = 0;
    let mut running = 1;
    let mut previous = newest;

    for &day in older {
        let gap = (previous - day).num_days();
        if gap == 1 {
            running += 1;
            if live {
                current += 1;
            }
        } else {
            longest = longest.max(running);
            running = 1;
            live = false;
        }
        previous = day;
    }

    Streak {
        current,
        longest: longest.max(running).max(current),
    }
}

/// Joins every habit with its statistics, preserving habit order.
pub fn habits_with_stats(
    habits: &[Habit],
    completions: &[Completion],
    today: NaiveDate,
) -> Vec<HabitWithStats> {
    let mut by_habit: HashMap<&str, Vec<NaiveDate>> = HashMap::new();
    for completion in completions {
        by_habit
            .entry(completion.habit_id.as_str())
            .or_default()
            .push(completion.date);
    }

    habits
        .iter()
        .map(|habit| {
            let dates = by_habit.get(habit.id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
            let streak = calculate_streak(dates.iter().copied(), today);
            HabitWithStats {
                habit: habit.clone(),
                current_streak: streak.current,
                longest_streak: streak.longest,
                completed_today: dates.contains(&today),
                total_completions: dates.len() as u32,
            }
        })
        .collect()
}

/// Roll-up numbers shown above the history calendar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_completions: u32,
    pub best_streak: u32,
    pub active_habits: u32,
    pub completed_today: u32,
}

pub fn summarize(stats: &[HabitWithStats]) -> Summary {
    Summary {
        total_completions: stats.iter().map(|h| h.total_completions).sum(),
        best_streak: stats.iter().map(|h| h.longest_streak).max().unwrap_or(0),
        active_habits: stats.len() as u32,
        completed_today: stats.iter().filter(|h| h.completed_today).count() as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn days_ago(offsets: &[i64]) -> Vec<NaiveDate> {
        offsets
            .iter()
            .map(|n| today() - Duration::days(*n))
            .collect()
    }

    fn habit(id: &str) -> Habit {
        Habit::new(
            id.to_string(),
            format!("Habit {id}"),
            "#4ECDC4".to_string(),
            Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap(),
        )
    }

    #[test]
    fn empty_history_has_no_streaks() {
        assert_eq!(calculate_streak(Vec::new(), today()), Streak::default());
    }

    #[test]
    fn consecutive_days_ending_today() {
        let streak = calculate_streak(days_ago(&[0, 1, 2]), today());
        assert_eq!(streak, Streak { current: 3, longest: 3 });
    }

    #[test]
    fn run_ending_yesterday_is_still_live() {
        let streak = calculate_streak(days_ago(&[1, 2]), today());
        assert_eq!(streak, Streak { current: 2, longest: 2 });
    }

    #[test]
    fn run_ending_before_yesterday_is_not_current() {
        let streak = calculate_streak(days_ago(&[2, 3]), today());
        assert_eq!(streak, Streak { current: 0, longest: 2 });
    }

    #[test]
    fn gap_after_today_freezes_current_streak() {
        let streak = calculate_streak(days_ago(&[0, 2, 3]), today());
        assert_eq!(streak, Streak { current: 1, longest: 2 });
    }

    #[test]
    fn current_streak_survives_longer_history_behind_a_gap() {
        // 3-day live run, gap, then an older 5-day run.
        let streak = calculate_streak(days_ago(&[0, 1, 2, 4, 5, 6, 7, 8]), today());
        assert_eq!(streak, Streak { current: 3, longest: 5 });
    }

    #[test]
    fn input_order_and_duplicates_do_not_matter() {
        let mut days = days_ago(&[2, 0, 1, 1]);
        days.reverse();
        let streak = calculate_streak(days, today());
        assert_eq!(streak, Streak { current: 3, longest: 3 });
    }

    #[test]
    fn single_old_completion_counts_toward_longest_only() {
        let streak = calculate_streak(days_ago(&[30]), today());
        assert_eq!(streak, Streak { current: 0, longest: 1 });
    }

    #[test]
    fn streaks_cross_month_and_leap_boundaries() {
        let leap_day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let dates = vec![
            leap_day,
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 28).unwrap(),
        ];
        let streak = calculate_streak(dates, leap_day);
        assert_eq!(streak, Streak { current: 3, longest: 3 });
    }

    #[test]
    fn stats_follow_habit_order_and_ignore_other_habits() {
        let habits = vec![habit("b"), habit("a")];
        let completions = vec![
            Completion::new("a", today()),
            Completion::new("a", today() - Duration::days(1)),
            Completion::new("b", today() - Duration::days(3)),
            Completion::new("ghost", today()),
        ];

        let stats = habits_with_stats(&habits, &completions, today());
        assert_eq!(stats.len(), 2);

        assert_eq!(stats[0].habit.id, "b");
        assert_eq!(stats[0].current_streak, 0);
        assert_eq!(stats[0].longest_streak, 1);
        assert!(!stats[0].completed_today);
        assert_eq!(stats[0].total_completions, 1);

        assert_eq!(stats[1].habit.id, "a");
        assert_eq!(stats[1].current_streak, 2);
        assert!(stats[1].completed_today);
        assert_eq!(stats[1].total_completions, 2);
    }

    #[test]
    fn summary_rolls_up_stats() {
        let habits = vec![habit("a"), habit("b"), habit("c")];
        let completions = vec![
            Completion::new("a", today()),
            Completion::new("a", today() - Duration::days(1)),
            Completion::new("a", today() - Duration::days(2)),
            Completion::new("b", today()),
        ];
        let summary = summarize(&habits_with_stats(&habits, &completions, today()));
        assert_eq!(
            summary,
            Summary {
                total_completions: 4,
                best_streak: 3,
                active_habits: 3,
                completed_today: 2,
            }
        );
    }

    #[test]
    fn summary_of_nothing_is_zero() {
        assert_eq!(summarize(&[]), Summary::default());
    }
}
