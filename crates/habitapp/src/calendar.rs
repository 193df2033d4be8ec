//! Monthly heatmap data for the history view.
//!
//! Each day of the month carries the number of completions recorded on it and
//! the completion rate, `completions / habit count`. Days are laid out on a
//! Sunday-first week grid; `leading_blanks` is the number of empty cells before
//! the 1st.

use crate::error::{HabitError, Result};
use crate::model::Completion;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub completed: u32,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthCalendar {
    pub year: i32,
    pub month: u32,
    pub leading_blanks: u32,
    pub days: Vec<CalendarDay>,
}

impl MonthCalendar {
    pub fn day(&self, date: NaiveDate) -> Option<&CalendarDay> {
        self.days.iter().find(|d| d.date == date)
    }
}

/// Every calendar day of `month` (1-12) in `year`.
pub fn days_in_month(year: i32, month: u32) -> Result<Vec<NaiveDate>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
        HabitError::InvalidInput(format!("no such month: {year}-{month:02}"))
    })?;
    Ok(first
        .iter_days()
        .take_while(|d| d.month() == month)
        .collect())
}

pub fn month_calendar(
    completions: &[Completion],
    habit_count: usize,
    year: i32,
    month: u32,
) -> Result<MonthCalendar> {
    let days = days_in_month(year, month)?;
    let leading_blanks = days
        .first()
        .map(|d| d.weekday().num_days_from_sunday())
        .unwrap_or(0);

    let mut per_day: HashMap<NaiveDate, u32> = HashMap::new();
    for completion in completions {
        if completion.date.year() == year && completion.date.month() == month {
            *per_day.entry(completion.date).or_default() += 1;
        }
    }

    let days = days
        .into_iter()
        .map(|date| {
            let completed = per_day.get(&date).copied().unwrap_or(0);
            let rate = if habit_count == 0 {
                0.0
            } else {
                f64::from(completed) / habit_count as f64
            };
            CalendarDay {
                date,
                completed,
                rate,
            }
        })
        .collect();

    Ok(MonthCalendar {
        year,
        month,
        leading_blanks,
        days,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_lengths() {
        assert_eq!(days_in_month(2024, 2).unwrap().len(), 29);
        assert_eq!(days_in_month(2023, 2).unwrap().len(), 28);
        assert_eq!(days_in_month(2024, 12).unwrap().len(), 31);
        assert_eq!(days_in_month(2024, 4).unwrap().len(), 30);
    }

    #[test]
    fn invalid_month_is_rejected() {
        assert!(matches!(
            days_in_month(2024, 13),
            Err(HabitError::InvalidInput(_))
        ));
    }

    #[test]
    fn leading_blanks_follow_first_weekday() {
        // 2024-06-01 is a Saturday, 2024-09-01 a Sunday.
        assert_eq!(month_calendar(&[], 1, 2024, 6).unwrap().leading_blanks, 6);
        assert_eq!(month_calendar(&[], 1, 2024, 9).unwrap().leading_blanks, 0);
    }

    #[test]
    fn rate_is_share_of_habits_completed() {
        let completions = vec![
            Completion::new("a", date(2024, 6, 3)),
            Completion::new("b", date(2024, 6, 3)),
            Completion::new("a", date(2024, 6, 4)),
            Completion::new("a", date(2024, 5, 31)),
        ];
        let calendar = month_calendar(&completions, 4, 2024, 6).unwrap();

        let third = calendar.day(date(2024, 6, 3)).unwrap();
        assert_eq!(third.completed, 2);
        assert!((third.rate - 0.5).abs() < f64::EPSILON);

        let fourth = calendar.day(date(2024, 6, 4)).unwrap();
        assert!((fourth.rate - 0.25).abs() < f64::EPSILON);

        assert_eq!(calendar.day(date(2024, 6, 1)).unwrap().completed, 0);
        assert!(calendar.day(date(2024, 5, 31)).is_none());
    }

    #[test]
    fn rate_is_zero_without_habits() {
        let completions = vec![Completion::new("a", date(2024, 6, 3))];
        let calendar = month_calendar(&completions, 0, 2024, 6).unwrap();
        assert_eq!(calendar.day(date(2024, 6, 3)).unwrap().rate, 0.0);
    }
}
