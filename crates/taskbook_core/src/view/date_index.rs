//! Calendar month index of due dates.
//!
//! # Responsibility
//! - Report which days of a displayed month have at least one task due.
//! - Provide month navigation and Monday-first grid offsets.
//!
//! # Invariants
//! - A day absent from the index has zero tasks due; it is still a valid day.

use crate::model::due_date::DueDate;
use crate::model::task::Task;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeSet;

/// Collects the distinct due dates of `tasks` that fall in `year`/`month`.
pub fn dates_with_tasks_in_month(tasks: &[Task], year: i32, month: u32) -> BTreeSet<DueDate> {
    tasks
        .iter()
        .filter_map(|task| task.due)
        .filter(|due| due.is_in_month(year, month))
        .collect()
}

/// One displayed calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarMonth {
    year: i32,
    month: u32,
}

impl CalendarMonth {
    /// Returns `None` unless `month` is in `1..=12`.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// Month that contains `date`.
    pub fn containing(date: DueDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Month containing the local today.
    pub fn current() -> Self {
        Self::containing(DueDate::today())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    fn first_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// Every day of the month in order.
    pub fn days(&self) -> Vec<DueDate> {
        let Some(first) = self.first_date() else {
            return Vec::new();
        };
        first
            .iter_days()
            .take_while(|day| day.month() == self.month)
            .map(DueDate::new)
            .collect()
    }

    /// Empty grid cells before day 1 when weeks start on Monday.
    pub fn leading_blanks(&self) -> u32 {
        self.first_date()
            .map_or(0, |first| first.weekday().num_days_from_monday())
    }

    /// Days of this month that have at least one task due.
    pub fn due_dates(&self, tasks: &[Task]) -> BTreeSet<DueDate> {
        dates_with_tasks_in_month(tasks, self.year, self.month)
    }
}
