use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::core::history::History;
use crate::core::task::{Category, Task};

/// Consecutive days with at least one completion, ending today. Zero unless
/// today itself has one. Bounded at a year of walking backwards.
pub fn streak(history: &History, today: NaiveDate) -> u32 {
    if history.count_on(today) == 0 {
        return 0;
    }
    let mut streak = 1u32;
    let mut day = today;
    for _ in 1..365 {
        day = match day.pred_opt() {
            Some(prev) => prev,
            None => break,
        };
        if history.count_on(day) == 0 {
            break;
        }
        streak += 1;
    }
    streak
}

/// Completion counts for the 7 calendar days ending today, oldest first.
/// Labels are short weekday names; days without completions count 0.
pub fn weekly_series(history: &History, today: NaiveDate) -> Vec<(String, u32)> {
    (0..7)
        .rev()
        .map(|back| {
            let day = today - chrono::Days::new(back);
            (day.format("%a").to_string(), history.count_on(day))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryStat {
    pub total: u32,
    pub done: u32,
}

impl CategoryStat {
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            f64::from(self.done) / f64::from(self.total)
        }
    }
}

/// Per-category totals over tasks due today. Categories without a task due
/// today do not appear.
pub fn category_breakdown(tasks: &[Task], today: NaiveDate) -> BTreeMap<Category, CategoryStat> {
    let mut breakdown: BTreeMap<Category, CategoryStat> = BTreeMap::new();
    for task in tasks.iter().filter(|t| t.date == Some(today)) {
        let stat = breakdown.entry(task.category).or_default();
        stat.total += 1;
        if task.completed {
            stat.done += 1;
        }
    }
    breakdown
}

/// Headline counters for the analytics screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub completed_total: usize,
    pub completed_today: usize,
    pub pending: usize,
    pub streak: u32,
}

pub fn summary(tasks: &[Task], history: &History, today: NaiveDate) -> Summary {
    Summary {
        completed_total: tasks.iter().filter(|t| t.completed).count(),
        completed_today: tasks
            .iter()
            .filter(|t| t.completed && t.date == Some(today))
            .count(),
        pending: tasks.iter().filter(|t| !t.completed).count(),
        streak: streak(history, today),
    }
}
