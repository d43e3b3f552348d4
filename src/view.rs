use std::cmp::Ordering;

use chrono::NaiveDate;

use crate::core::task::Task;

/// Which slice of the task list is shown. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    Today,
    Upcoming,
    Completed,
}

impl Filter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Today => "today",
            Self::Upcoming => "upcoming",
            Self::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "all" => Some(Self::All),
            "today" => Some(Self::Today),
            "upcoming" => Some(Self::Upcoming),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Date,
    Priority,
    Category,
    Title,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Priority => "priority",
            Self::Category => "category",
            Self::Title => "title",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "date" => Some(Self::Date),
            "priority" => Some(Self::Priority),
            "category" => Some(Self::Category),
            "title" => Some(Self::Title),
            _ => None,
        }
    }
}

/// The current view selection, held by the caller rather than in globals.
#[derive(Debug, Clone, Default)]
pub struct ViewQuery {
    pub filter: Filter,
    pub sort: SortKey,
    pub search: String,
}

/// Derive the displayed sequence: filter, then search, then a stable sort,
/// then a stable partition that moves completed tasks to the back (except
/// under the Completed filter, which is all completed already).
pub fn derive_view<'a>(tasks: &'a [Task], query: &ViewQuery, today: NaiveDate) -> Vec<&'a Task> {
    let needle = query.search.trim().to_lowercase();

    let mut shown: Vec<&Task> = tasks
        .iter()
        .filter(|t| match query.filter {
            Filter::All => true,
            Filter::Today => t.date == Some(today),
            Filter::Upcoming => !t.completed && t.date.is_some_and(|d| d > today),
            Filter::Completed => t.completed,
        })
        .filter(|t| {
            needle.is_empty()
                || t.title.to_lowercase().contains(&needle)
                || t.description.to_lowercase().contains(&needle)
        })
        .collect();

    // Stable, so pre-existing relative order breaks ties
    shown.sort_by(|a, b| match query.sort {
        SortKey::Date => match (a.date, b.date) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(da), Some(db)) => da.cmp(&db),
        },
        SortKey::Priority => a.priority.cmp(&b.priority),
        SortKey::Category => a.category.as_str().cmp(b.category.as_str()),
        SortKey::Title => a.title.cmp(&b.title),
    });

    if query.filter != Filter::Completed {
        let (active, done): (Vec<&Task>, Vec<&Task>) =
            shown.into_iter().partition(|t| !t.completed);
        shown = active;
        shown.extend(done);
    }
    shown
}

/// Percentage of today's tasks that are completed, rounded to the nearest
/// integer; 0 when nothing is due today.
pub fn derive_today_progress(tasks: &[Task], today: NaiveDate) -> u32 {
    let due_today: Vec<&Task> = tasks.iter().filter(|t| t.date == Some(today)).collect();
    if due_today.is_empty() {
        return 0;
    }
    let done = due_today.iter().filter(|t| t.completed).count();
    ((done as f64 / due_today.len() as f64) * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::task::{Category, Priority};
    use chrono::Utc;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn make_task(title: &str) -> Task {
        Task::new(title, Utc::now())
    }

    fn today() -> NaiveDate {
        day(2024, 6, 15)
    }

    fn sample() -> Vec<Task> {
        let mut essay = make_task("Write essay");
        essay.date = Some(today());
        essay.priority = Priority::High;

        let mut gym = make_task("Gym session");
        gym.date = Some(day(2024, 6, 16));
        gym.category = Category::Health;

        let mut refactor = make_task("Refactor parser");
        refactor.date = Some(day(2024, 6, 14));
        refactor.category = Category::Coding;
        refactor.completed = true;

        let mut someday = make_task("Read a book");
        someday.description = "that essay collection".to_string();

        vec![essay, gym, refactor, someday]
    }

    fn titles<'a>(view: &[&'a Task]) -> Vec<&'a str> {
        view.iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn filter_today_matches_due_date_only() {
        let tasks = sample();
        let query = ViewQuery {
            filter: Filter::Today,
            ..ViewQuery::default()
        };
        assert_eq!(titles(&derive_view(&tasks, &query, today())), ["Write essay"]);
    }

    #[test]
    fn filter_upcoming_excludes_completed_and_undated() {
        let mut tasks = sample();
        // A completed future task must not show up as upcoming
        tasks[1].completed = true;
        let mut future = make_task("Plan trip");
        future.date = Some(day(2024, 6, 20));
        tasks.push(future);

        let query = ViewQuery {
            filter: Filter::Upcoming,
            ..ViewQuery::default()
        };
        assert_eq!(titles(&derive_view(&tasks, &query, today())), ["Plan trip"]);
    }

    #[test]
    fn search_is_case_insensitive_over_title_and_description() {
        let tasks = sample();
        let query = ViewQuery {
            search: "ESSAY".to_string(),
            ..ViewQuery::default()
        };
        let view = derive_view(&tasks, &query, today());
        assert_eq!(titles(&view), ["Write essay", "Read a book"]);
    }

    #[test]
    fn date_sort_puts_undated_last() {
        let tasks = sample();
        let query = ViewQuery::default();
        let view = derive_view(&tasks, &query, today());
        // Sorted by date ascending, undated after dated, completed at the back
        assert_eq!(
            titles(&view),
            ["Write essay", "Gym session", "Read a book", "Refactor parser"]
        );
    }

    #[test]
    fn priority_sort_is_most_urgent_first() {
        let tasks = sample();
        let query = ViewQuery {
            sort: SortKey::Priority,
            ..ViewQuery::default()
        };
        let view = derive_view(&tasks, &query, today());
        // High first, equal-priority ties keep input order, completed at the back
        assert_eq!(
            titles(&view),
            ["Write essay", "Gym session", "Read a book", "Refactor parser"]
        );
    }

    #[test]
    fn completed_partition_preserves_sort_within_groups() {
        let mut tasks = sample();
        let mut done_early = make_task("Archive inbox");
        done_early.date = Some(day(2024, 6, 10));
        done_early.completed = true;
        tasks.push(done_early);

        let view = derive_view(&tasks, &ViewQuery::default(), today());
        let completed_tail: Vec<bool> = view.iter().map(|t| t.completed).collect();
        // All active tasks precede all completed tasks
        let first_done = completed_tail.iter().position(|c| *c).unwrap();
        assert!(completed_tail[first_done..].iter().all(|c| *c));
        // Within the completed group the date order survives the partition
        assert_eq!(
            titles(&view)[first_done..],
            ["Archive inbox", "Refactor parser"]
        );
    }

    #[test]
    fn completed_filter_skips_partition() {
        let tasks = sample();
        let query = ViewQuery {
            filter: Filter::Completed,
            ..ViewQuery::default()
        };
        assert_eq!(
            titles(&derive_view(&tasks, &query, today())),
            ["Refactor parser"]
        );
    }

    #[test]
    fn derive_view_is_idempotent() {
        let tasks = sample();
        let query = ViewQuery {
            filter: Filter::All,
            sort: SortKey::Title,
            search: "e".to_string(),
        };
        let once = titles(&derive_view(&tasks, &query, today()));
        let twice = titles(&derive_view(&tasks, &query, today()));
        assert_eq!(once, twice);
    }

    #[test]
    fn view_never_grows_the_input() {
        let tasks = sample();
        for filter in [Filter::All, Filter::Today, Filter::Upcoming, Filter::Completed] {
            let query = ViewQuery {
                filter,
                ..ViewQuery::default()
            };
            assert!(derive_view(&tasks, &query, today()).len() <= tasks.len());
        }
    }

    #[test]
    fn progress_rounds_to_nearest_integer() {
        let mut tasks = Vec::new();
        for i in 0..4 {
            let mut t = make_task(&format!("t{}", i));
            t.date = Some(today());
            tasks.push(t);
        }
        tasks[0].completed = true;
        assert_eq!(derive_today_progress(&tasks, today()), 25);

        tasks.truncate(3);
        // 1 of 3 → 33.33 rounds down
        assert_eq!(derive_today_progress(&tasks, today()), 33);
    }

    #[test]
    fn progress_is_zero_without_tasks_due_today() {
        let tasks = vec![make_task("undated")];
        assert_eq!(derive_today_progress(&tasks, today()), 0);
    }
}
