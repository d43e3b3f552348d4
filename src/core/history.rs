use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Per-day count of completion events, keyed by calendar date.
///
/// Counts only ever go up while the app runs; un-completing a task does not
/// take a completion back. A full restore replaces the map wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History(BTreeMap<NaiveDate, u32>);

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completion on `day`.
    pub fn record(&mut self, day: NaiveDate) {
        *self.0.entry(day).or_insert(0) += 1;
    }

    pub fn count_on(&self, day: NaiveDate) -> u32 {
        self.0.get(&day).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, u32)> + '_ {
        self.0.iter().map(|(d, c)| (*d, *c))
    }
}

impl FromIterator<(NaiveDate, u32)> for History {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, u32)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
