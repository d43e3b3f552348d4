use chrono::{Datelike, NaiveDate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub text: &'static str,
    pub author: &'static str,
}

pub const QUOTES: &[Quote] = &[
    Quote {
        text: "The secret of getting ahead is getting started.",
        author: "Mark Twain",
    },
    Quote {
        text: "It always seems impossible until it's done.",
        author: "Nelson Mandela",
    },
    Quote {
        text: "Don't watch the clock; do what it does. Keep going.",
        author: "Sam Levenson",
    },
    Quote {
        text: "The only way to do great work is to love what you do.",
        author: "Steve Jobs",
    },
    Quote {
        text: "You don't have to be great to start, but you have to start to be great.",
        author: "Zig Ziglar",
    },
    Quote {
        text: "Success is the sum of small efforts repeated day in and day out.",
        author: "Robert Collier",
    },
    Quote {
        text: "Focus on being productive instead of busy.",
        author: "Tim Ferriss",
    },
    Quote {
        text: "Action is the foundational key to all success.",
        author: "Pablo Picasso",
    },
    Quote {
        text: "The future depends on what you do today.",
        author: "Mahatma Gandhi",
    },
    Quote {
        text: "Start where you are. Use what you have. Do what you can.",
        author: "Arthur Ashe",
    },
    Quote {
        text: "Small daily improvements are the key to staggering long-term results.",
        author: "Unknown",
    },
    Quote {
        text: "Discipline is the bridge between goals and accomplishment.",
        author: "Jim Rohn",
    },
];

/// Stable within a day, different across days.
pub fn quote_of_the_day(today: NaiveDate) -> &'static Quote {
    let idx = today.num_days_from_ce().unsigned_abs() as usize % QUOTES.len();
    &QUOTES[idx]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_within_a_day() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        assert_eq!(quote_of_the_day(day), quote_of_the_day(day));
    }

    #[test]
    fn cycles_through_the_whole_list() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let seen: std::collections::HashSet<&str> = (0..QUOTES.len() as u64)
            .map(|i| quote_of_the_day(start + chrono::Days::new(i)).text)
            .collect();
        assert_eq!(seen.len(), QUOTES.len());
    }
}
