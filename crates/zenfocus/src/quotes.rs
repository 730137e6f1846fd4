//! Motivational quotes shown under the countdown

use chrono::{Datelike, NaiveDate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub text: &'static str,
    pub author: &'static str,
}

pub const QUOTES: [Quote; 10] = [
    Quote {
        text: "The secret of getting ahead is getting started.",
        author: "Mark Twain",
    },
    Quote {
        text: "The only way to do great work is to love what you do.",
        author: "Steve Jobs",
    },
    Quote {
        text: "Focus on being productive instead of busy.",
        author: "Tim Ferriss",
    },
    Quote {
        text: "The key is not to prioritize what's on your schedule, but to schedule your priorities.",
        author: "Stephen Covey",
    },
    Quote {
        text: "Either you run the day or the day runs you.",
        author: "Jim Rohn",
    },
    Quote {
        text: "Concentrate all your thoughts upon the work in hand. The sun's rays do not burn until brought to a focus.",
        author: "Alexander Graham Bell",
    },
    Quote {
        text: "The successful warrior is the average man, with laser-like focus.",
        author: "Bruce Lee",
    },
    Quote {
        text: "You can do anything, but not everything.",
        author: "David Allen",
    },
    Quote {
        text: "Don't watch the clock; do what it does. Keep going.",
        author: "Sam Levenson",
    },
    Quote {
        text: "The shorter way to do many things is to do only one thing at a time.",
        author: "Mozart",
    },
];

/// Quote of the day; stable for a whole calendar day
pub fn quote_for(day: NaiveDate) -> &'static Quote {
    let index = day.num_days_from_ce().rem_euclid(QUOTES.len() as i32) as usize;
    &QUOTES[index]
}
