//! Street labels shown on the table ("FLOP", "Turn", "Pre-Flop").

use serde::{Deserialize, Serialize};
use std::fmt;

/// Betting street, ordered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Street {
    Preflop,
    Flop,
    Turn,
    River,
    Showdown,
}

impl Street {
    pub const BETTING: [Street; 4] = [Street::Preflop, Street::Flop, Street::Turn, Street::River];

    /// The following street; `Showdown` stays put.
    pub fn next(self) -> Street {
        match self {
            Street::Preflop => Street::Flop,
            Street::Flop => Street::Turn,
            Street::Turn => Street::River,
            Street::River | Street::Showdown => Street::Showdown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Street::Preflop => "PREFLOP",
            Street::Flop => "FLOP",
            Street::Turn => "TURN",
            Street::River => "RIVER",
            Street::Showdown => "SHOWDOWN",
        }
    }
}

impl fmt::Display for Street {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Keyword match on the lowercase text with separators removed.
pub fn parse_street(text: &str) -> Option<Street> {
    let squashed: String = text
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase();
    if squashed.is_empty() {
        return None;
    }

    if squashed.contains("preflop") {
        Some(Street::Preflop)
    } else if squashed.contains("flop") {
        Some(Street::Flop)
    } else if squashed.contains("turn") {
        Some(Street::Turn)
    } else if squashed.contains("river") {
        Some(Street::River)
    } else if squashed.contains("showdown") {
        Some(Street::Showdown)
    } else {
        None
    }
}
