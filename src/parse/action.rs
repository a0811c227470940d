//! Seat action labels ("Raise $4", "FOLDED", "All-in").

use serde::{Deserialize, Serialize};
use std::fmt;

use super::money::parse_money;
use crate::chips::Chips;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Fold,
    Check,
    Call,
    Bet,
    Raise,
    AllIn,
    Unknown,
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Action::Fold => "FOLD",
            Action::Check => "CHECK",
            Action::Call => "CALL",
            Action::Bet => "BET",
            Action::Raise => "RAISE",
            Action::AllIn => "ALL_IN",
            Action::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A parsed action label.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionReading {
    pub action: Action,
    pub amount: Option<Chips>,
    /// Cleaned source text, kept for notes on `Unknown`
    pub raw: String,
}

impl ActionReading {
    /// `RAISE 4.00`, `FOLD`, or `UNKNOWN`.
    pub fn summary(&self) -> String {
        match self.amount {
            Some(amount) if self.action != Action::Unknown => format!("{} {}", self.action, amount),
            _ => self.action.to_string(),
        }
    }
}

// Checked in order; all-in first since "all in" texts often also say "raise".
const KEYWORDS: &[(Action, &[&str])] = &[
    (Action::AllIn, &["allin", "all-in", "all in", "shove"]),
    (Action::Fold, &["fold"]),
    (Action::Check, &["check"]),
    (Action::Call, &["call"]),
    (Action::Raise, &["raise"]),
    (Action::Bet, &["bet"]),
];

/// Matches keywords case-insensitively; unmatched text becomes `Unknown`.
///
/// Returns `None` for blank text (no action visible).
pub fn parse_action(text: &str) -> Option<ActionReading> {
    let raw = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if raw.is_empty() {
        return None;
    }
    let lower = raw.to_lowercase();

    let action = KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(action, _)| *action)
        .unwrap_or(Action::Unknown);

    let amount = match action {
        Action::Bet | Action::Raise | Action::Call | Action::AllIn => parse_money(&raw),
        _ => None,
    };

    Some(ActionReading { action, amount, raw })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords() {
        assert_eq!(parse_action("FOLDED").unwrap().action, Action::Fold);
        assert_eq!(parse_action("checks").unwrap().action, Action::Check);
        assert_eq!(parse_action("Call").unwrap().action, Action::Call);
        assert_eq!(parse_action("Bets").unwrap().action, Action::Bet);
        assert_eq!(parse_action("RAISED").unwrap().action, Action::Raise);
        assert_eq!(parse_action("All In").unwrap().action, Action::AllIn);
        assert_eq!(parse_action("Raise ALL-IN").unwrap().action, Action::AllIn);
    }

    #[test]
    fn test_amount_attached_when_legible() {
        let reading = parse_action("Raise $4.00").unwrap();
        assert_eq!(reading.amount, Some(Chips::from_cents(400)));
        assert_eq!(reading.summary(), "RAISE 4.00");

        let reading = parse_action("Check").unwrap();
        assert_eq!(reading.amount, None);
        assert_eq!(reading.summary(), "CHECK");
    }

    #[test]
    fn test_unknown_keeps_raw_text() {
        let reading = parse_action("  Sitting   out ").unwrap();
        assert_eq!(reading.action, Action::Unknown);
        assert_eq!(reading.raw, "Sitting out");
        assert_eq!(reading.summary(), "UNKNOWN");
    }

    #[test]
    fn test_blank_is_absent() {
        assert_eq!(parse_action("   "), None);
    }
}
