use serde::{Deserialize, Serialize};
use std::fmt;

use crate::chips::Chips;
use crate::parse::Street;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Win,
    Loss,
    BreakEven,
}

impl Outcome {
    /// WIN above `epsilon`, LOSS below `-epsilon`, BREAK_EVEN in between.
    pub fn from_net(net: Chips, epsilon: Chips) -> Self {
        if net > epsilon {
            Outcome::Win
        } else if net < -epsilon {
            Outcome::Loss
        } else {
            Outcome::BreakEven
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Win => "WIN",
            Outcome::Loss => "LOSS",
            Outcome::BreakEven => "BREAK_EVEN",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordFlag {
    Incomplete,
    ReconciliationMismatch,
    LowConfidence,
    ContinuityBreak,
    ExternalBuyIn,
}

impl RecordFlag {
    pub fn label(&self) -> &'static str {
        match self {
            RecordFlag::Incomplete => "INCOMPLETE",
            RecordFlag::ReconciliationMismatch => "RECONCILIATION_MISMATCH",
            RecordFlag::LowConfidence => "LOW_CONFIDENCE",
            RecordFlag::ContinuityBreak => "CONTINUITY_BREAK",
            RecordFlag::ExternalBuyIn => "EXTERNAL_BUY_IN",
        }
    }
}

impl fmt::Display for RecordFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Action labels per betting street, each a `, `-joined list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreetActions {
    pub preflop: String,
    pub flop: String,
    pub turn: String,
    pub river: String,
}

impl StreetActions {
    /// Showdown actions are listed with the river.
    pub fn slot_mut(&mut self, street: Street) -> &mut String {
        match street {
            Street::Preflop => &mut self.preflop,
            Street::Flop => &mut self.flop,
            Street::Turn => &mut self.turn,
            Street::River | Street::Showdown => &mut self.river,
        }
    }
}

/// One player's result in one hand. Immutable once emitted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandRecord {
    pub hand_number: u64,
    pub seat: usize,
    pub player_name: Option<String>,
    pub starting_stack: Option<Chips>,
    pub final_stack: Option<Chips>,
    pub small_blind: Option<Chips>,
    pub big_blind: Option<Chips>,
    pub actions: StreetActions,
    /// Largest pot seen during the hand
    pub pot: Option<Chips>,
    pub net: Option<Chips>,
    pub outcome: Option<Outcome>,
    pub flags: Vec<RecordFlag>,
    pub notes: Vec<String>,
    pub last_street: Street,
    pub started_ms: u64,
    pub ended_ms: u64,
}

impl HandRecord {
    pub fn has_flag(&self, flag: RecordFlag) -> bool {
        self.flags.contains(&flag)
    }

    /// Adds `flag` once, keeping the list sorted.
    pub fn flag(&mut self, flag: RecordFlag) {
        if let Err(pos) = self.flags.binary_search(&flag) {
            self.flags.insert(pos, flag);
        }
    }

    pub fn flags_label(&self) -> String {
        self.flags.iter().map(|f| f.label()).collect::<Vec<_>>().join("|")
    }

    pub fn notes_label(&self) -> String {
        self.notes.join("; ")
    }
}

/// Running per-player totals, persisted via `HandStore::upsert_player`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub name: String,
    pub first_seen_hand: Option<u64>,
    pub last_seen_hand: Option<u64>,
    pub hands_played: u32,
    pub wins: u32,
    pub losses: u32,
    pub break_evens: u32,
    pub total_net: Chips,
}

impl PlayerRecord {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            first_seen_hand: None,
            last_seen_hand: None,
            hands_played: 0,
            wins: 0,
            losses: 0,
            break_evens: 0,
            total_net: Chips::ZERO,
        }
    }
}
