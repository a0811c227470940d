use serde::Serialize;
use std::collections::BTreeMap;

use crate::chips::Chips;
use crate::parse::{ActionReading, Street};

/// What one seat showed in one frame. Every field may be unreadable.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SeatReading {
    pub player_name: Option<String>,
    pub stack: Option<Chips>,
    pub visible_action: Option<ActionReading>,
}

/// A street label reading together with the reader's confidence.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct StreetHint {
    pub street: Street,
    pub confidence: f32,
}

/// Immutable snapshot of one frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ObservedState {
    pub sequence: u64,
    /// Milliseconds since capture start
    pub timestamp_ms: u64,
    pub seats: BTreeMap<usize, SeatReading>,
    pub pot: Option<Chips>,
    pub small_blind: Option<Chips>,
    pub big_blind: Option<Chips>,
    pub street_hint: Option<StreetHint>,
    /// Hand id printed by the client, when the layout has one
    pub table_hand_id: Option<u64>,
    /// Names of regions that produced no usable value
    pub unreadable: Vec<String>,
}

impl ObservedState {
    pub fn empty(sequence: u64, timestamp_ms: u64) -> Self {
        Self {
            sequence,
            timestamp_ms,
            seats: BTreeMap::new(),
            pot: None,
            small_blind: None,
            big_blind: None,
            street_hint: None,
            table_hand_id: None,
            unreadable: Vec::new(),
        }
    }

    pub fn stack(&self, seat: usize) -> Option<Chips> {
        self.seats.get(&seat).and_then(|s| s.stack)
    }

    /// Seats with a readable stack, in seat order.
    pub fn stacks(&self) -> impl Iterator<Item = (usize, Chips)> + '_ {
        self.seats
            .iter()
            .filter_map(|(&seat, reading)| reading.stack.map(|stack| (seat, stack)))
    }

    pub fn seats_with_stack(&self) -> usize {
        self.stacks().count()
    }
}

/// Fluent constructors for hand-written snapshot sequences in tests.
#[cfg(test)]
impl ObservedState {
    pub fn at(sequence: u64) -> Self {
        Self::empty(sequence, sequence * 1000)
    }

    pub fn seat(mut self, seat: usize, name: &str, stack: Option<i64>) -> Self {
        let entry = self.seats.entry(seat).or_default();
        entry.player_name = Some(name.to_string());
        entry.stack = stack.map(|dollars| Chips::from_cents(dollars * 100));
        self
    }

    pub fn action(mut self, seat: usize, text: &str) -> Self {
        self.seats.entry(seat).or_default().visible_action = crate::parse::parse_action(text);
        self
    }

    pub fn pot_cents(mut self, cents: i64) -> Self {
        self.pot = Some(Chips::from_cents(cents));
        self
    }

    pub fn blinds_cents(mut self, small: i64, big: i64) -> Self {
        self.small_blind = Some(Chips::from_cents(small));
        self.big_blind = Some(Chips::from_cents(big));
        self
    }

    pub fn street(mut self, street: Street, confidence: f32) -> Self {
        self.street_hint = Some(StreetHint { street, confidence });
        self
    }
}
