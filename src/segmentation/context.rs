use serde::Serialize;
use std::collections::BTreeMap;

use crate::chips::Chips;
use crate::parse::Street;
use crate::state::ObservedState;

/// A snapshot together with the street it was attributed to.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AttributedSnapshot {
    pub street: Street,
    pub state: ObservedState,
}

/// Consecutive snapshots without a usable value, per field.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Staleness {
    pub street_hint: u32,
    pub pot: u32,
    pub stacks: BTreeMap<usize, u32>,
    /// Longest gap seen per seat during the hand
    pub longest_stack_gap: BTreeMap<usize, u32>,
}

impl Staleness {
    fn record(&mut self, state: &ObservedState) {
        if state.pot.is_some() {
            self.pot = 0;
        } else {
            self.pot += 1;
        }

        for (&seat, reading) in &state.seats {
            let counter = self.stacks.entry(seat).or_insert(0);
            if reading.stack.is_some() {
                *counter = 0;
            } else {
                *counter += 1;
                let longest = self.longest_stack_gap.entry(seat).or_insert(0);
                *longest = (*longest).max(*counter);
            }
        }
    }
}

/// Working set of the hand in progress. Owned by one segmenter and
/// replaced wholesale at every hand boundary.
#[derive(Clone, Debug)]
pub struct SegmentationContext {
    pub hand_number: u64,
    pub street: Street,
    pub snapshots: Vec<AttributedSnapshot>,
    /// First confident stack per seat
    pub start_stacks: BTreeMap<usize, Chips>,
    /// Last confident stack per seat
    pub last_stacks: BTreeMap<usize, Chips>,
    pub last_pot: Option<Chips>,
    /// Last known pot when the current street began
    pub street_start_pot: Option<Chips>,
    pub staleness: Staleness,
    pub notes: Vec<String>,
    pub low_confidence: bool,
}

impl SegmentationContext {
    pub fn new(hand_number: u64) -> Self {
        Self {
            hand_number,
            street: Street::Preflop,
            snapshots: Vec::new(),
            start_stacks: BTreeMap::new(),
            last_stacks: BTreeMap::new(),
            last_pot: None,
            street_start_pot: None,
            staleness: Staleness::default(),
            notes: Vec::new(),
            low_confidence: false,
        }
    }

    /// Attributes `state` to the current street and folds its readings
    /// into the running stack/pot tracking.
    pub fn record(&mut self, state: ObservedState) {
        for (seat, stack) in state.stacks() {
            self.start_stacks.entry(seat).or_insert(stack);
            self.last_stacks.insert(seat, stack);
        }
        if let Some(pot) = state.pot {
            self.last_pot = Some(pot);
            if self.street_start_pot.is_none() {
                self.street_start_pot = Some(pot);
            }
        }
        self.staleness.record(&state);
        self.snapshots.push(AttributedSnapshot {
            street: self.street,
            state,
        });
    }

    /// Moves to `street`; the pot baseline for "pot rose" restarts at
    /// `pot` (the pot of the snapshot that opened the street) when readable.
    pub fn enter_street(&mut self, street: Street, pot: Option<Chips>) {
        self.street = street;
        self.street_start_pot = pot.or(self.last_pot);
        self.staleness.street_hint = 0;
    }

    /// True when `pot` is above the pot at the start of the current street.
    pub fn pot_rose(&self, pot: Option<Chips>) -> bool {
        match (pot, self.street_start_pot) {
            (Some(now), Some(then)) => now > then,
            (Some(now), None) => now.is_positive(),
            (None, _) => false,
        }
    }

    pub fn note(&mut self, note: String) {
        log::debug!("Hand #{}: {}", self.hand_number, note);
        if !self.notes.contains(&note) {
            self.notes.push(note);
        }
    }

    /// Some seat's stack moved away from its hand-start value by more than `min_bet`.
    pub fn stack_moved(&self, state: &ObservedState, min_bet: Chips) -> bool {
        state.stacks().any(|(seat, stack)| {
            self.start_stacks
                .get(&seat)
                .is_some_and(|&start| (stack - start).abs() > min_bet)
        })
    }

    /// The most recent `n` attributed snapshots.
    pub fn recent(&self, n: usize) -> &[AttributedSnapshot] {
        let from = self.snapshots.len().saturating_sub(n);
        &self.snapshots[from..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_tracks_first_and_last_stacks() {
        let mut ctx = SegmentationContext::new(1);
        ctx.record(ObservedState::at(1).seat(1, "A", Some(100)).pot_cents(150));
        ctx.record(ObservedState::at(2).seat(1, "A", None));
        ctx.record(ObservedState::at(3).seat(1, "A", Some(97)));

        assert_eq!(ctx.start_stacks[&1], Chips::from_cents(10000));
        assert_eq!(ctx.last_stacks[&1], Chips::from_cents(9700));
        assert_eq!(ctx.staleness.stacks[&1], 0);
        assert_eq!(ctx.staleness.longest_stack_gap[&1], 1);
        assert_eq!(ctx.staleness.pot, 2);
        assert_eq!(ctx.snapshots.len(), 3);
    }

    #[test]
    fn test_pot_rose_is_relative_to_street_start() {
        let mut ctx = SegmentationContext::new(1);
        ctx.record(ObservedState::at(1).pot_cents(150));
        assert!(ctx.pot_rose(Some(Chips::from_cents(300))));

        ctx.record(ObservedState::at(2).pot_cents(300));
        ctx.enter_street(Street::Flop, None);
        assert!(!ctx.pot_rose(Some(Chips::from_cents(300))));
        assert!(!ctx.pot_rose(None));
    }

    #[test]
    fn test_notes_are_deduplicated() {
        let mut ctx = SegmentationContext::new(1);
        ctx.note("x".to_string());
        ctx.note("x".to_string());
        assert_eq!(ctx.notes.len(), 1);
    }
}
