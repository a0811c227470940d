//! Stack continuity between consecutive hands of the same player.

use std::collections::BTreeMap;

use super::record::{HandRecord, RecordFlag};
use crate::chips::Chips;

/// Last final stack per player name.
#[derive(Debug, Default)]
pub struct ContinuityLedger {
    final_stacks: BTreeMap<String, Chips>,
}

impl ContinuityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_final(&self, name: &str) -> Option<Chips> {
        self.final_stacks.get(name).copied()
    }

    /// Compares each record's starting stack with the player's previous
    /// final stack, flags mismatches beyond `tolerance`, then remembers
    /// this hand's final stacks.
    pub fn check(&mut self, records: &mut [HandRecord], tolerance: Chips) {
        for record in records.iter_mut() {
            let Some(name) = record.player_name.clone() else {
                continue;
            };

            if let (Some(previous), Some(start)) = (self.last_final(&name), record.starting_stack) {
                let delta = start - previous;
                if delta.abs() > tolerance {
                    let flag = if delta.is_positive() {
                        RecordFlag::ExternalBuyIn
                    } else {
                        RecordFlag::ContinuityBreak
                    };
                    log::warn!(
                        "Hand #{}: {} started with {} but ended the previous hand with {} ({})",
                        record.hand_number, name, start, previous, flag
                    );
                    record.flag(flag);
                    record.notes.push(format!(
                        "starting stack {} differs from previous final stack {}",
                        start, previous
                    ));
                }
            }

            if let Some(final_stack) = record.final_stack {
                self.final_stacks.insert(name, final_stack);
            }
        }
    }
}
