//! Reconciliation & outcome aggregation: one completed hand into one
//! `HandRecord` per seat, checked against the pot and the previous hand.

pub mod continuity;
pub mod players;
pub mod record;

pub use continuity::ContinuityLedger;
pub use players::PlayerLedger;
pub use record::{HandRecord, Outcome, PlayerRecord, RecordFlag, StreetActions};

use std::collections::{BTreeMap, BTreeSet};

use crate::chips::Chips;
use crate::config::ReconciliationConfig;
use crate::parse::Action;
use crate::segmentation::CompletedHand;

pub struct Reconciler {
    config: ReconciliationConfig,
    continuity: ContinuityLedger,
}

/// Most frequent name; ties go to the lexicographically smallest.
fn mode_name<'a>(names: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for name in names {
        *counts.entry(name).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .fold(None::<(&str, usize)>, |best, (name, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((name, count)),
        })
        .map(|(name, _)| name.to_string())
}

impl Reconciler {
    pub fn new(config: ReconciliationConfig) -> Self {
        Self {
            config,
            continuity: ContinuityLedger::new(),
        }
    }

    pub fn reconcile(&mut self, hand: &CompletedHand) -> Vec<HandRecord> {
        let states = || hand.snapshots.iter().map(|a| &a.state);

        let seats: BTreeSet<usize> = states()
            .flat_map(|s| {
                s.seats
                    .iter()
                    .filter(|(_, r)| r.stack.is_some() || r.player_name.is_some())
                    .map(|(&seat, _)| seat)
            })
            .collect();

        let max_pot = states().filter_map(|s| s.pot).max();
        let small_blind = states().find_map(|s| s.small_blind);
        let big_blind = states().find_map(|s| s.big_blind);
        let started_ms = states().next().map(|s| s.timestamp_ms).unwrap_or_default();
        let ended_ms = states().last().map(|s| s.timestamp_ms).unwrap_or_default();

        let mut hand_notes = hand.notes.clone();
        if let Some(id) = states().find_map(|s| s.table_hand_id) {
            hand_notes.push(format!("table hand id {}", id));
        }

        let mut records: Vec<HandRecord> = seats
            .iter()
            .map(|&seat| {
                let readings = || states().filter_map(move |s| s.seats.get(&seat));
                let starting_stack = readings().find_map(|r| r.stack);
                let final_stack = readings().filter_map(|r| r.stack).last();
                let net = starting_stack.zip(final_stack).map(|(start, end)| end - start);

                let mut notes = hand_notes.clone();
                let mut actions = StreetActions::default();
                let mut last_label: BTreeMap<_, String> = BTreeMap::new();
                for attributed in &hand.snapshots {
                    let Some(action) = attributed.state.seats.get(&seat).and_then(|r| r.visible_action.as_ref())
                    else {
                        continue;
                    };
                    if action.action == Action::Unknown {
                        let note = format!("unrecognized action text '{}'", action.raw);
                        if !notes.contains(&note) {
                            notes.push(note);
                        }
                        continue;
                    }
                    let label = action.summary();
                    let slot = actions.slot_mut(attributed.street);
                    if last_label.get(&attributed.street) == Some(&label) {
                        continue;
                    }
                    if !slot.is_empty() {
                        slot.push_str(", ");
                    }
                    slot.push_str(&label);
                    last_label.insert(attributed.street, label);
                }

                let mut record = HandRecord {
                    hand_number: hand.hand_number,
                    seat,
                    player_name: mode_name(readings().filter_map(|r| r.player_name.as_deref())),
                    starting_stack,
                    final_stack,
                    small_blind,
                    big_blind,
                    actions,
                    pot: max_pot,
                    net,
                    outcome: net.map(|n| Outcome::from_net(n, self.config.outcome_epsilon)),
                    flags: Vec::new(),
                    notes,
                    last_street: hand.last_street,
                    started_ms,
                    ended_ms,
                };

                if hand.incomplete {
                    record.flag(RecordFlag::Incomplete);
                }
                if hand.low_confidence {
                    record.flag(RecordFlag::LowConfidence);
                }
                if net.is_none() {
                    record.flag(RecordFlag::LowConfidence);
                    record.notes.push("stack never read confidently".to_string());
                }
                record
            })
            .collect();

        if let Some(blinds) = hand.next_blinds {
            for record in &mut records {
                record
                    .notes
                    .push(format!("final stack read after next hand's blinds ({} in pot)", blinds));
            }
        }

        self.check_balance(hand.hand_number, &mut records, max_pot, hand.next_blinds);
        self.continuity.check(&mut records, self.config.tolerance);
        records
    }

    /// Net results must cancel out and neither side may exceed the pot.
    ///
    /// Blinds already posted for the next hand left the final stacks, so
    /// they are added back to the total and allowed on the losing side.
    fn check_balance(
        &self,
        hand_number: u64,
        records: &mut [HandRecord],
        max_pot: Option<Chips>,
        next_blinds: Option<Chips>,
    ) {
        let tolerance = self.config.tolerance;
        let posted = next_blinds.unwrap_or(Chips::ZERO);
        let nets: Vec<Chips> = records.iter().filter_map(|r| r.net).collect();
        let total: Chips = nets.iter().sum::<Chips>() + posted;
        let won: Chips = nets.iter().filter(|n| n.is_positive()).sum();
        let lost: Chips = nets.iter().filter(|n| n.is_negative()).map(|n| n.abs()).sum();

        let mut problems = Vec::new();
        if total.abs() > tolerance {
            problems.push(format!("net results sum to {}", total));
        }
        if let Some(pot) = max_pot {
            if won > pot + tolerance {
                problems.push(format!("winnings {} exceed pot {}", won, pot));
            }
            if lost > pot + posted + tolerance {
                problems.push(format!("losses {} exceed pot {}", lost, pot));
            }
        }

        if problems.is_empty() {
            return;
        }
        log::warn!("Hand #{} does not reconcile: {}", hand_number, problems.join(", "));
        for record in records.iter_mut() {
            record.flag(RecordFlag::ReconciliationMismatch);
            record.notes.extend(problems.iter().cloned());
        }
    }
}
