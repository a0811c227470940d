//! Hand segmentation state machine.
//!
//! Consumes snapshots in capture order and decides where hands start, which
//! street each snapshot belongs to, and where hands end:
//! Waiting → Preflop → Flop → Turn → River → Showdown → Waiting.

use std::collections::VecDeque;
use std::fmt;

use super::context::{AttributedSnapshot, SegmentationContext};
use crate::chips::Chips;
use crate::config::SegmentationConfig;
use crate::parse::Street;
use crate::state::ObservedState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Waiting,
    Preflop,
    Flop,
    Turn,
    River,
    Showdown,
}

impl From<Street> for Phase {
    fn from(street: Street) -> Self {
        match street {
            Street::Preflop => Phase::Preflop,
            Street::Flop => Phase::Flop,
            Street::Turn => Phase::Turn,
            Street::River => Phase::River,
            Street::Showdown => Phase::Showdown,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Waiting => write!(f, "WAITING"),
            Phase::Preflop => write!(f, "PREFLOP"),
            Phase::Flop => write!(f, "FLOP"),
            Phase::Turn => write!(f, "TURN"),
            Phase::River => write!(f, "RIVER"),
            Phase::Showdown => write!(f, "SHOWDOWN"),
        }
    }
}

/// Everything the segmenter knows about a finished hand.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletedHand {
    pub hand_number: u64,
    pub snapshots: Vec<AttributedSnapshot>,
    pub last_street: Street,
    pub notes: Vec<String>,
    pub low_confidence: bool,
    /// Flushed before a closing condition was seen
    pub incomplete: bool,
    /// Pot on the closing snapshot when the next hand's blinds were already
    /// posted; the final stacks are net of these blinds
    pub next_blinds: Option<Chips>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SegmentEvent {
    HandStarted { hand_number: u64, sequence: u64 },
    StreetChanged { hand_number: u64, from: Street, to: Street, sequence: u64 },
    HandUpdated { hand_number: u64, sequence: u64 },
    HandCompleted(CompletedHand),
}

pub struct HandSegmenter {
    config: SegmentationConfig,
    /// Recent snapshots while waiting for a hand to start
    window: VecDeque<ObservedState>,
    /// Sequence of the snapshot that closed the previous hand
    closed_at: Option<u64>,
    current: Option<SegmentationContext>,
    next_hand_number: u64,
    big_blind: Option<Chips>,
}

impl HandSegmenter {
    pub fn new(config: SegmentationConfig) -> Self {
        Self {
            window: VecDeque::with_capacity(config.vote_window),
            config,
            closed_at: None,
            current: None,
            next_hand_number: 1,
            big_blind: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.current
            .as_ref()
            .map(|ctx| Phase::from(ctx.street))
            .unwrap_or(Phase::Waiting)
    }

    pub fn current_hand(&self) -> Option<u64> {
        self.current.as_ref().map(|ctx| ctx.hand_number)
    }

    fn majority(&self, count: usize) -> bool {
        count * 2 > self.config.vote_window
    }

    /// Minimum bet for stack-change detection.
    fn min_bet(&self) -> Chips {
        self.big_blind.unwrap_or(self.config.fallback_min_bet)
    }

    /// Largest pot that still counts as "just the blinds".
    fn baseline_pot(&self) -> Option<Chips> {
        self.big_blind.map(|bb| bb.scale(self.config.baseline_pot_factor))
    }

    fn is_start_candidate(&self, state: &ObservedState) -> bool {
        let Some(pot) = state.pot else {
            return false;
        };
        if !pot.is_positive() || state.seats_with_stack() < 2 {
            return false;
        }
        match self.baseline_pot() {
            Some(baseline) => pot <= baseline,
            None => true,
        }
    }

    /// Feeds one snapshot. Snapshots must arrive in capture order.
    pub fn push(&mut self, state: ObservedState) -> Vec<SegmentEvent> {
        if let Some(bb) = state.big_blind {
            self.big_blind = Some(bb);
        }

        if self.current.is_some() {
            self.push_active(state)
        } else {
            self.push_waiting(state)
        }
    }

    fn push_waiting(&mut self, state: ObservedState) -> Vec<SegmentEvent> {
        if self.window.len() == self.config.vote_window {
            self.window.pop_front();
        }
        self.window.push_back(state);

        let candidates = self.window.iter().filter(|s| self.is_start_candidate(s)).count();
        if !self.majority(candidates) {
            return Vec::new();
        }

        // The closing snapshot of the previous hand may vote but stays with that hand
        let closed_at = self.closed_at;
        let window = std::mem::take(&mut self.window);
        let first = window
            .iter()
            .position(|s| self.is_start_candidate(s) && closed_at.is_none_or(|c| s.sequence > c));
        let Some(first) = first else {
            self.window = window;
            return Vec::new();
        };

        let hand_number = self.next_hand_number;
        self.next_hand_number += 1;
        self.closed_at = None;

        let mut ctx = SegmentationContext::new(hand_number);
        if self.big_blind.is_none() {
            ctx.note("big blind unknown at hand start; any positive pot accepted".to_string());
        }
        let mut snapshots = window.into_iter().skip(first);
        let start_sequence = snapshots
            .next()
            .map(|s| {
                let sequence = s.sequence;
                ctx.record(s);
                sequence
            })
            .unwrap_or_default();
        for s in snapshots {
            ctx.record(s);
        }

        log::info!("Hand #{} started at snapshot {}", hand_number, start_sequence);
        self.current = Some(ctx);
        vec![SegmentEvent::HandStarted {
            hand_number,
            sequence: start_sequence,
        }]
    }

    fn push_active(&mut self, state: ObservedState) -> Vec<SegmentEvent> {
        let min_bet = self.min_bet();
        let baseline = self.baseline_pot().unwrap_or(Chips::ZERO);
        let vote_window = self.config.vote_window;
        let Some(mut ctx) = self.current.take() else {
            return Vec::new();
        };

        let sequence = state.sequence;

        // Stack settled and pot back at zero or the next hand's blinds, in a
        // majority of the vote window
        let settles = |s: &ObservedState| ctx.stack_moved(s, min_bet) && s.pot.is_some_and(|pot| pot <= baseline);
        let settled = settles(&state) && {
            let earlier = ctx
                .recent(vote_window.saturating_sub(1))
                .iter()
                .filter(|a| settles(&a.state))
                .count();
            self.majority(earlier + 1)
        };

        let folded_out = !settled && {
            let zero = |s: &ObservedState| s.pot.is_some_and(|pot| !pot.is_positive());
            let earlier = ctx
                .recent(vote_window.saturating_sub(1))
                .iter()
                .filter(|a| zero(&a.state))
                .count();
            let count = earlier + usize::from(zero(&state));
            zero(&state) && self.majority(count)
        };

        if settled || folded_out {
            if folded_out {
                ctx.note(format!("closed on empty pot at snapshot {} (no stack settlement seen)", sequence));
            }
            let next_blinds = state.pot.filter(|pot| pot.is_positive());
            ctx.record(state);
            return vec![self.complete(ctx, sequence, false, next_blinds)];
        }

        let mut events = Vec::new();
        let from = ctx.street;
        self.advance_street(&mut ctx, &state);
        if ctx.street != from {
            log::info!("Hand #{}: {} -> {}", ctx.hand_number, from, ctx.street);
            events.push(SegmentEvent::StreetChanged {
                hand_number: ctx.hand_number,
                from,
                to: ctx.street,
                sequence,
            });
        }

        events.push(SegmentEvent::HandUpdated {
            hand_number: ctx.hand_number,
            sequence,
        });
        ctx.record(state);
        self.current = Some(ctx);
        events
    }

    /// Street hint first, pot fallback once the hint has gone stale.
    fn advance_street(&self, ctx: &mut SegmentationContext, state: &ObservedState) {
        let current = ctx.street;
        let pot_rose = ctx.pot_rose(state.pot);
        let sequence = state.sequence;
        let mut usable_hint = false;

        if let Some(hint) = state.street_hint {
            let confident = hint.confidence >= self.config.street_hint_min_confidence;
            if confident && hint.street > current {
                if hint.street > current.next() {
                    ctx.note(format!(
                        "street skipped: {} -> {} at snapshot {}",
                        current, hint.street, sequence
                    ));
                }
                if !pot_rose {
                    ctx.note(format!(
                        "street label {} accepted over flat pot at snapshot {}",
                        hint.street, sequence
                    ));
                }
                ctx.enter_street(hint.street, state.pot);
                return;
            } else if confident && hint.street == current {
                usable_hint = true;
            } else if confident {
                ctx.note(format!(
                    "ignored street regression {} -> {} at snapshot {}",
                    current, hint.street, sequence
                ));
            } else if hint.street > current {
                if pot_rose && current != Street::Showdown {
                    ctx.note(format!(
                        "low-confidence street label {} accepted on pot increase at snapshot {}",
                        hint.street, sequence
                    ));
                    ctx.enter_street(current.next(), state.pot);
                    return;
                }
                ctx.note(format!(
                    "low-confidence street label {} overruled by flat pot at snapshot {}",
                    hint.street, sequence
                ));
            }
        }

        if usable_hint {
            ctx.staleness.street_hint = 0;
            return;
        }

        ctx.staleness.street_hint += 1;
        if ctx.staleness.street_hint >= self.config.street_staleness_bound
            && pot_rose
            && current != Street::Showdown
        {
            let next = current.next();
            ctx.note(format!(
                "advanced {} -> {} on pot increase after {} snapshots without a street label",
                current, next, ctx.staleness.street_hint
            ));
            ctx.low_confidence = true;
            ctx.enter_street(next, state.pot);
        }
    }

    fn complete(
        &mut self,
        mut ctx: SegmentationContext,
        sequence: u64,
        incomplete: bool,
        next_blinds: Option<Chips>,
    ) -> SegmentEvent {
        for (&seat, &gap) in &ctx.staleness.longest_stack_gap.clone() {
            if gap >= self.config.street_staleness_bound {
                ctx.note(format!("seat {} stack unreadable for {} consecutive snapshots", seat, gap));
            }
        }

        if incomplete {
            log::info!("Hand #{} flushed as incomplete", ctx.hand_number);
        } else {
            log::info!("Hand #{} completed at snapshot {}", ctx.hand_number, sequence);
            self.closed_at = Some(sequence);
            if let Some(closing) = ctx.snapshots.last() {
                self.window.push_back(closing.state.clone());
            }
        }

        SegmentEvent::HandCompleted(CompletedHand {
            hand_number: ctx.hand_number,
            snapshots: ctx.snapshots,
            last_street: ctx.street,
            notes: ctx.notes,
            low_confidence: ctx.low_confidence,
            incomplete,
            next_blinds,
        })
    }

    /// Flushes the hand in progress, if any, as incomplete.
    pub fn finish(&mut self) -> Option<SegmentEvent> {
        let ctx = self.current.take()?;
        let sequence = ctx.snapshots.last().map(|s| s.state.sequence).unwrap_or_default();
        Some(self.complete(ctx, sequence, true, None))
    }
}
