//! Processing side of the pipeline: frame -> snapshot -> segmentation ->
//! reconciliation -> storage.

use crate::config::TrackerConfig;
use crate::ocr::ReadRegion;
use crate::parse::NameRegistry;
use crate::reconcile::{HandRecord, PlayerLedger, PlayerRecord, Reconciler};
use crate::segmentation::{CompletedHand, HandSegmenter, SegmentEvent};
use crate::state::{FrameStateBuilder, ObservedState};
use crate::storage::HandStore;

use super::source::Frame;

/// Counters reported in the run summary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProcessorStats {
    pub snapshots: u64,
    pub hands: u64,
    pub records: u64,
    pub storage_errors: u64,
}

/// Owns every piece of per-capture state. Lives on a single thread.
pub struct HandProcessor<R> {
    builder: FrameStateBuilder<R>,
    names: NameRegistry,
    segmenter: HandSegmenter,
    reconciler: Reconciler,
    players: PlayerLedger,
    store: Box<dyn HandStore>,
    records: Vec<HandRecord>,
    stats: ProcessorStats,
    next_sequence: u64,
}

impl<R: ReadRegion> HandProcessor<R> {
    pub fn new(reader: R, config: &TrackerConfig, store: Box<dyn HandStore>) -> Self {
        Self {
            builder: FrameStateBuilder::new(reader, config),
            names: NameRegistry::new(),
            segmenter: HandSegmenter::new(config.segmentation.clone()),
            reconciler: Reconciler::new(config.reconciliation.clone()),
            players: PlayerLedger::new(),
            store,
            records: Vec::new(),
            stats: ProcessorStats::default(),
            next_sequence: 1,
        }
    }

    /// Every record emitted so far, in emission order.
    pub fn records(&self) -> &[HandRecord] {
        &self.records
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerRecord> {
        self.players.players()
    }

    pub fn stats(&self) -> ProcessorStats {
        self.stats
    }

    /// One-line progress summary for live runs.
    pub fn status_line(&self) -> String {
        let hand = match self.segmenter.current_hand() {
            Some(number) => format!("hand #{} {}", number, self.segmenter.phase()),
            None => "waiting for a hand".to_string(),
        };
        format!(
            "{} snapshots, {} hands, {} records, {} players, {}",
            self.stats.snapshots,
            self.stats.hands,
            self.stats.records,
            self.players.players().count(),
            hand
        )
    }

    /// Reads one frame into a snapshot and processes it.
    ///
    /// Returns the records of any hand this frame completed.
    pub fn process_frame(&mut self, frame: &Frame) -> Vec<HandRecord> {
        let sequence = self.next_sequence;
        let state = self
            .builder
            .build(&frame.image, sequence, frame.timestamp_ms, &self.names);
        if !state.unreadable.is_empty() {
            log::debug!(
                "Frame {} (snapshot {}): unreadable {}",
                frame.index,
                sequence,
                state.unreadable.join(", ")
            );
        }
        self.process_snapshot(state)
    }

    /// Feeds an already built snapshot. Sequences must increase.
    pub fn process_snapshot(&mut self, state: ObservedState) -> Vec<HandRecord> {
        self.next_sequence = self.next_sequence.max(state.sequence + 1);
        self.stats.snapshots += 1;
        self.observe_names(&state);

        let mut emitted = Vec::new();
        for event in self.segmenter.push(state) {
            match event {
                SegmentEvent::HandCompleted(hand) => emitted.extend(self.complete(&hand)),
                SegmentEvent::HandStarted { hand_number, sequence } => {
                    log::debug!("Hand #{} opened at snapshot {}", hand_number, sequence);
                }
                SegmentEvent::StreetChanged { .. } | SegmentEvent::HandUpdated { .. } => {}
            }
        }
        emitted
    }

    /// Flushes the hand in progress as incomplete. Call once, after the
    /// last frame.
    pub fn finish(&mut self) -> Vec<HandRecord> {
        match self.segmenter.finish() {
            Some(SegmentEvent::HandCompleted(hand)) => self.complete(&hand),
            _ => Vec::new(),
        }
    }

    fn observe_names(&mut self, state: &ObservedState) {
        for reading in state.seats.values() {
            let Some(name) = reading.player_name.as_deref() else {
                continue;
            };
            self.names.observe(name);
            if let Some(player) = self.players.sighted(name) {
                if let Err(e) = self.store.upsert_player(player) {
                    log::error!("Failed to store player {}: {:#}", name, e);
                    self.stats.storage_errors += 1;
                }
            }
        }
    }

    fn complete(&mut self, hand: &CompletedHand) -> Vec<HandRecord> {
        let records = self.reconciler.reconcile(hand);
        self.stats.hands += 1;

        for record in &records {
            log::info!(
                "Hand #{} seat {} {}: net {} {} [{}]",
                record.hand_number,
                record.seat,
                record.player_name.as_deref().unwrap_or("?"),
                record.net.map(|n| n.to_string()).unwrap_or_else(|| "?".to_string()),
                record.outcome.map(|o| o.label()).unwrap_or("-"),
                record.flags_label()
            );

            // Storage failures are logged; the record stays in memory
            if let Err(e) = self.store.save(record) {
                log::error!("Failed to store hand #{} seat {}: {:#}", record.hand_number, record.seat, e);
                self.stats.storage_errors += 1;
            }
            if let Some(player) = self.players.apply(record) {
                if let Err(e) = self.store.upsert_player(player) {
                    log::error!("Failed to store player {}: {:#}", player.name, e);
                    self.stats.storage_errors += 1;
                }
            }
        }

        self.stats.records += records.len() as u64;
        self.records.extend(records.iter().cloned());
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chips::Chips;
    use crate::parse::Street;
    use crate::pipeline::testing::{heads_up_hand, table_config, STEP};
    use crate::reconcile::{Outcome, RecordFlag};
    use crate::storage::MemoryHandStore;
    use anyhow::{anyhow, Result};
    use image::{Rgba, RgbaImage};

    fn frame(index: u64, level: u8) -> Frame {
        Frame {
            image: RgbaImage::from_pixel(8, 8, Rgba([level, level, level, 255])),
            timestamp_ms: index * 1000,
            index,
        }
    }

    fn processor(store: &MemoryHandStore) -> HandProcessor<crate::pipeline::testing::LevelReader> {
        HandProcessor::new(heads_up_hand(), &table_config(), Box::new(store.clone()))
    }

    #[test]
    fn test_frames_to_stored_records() {
        let store = MemoryHandStore::new();
        let mut processor = processor(&store);

        let mut emitted = Vec::new();
        for i in 0..5u8 {
            emitted.extend(processor.process_frame(&frame(u64::from(i), i * STEP)));
        }

        assert_eq!(emitted.len(), 2);
        let alice = emitted.iter().find(|r| r.seat == 1).unwrap();
        assert_eq!(alice.player_name.as_deref(), Some("Alice"));
        assert_eq!(alice.net, Some(Chips::from_cents(400)));
        assert_eq!(alice.outcome, Some(Outcome::Win));
        assert_eq!(alice.last_street, Street::Flop);
        assert!(alice.flags.is_empty(), "flags: {:?}", alice.flags);

        let bob = emitted.iter().find(|r| r.seat == 2).unwrap();
        assert_eq!(bob.net, Some(Chips::from_cents(-400)));
        assert_eq!(bob.outcome, Some(Outcome::Loss));

        assert_eq!(store.hands().len(), 2);
        let players = store.players();
        assert_eq!(players.len(), 2);
        let stored_alice = players.iter().find(|p| p.name == "Alice").unwrap();
        assert_eq!(stored_alice.hands_played, 1);
        assert_eq!(stored_alice.wins, 1);
        assert_eq!(stored_alice.total_net, Chips::from_cents(400));

        let stats = processor.stats();
        assert_eq!(stats.snapshots, 5);
        assert_eq!(stats.hands, 1);
        assert_eq!(stats.records, 2);
    }

    #[test]
    fn test_players_are_stored_when_first_seen() {
        let store = MemoryHandStore::new();
        let mut processor = processor(&store);

        processor.process_frame(&frame(0, 0));

        let players = store.players();
        assert_eq!(players.len(), 2);
        assert!(players.iter().all(|p| p.hands_played == 0));
    }

    #[test]
    fn test_finish_flushes_incomplete_hand() {
        let store = MemoryHandStore::new();
        let mut processor = processor(&store);

        for i in 0..3u8 {
            assert!(processor.process_frame(&frame(u64::from(i), i * STEP)).is_empty());
        }
        let flushed = processor.finish();

        assert_eq!(flushed.len(), 2);
        assert!(flushed.iter().all(|r| r.has_flag(RecordFlag::Incomplete)));
        assert!(flushed.iter().all(|r| r.last_street == Street::Flop));
        assert!(processor.finish().is_empty(), "nothing left to flush");
    }

    #[test]
    fn test_status_line_reports_progress() {
        let mut processor = processor(&MemoryHandStore::new());
        assert_eq!(
            processor.status_line(),
            "0 snapshots, 0 hands, 0 records, 0 players, waiting for a hand"
        );

        for i in 0..3u8 {
            processor.process_frame(&frame(u64::from(i), i * STEP));
        }
        assert_eq!(
            processor.status_line(),
            "3 snapshots, 0 hands, 0 records, 2 players, hand #1 FLOP"
        );
    }

    struct BrokenStore;

    impl HandStore for BrokenStore {
        fn save(&mut self, _record: &HandRecord) -> Result<()> {
            Err(anyhow!("disk full"))
        }

        fn upsert_player(&mut self, _player: &PlayerRecord) -> Result<()> {
            Err(anyhow!("disk full"))
        }
    }

    #[test]
    fn test_storage_errors_do_not_stop_processing() {
        let mut processor = HandProcessor::new(heads_up_hand(), &table_config(), Box::new(BrokenStore));

        for i in 0..5u8 {
            processor.process_frame(&frame(u64::from(i), i * STEP));
        }

        assert_eq!(processor.records().len(), 2);
        // two sightings, two saves, two player updates
        assert_eq!(processor.stats().storage_errors, 6);
        assert_eq!(processor.players().count(), 2);
    }

    #[test]
    fn test_same_snapshots_give_same_records() {
        let snapshots = || {
            vec![
                ObservedState::at(1).seat(1, "A", Some(100)).seat(2, "B", Some(100)).pot_cents(150).blinds_cents(50, 100),
                ObservedState::at(2).seat(1, "A", Some(100)).seat(2, "B", Some(100)).pot_cents(150).blinds_cents(50, 100),
                ObservedState::at(3).seat(1, "A", Some(97)).seat(2, "B", Some(97)).pot_cents(750),
                ObservedState::at(4).seat(1, "A", Some(103)).seat(2, "B", Some(97)).pot_cents(0),
                ObservedState::at(5).seat(1, "A", Some(103)).seat(2, "B", Some(97)).pot_cents(0),
            ]
        };

        let run = || {
            let mut processor = processor(&MemoryHandStore::new());
            for state in snapshots() {
                processor.process_snapshot(state);
            }
            processor.finish();
            processor.records().to_vec()
        };

        let first = run();
        assert_eq!(first.len(), 2);
        assert_eq!(first, run());
    }
}
