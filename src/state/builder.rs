//! Frame State Builder: every configured region of one frame into one
//! `ObservedState`.

use image::RgbaImage;

use super::observed::{ObservedState, StreetHint};
use crate::config::{RegionRole, RegionSpec, TrackerConfig};
use crate::ocr::ReadRegion;
use crate::parse::{parse_action, parse_blinds, parse_money, parse_street, NameRegistry};

pub struct FrameStateBuilder<R> {
    reader: R,
    regions: Vec<(RegionSpec, RegionRole)>,
    min_confidence: f32,
    max_edit_distance: usize,
}

impl<R: ReadRegion> FrameStateBuilder<R> {
    pub fn new(reader: R, config: &TrackerConfig) -> Self {
        // Card regions are declared for layout completeness but never read
        let regions = config
            .regions
            .iter()
            .filter_map(|region| region.role().map(|role| (region.clone(), role)))
            .filter(|(_, role)| !matches!(role, RegionRole::SeatCards(_) | RegionRole::CommunityCards))
            .collect();

        Self {
            reader,
            regions,
            min_confidence: config.ocr.min_confidence,
            max_edit_distance: config.names.max_edit_distance,
        }
    }

    /// Reads all regions of `frame`. Never fails: anything illegible is
    /// absent in the snapshot and listed in `unreadable`.
    pub fn build(&self, frame: &RgbaImage, sequence: u64, timestamp_ms: u64, names: &NameRegistry) -> ObservedState {
        let mut state = ObservedState::empty(sequence, timestamp_ms);

        for (region, role) in &self.regions {
            if let RegionRole::SeatName(seat) | RegionRole::SeatStack(seat) | RegionRole::SeatAction(seat) = role {
                state.seats.entry(*seat).or_default();
            }

            let reading = self.reader.read(frame, region);
            if reading.confidence < self.min_confidence {
                state.unreadable.push(region.name.clone());
                continue;
            }

            let text = reading.text.as_str();
            let parsed = match *role {
                RegionRole::SeatName(seat) => names
                    .resolve(text, self.max_edit_distance)
                    .map(|name| state.seats.entry(seat).or_default().player_name = Some(name)),
                RegionRole::SeatStack(seat) => parse_money(text)
                    .map(|stack| state.seats.entry(seat).or_default().stack = Some(stack)),
                RegionRole::SeatAction(seat) => parse_action(text)
                    .map(|action| state.seats.entry(seat).or_default().visible_action = Some(action)),
                RegionRole::Pot => parse_money(text).map(|pot| state.pot = Some(pot)),
                RegionRole::Blinds => parse_blinds(text).map(|(small, big)| {
                    state.small_blind = Some(small);
                    state.big_blind = Some(big);
                }),
                RegionRole::Street => parse_street(text).map(|street| {
                    state.street_hint = Some(StreetHint {
                        street,
                        confidence: reading.confidence,
                    })
                }),
                RegionRole::HandNumber => parse_money(text)
                    .filter(|id| !id.is_negative())
                    .map(|id| state.table_hand_id = Some((id.cents() / 100) as u64)),
                RegionRole::SeatCards(_) | RegionRole::CommunityCards => Some(()),
            };

            if parsed.is_none() {
                log::debug!("Region '{}' unparsable: {:?}", region.name, reading.text);
                state.unreadable.push(region.name.clone());
            }
        }

        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chips::Chips;
    use crate::config::{FieldKind, RelativeRect};
    use crate::ocr::RawReading;
    use crate::parse::{Action, Street};
    use std::collections::HashMap;

    /// Answers by region name, ignoring pixels.
    struct ScriptedReader(HashMap<&'static str, RawReading>);

    impl ReadRegion for ScriptedReader {
        fn read(&self, _frame: &RgbaImage, region: &RegionSpec) -> RawReading {
            self.0
                .get(region.name.as_str())
                .cloned()
                .unwrap_or_else(RawReading::unreadable)
        }
    }

    fn config() -> TrackerConfig {
        let rect = RelativeRect::FULL;
        TrackerConfig {
            regions: vec![
                RegionSpec::new("seat1.name", rect, FieldKind::Name),
                RegionSpec::new("seat1.stack", rect, FieldKind::Money),
                RegionSpec::new("seat1.action", rect, FieldKind::TextLabel),
                RegionSpec::new("seat2.name", rect, FieldKind::Name),
                RegionSpec::new("seat2.stack", rect, FieldKind::Money),
                RegionSpec::new("pot", rect, FieldKind::Money),
                RegionSpec::new("blinds", rect, FieldKind::Money),
                RegionSpec::new("street", rect, FieldKind::TextLabel),
                RegionSpec::new("community_cards", rect, FieldKind::Card),
            ],
            ..TrackerConfig::default()
        }
    }

    fn reader(entries: &[(&'static str, &str, f32)]) -> ScriptedReader {
        ScriptedReader(
            entries
                .iter()
                .map(|(name, text, conf)| (*name, RawReading::new(text, *conf)))
                .collect(),
        )
    }

    #[test]
    fn test_builds_full_snapshot() {
        let builder = FrameStateBuilder::new(
            reader(&[
                ("seat1.name", "Alice", 0.9),
                ("seat1.stack", "$100", 0.9),
                ("seat1.action", "Raise $3", 0.8),
                ("seat2.name", "Bob", 0.9),
                ("seat2.stack", "$97.50", 0.9),
                ("pot", "Pot: $4.50", 0.85),
                ("blinds", "$0.50/$1", 0.9),
                ("street", "FLOP", 0.7),
            ]),
            &config(),
        );

        let state = builder.build(&RgbaImage::new(10, 10), 7, 1400, &NameRegistry::new());

        assert_eq!(state.sequence, 7);
        assert_eq!(state.timestamp_ms, 1400);
        assert_eq!(state.stack(1), Some(Chips::from_cents(10000)));
        assert_eq!(state.stack(2), Some(Chips::from_cents(9750)));
        assert_eq!(state.seats[&1].player_name.as_deref(), Some("Alice"));
        assert_eq!(state.seats[&1].visible_action.as_ref().map(|a| a.action), Some(Action::Raise));
        assert_eq!(state.pot, Some(Chips::from_cents(450)));
        assert_eq!(state.big_blind, Some(Chips::from_cents(100)));
        assert_eq!(state.street_hint.map(|h| h.street), Some(Street::Flop));
        assert!(state.unreadable.is_empty());
    }

    #[test]
    fn test_low_confidence_fields_are_absent() {
        let builder = FrameStateBuilder::new(
            reader(&[
                ("seat1.name", "Alice", 0.9),
                ("seat1.stack", "$100", 0.1),
                ("pot", "$4.50", 0.9),
            ]),
            &config(),
        );

        let state = builder.build(&RgbaImage::new(10, 10), 1, 0, &NameRegistry::new());

        assert_eq!(state.stack(1), None);
        assert_eq!(state.seats[&1].player_name.as_deref(), Some("Alice"));
        assert!(state.seats.contains_key(&2), "configured seats are always present");
        assert!(state.unreadable.contains(&"seat1.stack".to_string()));
        assert!(state.unreadable.contains(&"blinds".to_string()));
        assert!(!state.unreadable.contains(&"community_cards".to_string()));
    }

    #[test]
    fn test_unparsable_text_is_unreadable() {
        let builder = FrameStateBuilder::new(reader(&[("pot", "POT", 0.95)]), &config());
        let state = builder.build(&RgbaImage::new(10, 10), 1, 0, &NameRegistry::new());
        assert_eq!(state.pot, None);
        assert!(state.unreadable.contains(&"pot".to_string()));
    }

    #[test]
    fn test_names_snap_to_registry() {
        let mut names = NameRegistry::new();
        names.observe("PlayerName1");
        let builder = FrameStateBuilder::new(reader(&[("seat1.name", "PlayerNamel", 0.9)]), &config());

        let state = builder.build(&RgbaImage::new(10, 10), 1, 0, &names);
        assert_eq!(state.seats[&1].player_name.as_deref(), Some("PlayerName1"));
    }

    #[test]
    fn test_same_frame_same_snapshot() {
        let builder = FrameStateBuilder::new(
            reader(&[("seat1.stack", "1O4", 0.9), ("street", "turn", 0.4)]),
            &config(),
        );
        let names = NameRegistry::new();
        let frame = RgbaImage::new(10, 10);
        assert_eq!(builder.build(&frame, 3, 30, &names), builder.build(&frame, 3, 30, &names));
    }
}
