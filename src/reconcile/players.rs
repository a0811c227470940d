use std::collections::BTreeMap;

use super::record::{HandRecord, Outcome, PlayerRecord};

/// Every player recognized during the capture with running totals.
#[derive(Debug, Default)]
pub struct PlayerLedger {
    players: BTreeMap<String, PlayerRecord>,
}

impl PlayerLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&PlayerRecord> {
        self.players.get(name)
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerRecord> {
        self.players.values()
    }

    /// Registers a confidently read name. Returns the new record the first
    /// time a name is seen, `None` afterwards.
    pub fn sighted(&mut self, name: &str) -> Option<&PlayerRecord> {
        if self.players.contains_key(name) {
            return None;
        }
        log::info!("New player: {}", name);
        Some(self.players.entry(name.to_string()).or_insert_with(|| PlayerRecord::new(name)))
    }

    /// Folds one hand result into the player's totals.
    pub fn apply(&mut self, record: &HandRecord) -> Option<&PlayerRecord> {
        let name = record.player_name.as_deref()?;
        let player = self
            .players
            .entry(name.to_string())
            .or_insert_with(|| PlayerRecord::new(name));

        player.first_seen_hand.get_or_insert(record.hand_number);
        player.last_seen_hand = Some(record.hand_number);
        player.hands_played += 1;
        match record.outcome {
            Some(Outcome::Win) => player.wins += 1,
            Some(Outcome::Loss) => player.losses += 1,
            Some(Outcome::BreakEven) => player.break_evens += 1,
            None => {}
        }
        if let Some(net) = record.net {
            player.total_net += net;
        }
        Some(player)
    }
}
