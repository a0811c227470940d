use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use super::HandStore;
use crate::reconcile::{HandRecord, PlayerRecord};

#[derive(Debug, Default)]
struct Inner {
    hands: Vec<HandRecord>,
    players: BTreeMap<String, PlayerRecord>,
}

/// In-memory store for dry runs and tests. Clones share the same contents,
/// so a handle kept outside the pipeline can inspect what was saved.
#[derive(Clone, Debug, Default)]
pub struct MemoryHandStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryHandStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hands(&self) -> Vec<HandRecord> {
        self.inner.lock().map(|i| i.hands.clone()).unwrap_or_default()
    }

    pub fn players(&self) -> Vec<PlayerRecord> {
        self.inner
            .lock()
            .map(|i| i.players.values().cloned().collect())
            .unwrap_or_default()
    }
}

impl HandStore for MemoryHandStore {
    fn save(&mut self, record: &HandRecord) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|_| anyhow!("memory store poisoned"))?;
        inner.hands.push(record.clone());
        Ok(())
    }

    fn upsert_player(&mut self, player: &PlayerRecord) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|_| anyhow!("memory store poisoned"))?;
        inner.players.insert(player.name.clone(), player.clone());
        Ok(())
    }
}
