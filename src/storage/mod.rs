//! Persistence of hand records and players.

pub mod csv_writer;
pub mod memory;
pub mod sqlite;

pub use csv_writer::CsvHandStore;
pub use memory::MemoryHandStore;
pub use sqlite::SqliteHandStore;

use anyhow::Result;

use crate::reconcile::{HandRecord, PlayerRecord};

/// Sink for reconciled hands. Implementations live on the processing thread.
pub trait HandStore: Send {
    /// Appends one record. Records are never rewritten.
    fn save(&mut self, record: &HandRecord) -> Result<()>;

    /// Inserts or replaces the player keyed by name.
    fn upsert_player(&mut self, player: &PlayerRecord) -> Result<()>;
}

/// Fans out to several stores; every store is attempted, the first error is returned.
impl HandStore for Vec<Box<dyn HandStore>> {
    fn save(&mut self, record: &HandRecord) -> Result<()> {
        let mut result = Ok(());
        for store in self.iter_mut() {
            if let Err(e) = store.save(record) {
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }

    fn upsert_player(&mut self, player: &PlayerRecord) -> Result<()> {
        let mut result = Ok(());
        for store in self.iter_mut() {
            if let Err(e) = store.upsert_player(player) {
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }
}
