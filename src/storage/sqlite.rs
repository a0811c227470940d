use anyhow::{bail, Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, Transaction};
use std::path::Path;

use super::HandStore;
use crate::chips::Chips;
use crate::reconcile::{HandRecord, PlayerRecord};

const CURRENT_SCHEMA_VERSION: i32 = 1;

pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let mut version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read user_version pragma")?;

    if version > CURRENT_SCHEMA_VERSION {
        bail!(
            "database version ({}) is newer than supported schema ({})",
            version,
            CURRENT_SCHEMA_VERSION
        );
    }

    if version == CURRENT_SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn
        .transaction()
        .context("failed to open migration transaction")?;

    while version < CURRENT_SCHEMA_VERSION {
        let next_version = version + 1;
        apply_migration(&tx, next_version)
            .with_context(|| format!("migration to version {next_version} failed"))?;
        version = next_version;
    }

    tx.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)
        .context("failed to update user_version pragma")?;
    tx.commit().context("failed to commit migrations")?;

    Ok(())
}

fn apply_migration(tx: &Transaction<'_>, version: i32) -> Result<()> {
    match version {
        1 => {
            tx.execute_batch(include_str!("schemas/schema_v1.sql"))
                .context("failed to execute schema_v1.sql")?;
            Ok(())
        }
        _ => bail!("no migration defined for version {}", version),
    }
}

fn cents(value: Option<Chips>) -> Option<i64> {
    value.map(|c| c.cents())
}

/// SQLite store: hands are append-only rows, players are upserted by name.
pub struct SqliteHandStore {
    conn: Connection,
}

impl SqliteHandStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database {}", path.display()))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
        Self::with_connection(conn)
    }

    fn with_connection(mut conn: Connection) -> Result<Self> {
        run_migrations(&mut conn)?;
        Ok(Self { conn })
    }
}

impl HandStore for SqliteHandStore {
    fn save(&mut self, record: &HandRecord) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO hands (
                    hand_number, seat, player_name, starting_stack, final_stack,
                    small_blind, big_blind, actions_preflop, actions_flop,
                    actions_turn, actions_river, pot, net, outcome, flags, notes,
                    last_street, started_ms, ended_ms, recorded_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
                params![
                    record.hand_number as i64,
                    record.seat as i64,
                    record.player_name,
                    cents(record.starting_stack),
                    cents(record.final_stack),
                    cents(record.small_blind),
                    cents(record.big_blind),
                    record.actions.preflop,
                    record.actions.flop,
                    record.actions.turn,
                    record.actions.river,
                    cents(record.pot),
                    cents(record.net),
                    record.outcome.map(|o| o.label()),
                    record.flags_label(),
                    record.notes_label(),
                    record.last_street.label(),
                    record.started_ms as i64,
                    record.ended_ms as i64,
                    Utc::now().to_rfc3339(),
                ],
            )
            .with_context(|| format!("failed to insert hand #{}", record.hand_number))?;
        Ok(())
    }

    fn upsert_player(&mut self, player: &PlayerRecord) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO players (
                    name, first_seen_hand, last_seen_hand, hands_played,
                    wins, losses, break_evens, total_net, updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(name) DO UPDATE SET
                    first_seen_hand = excluded.first_seen_hand,
                    last_seen_hand = excluded.last_seen_hand,
                    hands_played = excluded.hands_played,
                    wins = excluded.wins,
                    losses = excluded.losses,
                    break_evens = excluded.break_evens,
                    total_net = excluded.total_net,
                    updated_at = excluded.updated_at",
                params![
                    player.name,
                    player.first_seen_hand.map(|h| h as i64),
                    player.last_seen_hand.map(|h| h as i64),
                    player.hands_played,
                    player.wins,
                    player.losses,
                    player.break_evens,
                    player.total_net.cents(),
                    Utc::now().to_rfc3339(),
                ],
            )
            .with_context(|| format!("failed to upsert player {}", player.name))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::Street;
    use crate::reconcile::{Outcome, RecordFlag, StreetActions};
    use tempfile::tempdir;

    fn record(hand_number: u64, name: &str, net: i64) -> HandRecord {
        HandRecord {
            hand_number,
            seat: 1,
            player_name: Some(name.to_string()),
            starting_stack: Some(Chips::from_cents(10000)),
            final_stack: Some(Chips::from_cents(10000 + net)),
            small_blind: Some(Chips::from_cents(50)),
            big_blind: Some(Chips::from_cents(100)),
            actions: StreetActions {
                preflop: "RAISE 3.00".to_string(),
                ..StreetActions::default()
            },
            pot: Some(Chips::from_cents(700)),
            net: Some(Chips::from_cents(net)),
            outcome: Some(Outcome::from_net(Chips::from_cents(net), Chips::ZERO)),
            flags: vec![RecordFlag::ReconciliationMismatch],
            notes: Vec::new(),
            last_street: Street::River,
            started_ms: 0,
            ended_ms: 9000,
        }
    }

    #[test]
    fn test_migrations_set_user_version() {
        let store = SqliteHandStore::open_in_memory().unwrap();
        let version: i32 = store
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_newer_database_is_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION + 1)
            .unwrap();
        assert!(run_migrations(&mut conn).is_err());
    }

    #[test]
    fn test_hands_are_appended() {
        let mut store = SqliteHandStore::open_in_memory().unwrap();
        store.save(&record(1, "Alice", 350)).unwrap();
        store.save(&record(2, "Alice", -100)).unwrap();

        let count: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM hands", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);

        let (net, outcome, flags): (i64, String, String) = store
            .conn
            .query_row(
                "SELECT net, outcome, flags FROM hands WHERE hand_number = 1",
                [],
                |row| Ok((row.get("net")?, row.get("outcome")?, row.get("flags")?)),
            )
            .unwrap();
        assert_eq!(net, 350);
        assert_eq!(outcome, "WIN");
        assert_eq!(flags, "RECONCILIATION_MISMATCH");
    }

    #[test]
    fn test_player_upsert_replaces_totals() {
        let mut store = SqliteHandStore::open_in_memory().unwrap();
        let mut alice = PlayerRecord::new("Alice");
        store.upsert_player(&alice).unwrap();

        alice.hands_played = 3;
        alice.wins = 2;
        alice.total_net = Chips::from_cents(-125);
        store.upsert_player(&alice).unwrap();

        let (count, played, wins, net): (i64, i64, i64, i64) = store
            .conn
            .query_row(
                "SELECT COUNT(*), MAX(hands_played), MAX(wins), MAX(total_net) FROM players",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .unwrap();
        assert_eq!((count, played, wins, net), (1, 3, 2, -125));
    }

    #[test]
    fn test_reopen_keeps_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("tracker.db");

        SqliteHandStore::open(&path)
            .unwrap()
            .save(&record(1, "Bob", 0))
            .unwrap();
        let store = SqliteHandStore::open(&path).unwrap();

        let count: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM hands", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
