//! CSV writer for hand records.
//!
//! `hands.csv` is append-only for crash safety: each record is written as
//! soon as its hand completes. `players.csv` is small and rewritten on
//! every player update.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use super::HandStore;
use crate::chips::Chips;
use crate::reconcile::{HandRecord, PlayerRecord};

/// CSV header row for hands.csv.
const HANDS_HEADER: &str = "hand_number,seat,player_name,starting_stack,final_stack,small_blind,big_blind,\
actions_preflop,actions_flop,actions_turn,actions_river,pot,net,outcome,flags,notes,last_street,started_ms,ended_ms";

/// CSV header row for players.csv.
const PLAYERS_HEADER: &str =
    "name,first_seen_hand,last_seen_hand,hands_played,wins,losses,break_evens,total_net";

/// Quotes a field when it contains a separator, quote or newline.
fn field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn money(value: Option<Chips>) -> String {
    value.map(|c| c.to_string()).unwrap_or_default()
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Initializes CSV file with header if it doesn't exist or is empty.
///
/// If the file exists and has content, this does nothing (preserves existing data).
pub fn init_csv(path: &Path, header: &str) -> Result<()> {
    if path.exists() {
        let file = File::open(path).context("Failed to open existing CSV")?;
        let reader = BufReader::new(file);
        if reader.lines().next().is_some() {
            return Ok(());
        }
    }

    let mut file = File::create(path).context("Failed to create CSV file")?;
    writeln!(file, "{}", header).context("Failed to write CSV header")?;
    Ok(())
}

/// Formats one hand record as a CSV row (no trailing newline).
pub fn hand_row(record: &HandRecord) -> String {
    [
        record.hand_number.to_string(),
        record.seat.to_string(),
        field(record.player_name.as_deref().unwrap_or("")),
        money(record.starting_stack),
        money(record.final_stack),
        money(record.small_blind),
        money(record.big_blind),
        field(&record.actions.preflop),
        field(&record.actions.flop),
        field(&record.actions.turn),
        field(&record.actions.river),
        money(record.pot),
        money(record.net),
        optional(record.outcome),
        field(&record.flags_label()),
        field(&record.notes_label()),
        record.last_street.to_string(),
        record.started_ms.to_string(),
        record.ended_ms.to_string(),
    ]
    .join(",")
}

fn player_row(player: &PlayerRecord) -> String {
    [
        field(&player.name),
        optional(player.first_seen_hand),
        optional(player.last_seen_hand),
        player.hands_played.to_string(),
        player.wins.to_string(),
        player.losses.to_string(),
        player.break_evens.to_string(),
        player.total_net.to_string(),
    ]
    .join(",")
}

/// Appends one result row to the CSV file.
///
/// Opens the file in append mode for each write, so completed hands
/// survive a crash later in the capture.
pub fn append_hand(path: &Path, record: &HandRecord) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context("Failed to open CSV for append")?;
    writeln!(file, "{}", hand_row(record)).context("Failed to write CSV row")?;
    Ok(())
}

pub struct CsvHandStore {
    hands_path: PathBuf,
    players_path: PathBuf,
    players: BTreeMap<String, PlayerRecord>,
}

impl CsvHandStore {
    /// Uses `<dir>/hands.csv` and `<dir>/players.csv`, creating the directory if needed.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        let hands_path = dir.join("hands.csv");
        init_csv(&hands_path, HANDS_HEADER)?;
        Ok(Self {
            hands_path,
            players_path: dir.join("players.csv"),
            players: BTreeMap::new(),
        })
    }

    fn write_players(&self) -> Result<()> {
        let mut content = String::from(PLAYERS_HEADER);
        content.push('\n');
        for player in self.players.values() {
            content.push_str(&player_row(player));
            content.push('\n');
        }
        // Write then rename so a crash never leaves a truncated file
        let tmp = self.players_path.with_extension("csv.tmp");
        fs::write(&tmp, content).context("Failed to write players CSV")?;
        fs::rename(&tmp, &self.players_path).context("Failed to replace players CSV")?;
        Ok(())
    }
}

impl HandStore for CsvHandStore {
    fn save(&mut self, record: &HandRecord) -> Result<()> {
        append_hand(&self.hands_path, record)
    }

    fn upsert_player(&mut self, player: &PlayerRecord) -> Result<()> {
        self.players.insert(player.name.clone(), player.clone());
        self.write_players()
    }
}
