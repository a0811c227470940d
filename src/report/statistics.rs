//! Per-player statistics over emitted hand records.
//!
//! Net amounts are summarized in chips (mean, median, population standard
//! deviation) over the hands where a net could be computed.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::chips::Chips;
use crate::reconcile::{HandRecord, Outcome, RecordFlag};

/// Statistics for one player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerStats {
    pub name: String,
    /// Hands with a record for this player
    pub hands: usize,
    pub wins: usize,
    pub losses: usize,
    pub break_evens: usize,
    pub total_net: Chips,
    pub mean_net: f64,
    pub median_net: f64,
    pub std_dev_net: f64,
    /// Largest positive net, if any
    pub biggest_win: Option<Chips>,
    /// Most negative net, if any
    pub biggest_loss: Option<Chips>,
    pub incomplete_hands: usize,
    pub mismatched_hands: usize,
}

/// Statistics for a whole capture.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportStats {
    pub total_hands: usize,
    pub total_records: usize,
    /// Records with at least one flag
    pub flagged_records: usize,
    /// Records whose seat never showed a readable name
    pub unnamed_records: usize,
    pub players: Vec<PlayerStats>,
}

impl ReportStats {
    pub fn from_records(records: &[HandRecord]) -> Self {
        let mut by_player: BTreeMap<&str, Vec<&HandRecord>> = BTreeMap::new();
        let mut unnamed_records = 0;
        for record in records {
            match record.player_name.as_deref() {
                Some(name) => by_player.entry(name).or_default().push(record),
                None => unnamed_records += 1,
            }
        }

        let hands: BTreeSet<u64> = records.iter().map(|r| r.hand_number).collect();

        ReportStats {
            total_hands: hands.len(),
            total_records: records.len(),
            flagged_records: records.iter().filter(|r| !r.flags.is_empty()).count(),
            unnamed_records,
            players: by_player
                .into_iter()
                .map(|(name, records)| player_stats(name, &records))
                .collect(),
        }
    }
}

fn player_stats(name: &str, records: &[&HandRecord]) -> PlayerStats {
    let count = |outcome: Outcome| records.iter().filter(|r| r.outcome == Some(outcome)).count();
    let flagged = |flag: RecordFlag| records.iter().filter(|r| r.has_flag(flag)).count();

    let nets: Vec<Chips> = records.iter().filter_map(|r| r.net).collect();
    let mut sorted: Vec<f64> = nets.iter().map(|n| n.as_f64()).collect();
    sorted.sort_by(f64::total_cmp);

    PlayerStats {
        name: name.to_string(),
        hands: records.len(),
        wins: count(Outcome::Win),
        losses: count(Outcome::Loss),
        break_evens: count(Outcome::BreakEven),
        total_net: nets.iter().copied().sum(),
        mean_net: calculate_mean(&sorted),
        median_net: calculate_median(&sorted),
        std_dev_net: calculate_std_dev(&sorted),
        biggest_win: nets.iter().copied().filter(|n| n.is_positive()).max(),
        biggest_loss: nets.iter().copied().filter(|n| n.is_negative()).min(),
        incomplete_hands: flagged(RecordFlag::Incomplete),
        mismatched_hands: flagged(RecordFlag::ReconciliationMismatch),
    }
}

fn calculate_mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Calculate median from sorted values.
fn calculate_median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 0 {
        // Even: average of two middle values
        let mid = n / 2;
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Population standard deviation.
fn calculate_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = calculate_mean(values);
    let variance = values
        .iter()
        .map(|&v| {
            let diff = v - mean;
            diff * diff
        })
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::Street;
    use crate::reconcile::StreetActions;

    fn record(hand: u64, name: Option<&str>, net: Option<i64>, flags: Vec<RecordFlag>) -> HandRecord {
        let net = net.map(Chips::from_cents);
        HandRecord {
            hand_number: hand,
            seat: 1,
            player_name: name.map(str::to_string),
            starting_stack: None,
            final_stack: None,
            small_blind: None,
            big_blind: None,
            actions: StreetActions::default(),
            pot: None,
            net,
            outcome: net.map(|n| Outcome::from_net(n, Chips::from_cents(1))),
            flags,
            notes: Vec::new(),
            last_street: Street::River,
            started_ms: 0,
            ended_ms: 0,
        }
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(calculate_median(&[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(calculate_median(&[1.0, 2.0, 3.0, 4.0]), 2.5);
        assert_eq!(calculate_median(&[]), 0.0);
    }

    #[test]
    fn test_std_dev() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((calculate_std_dev(&values) - 2.0).abs() < 1e-9);
        assert_eq!(calculate_std_dev(&[]), 0.0);
    }

    #[test]
    fn test_player_summary() {
        let records = vec![
            record(1, Some("Alice"), Some(400), vec![]),
            record(1, Some("Bob"), Some(-400), vec![]),
            record(2, Some("Alice"), Some(-100), vec![RecordFlag::ReconciliationMismatch]),
            record(3, Some("Alice"), None, vec![RecordFlag::Incomplete]),
            record(3, None, Some(0), vec![RecordFlag::Incomplete]),
        ];

        let stats = ReportStats::from_records(&records);
        assert_eq!(stats.total_hands, 3);
        assert_eq!(stats.total_records, 5);
        assert_eq!(stats.flagged_records, 3);
        assert_eq!(stats.unnamed_records, 1);
        assert_eq!(stats.players.len(), 2);

        let alice = &stats.players[0];
        assert_eq!(alice.name, "Alice");
        assert_eq!(alice.hands, 3);
        assert_eq!((alice.wins, alice.losses, alice.break_evens), (1, 1, 0));
        assert_eq!(alice.total_net, Chips::from_cents(300));
        assert!((alice.mean_net - 1.5).abs() < 1e-9);
        assert!((alice.median_net - 1.5).abs() < 1e-9);
        assert_eq!(alice.biggest_win, Some(Chips::from_cents(400)));
        assert_eq!(alice.biggest_loss, Some(Chips::from_cents(-100)));
        assert_eq!(alice.incomplete_hands, 1);
        assert_eq!(alice.mismatched_hands, 1);

        let bob = &stats.players[1];
        assert_eq!(bob.biggest_win, None);
        assert_eq!(bob.losses, 1);
    }
}
