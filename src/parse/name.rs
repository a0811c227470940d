//! Player names: cleanup and fuzzy correction against names already seen.

use std::collections::BTreeMap;

/// Trims, keeps alphanumerics plus `_ - .` and spaces, collapses whitespace.
///
/// Returns `None` when nothing alphanumeric remains.
pub fn clean_name(text: &str) -> Option<String> {
    let kept: String = text
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.') || c.is_whitespace())
        .collect();
    let collapsed = kept.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().any(char::is_alphanumeric) {
        Some(collapsed)
    } else {
        None
    }
}

/// Levenshtein distance over chars.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != *cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Names confirmed during the session and how often each was read.
///
/// Only the processing side mutates it (`observe`); the frame state builder
/// gets a shared reference.
#[derive(Debug, Clone, Default)]
pub struct NameRegistry {
    sightings: BTreeMap<String, u32>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sightings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sightings.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sightings.contains_key(name)
    }

    pub fn sightings(&self, name: &str) -> u32 {
        self.sightings.get(name).copied().unwrap_or(0)
    }

    /// Records one confident reading of `name`.
    pub fn observe(&mut self, name: &str) {
        *self.sightings.entry(name.to_string()).or_insert(0) += 1;
    }

    /// Closest known name within `max_distance` edits, if any.
    ///
    /// The distance is further capped at one edit per four characters of
    /// `candidate`, so names shorter than four characters only match exactly.
    /// Ties go to the name seen most often, then to the lexicographically
    /// smallest (the map iterates in order, so the first wins).
    pub fn closest(&self, candidate: &str, max_distance: usize) -> Option<&str> {
        if self.sightings.contains_key(candidate) {
            return self.sightings.get_key_value(candidate).map(|(k, _)| k.as_str());
        }

        let max_distance = max_distance.min(candidate.chars().count() / 4);
        let mut best: Option<(&str, usize, u32)> = None;
        for (known, &count) in &self.sightings {
            let distance = edit_distance(candidate, known);
            if distance > max_distance {
                continue;
            }
            let better = match best {
                None => true,
                Some((_, d, c)) => distance < d || (distance == d && count > c),
            };
            if better {
                best = Some((known.as_str(), distance, count));
            }
        }
        best.map(|(name, _, _)| name)
    }

    /// Cleans a raw reading and snaps it to a known name when one is close.
    pub fn resolve(&self, raw: &str, max_distance: usize) -> Option<String> {
        let cleaned = clean_name(raw)?;
        match self.closest(&cleaned, max_distance) {
            Some(known) => Some(known.to_string()),
            None => Some(cleaned),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_name() {
        assert_eq!(clean_name("  Player_One \n"), Some("Player_One".to_string()));
        assert_eq!(clean_name("Big   Fish!"), Some("Big Fish".to_string()));
        assert_eq!(clean_name("j.doe-99"), Some("j.doe-99".to_string()));
        assert_eq!(clean_name(" ._- "), None);
        assert_eq!(clean_name(""), None);
    }

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("PlayerNamel", "PlayerName1"), 1);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("same", "same"), 0);
    }

    #[test]
    fn test_resolve_corrects_drift() {
        let mut registry = NameRegistry::new();
        registry.observe("PlayerName1");

        assert_eq!(registry.resolve("PlayerNamel", 2), Some("PlayerName1".to_string()));
        assert_eq!(registry.resolve("SomeoneElse", 2), Some("SomeoneElse".to_string()));
        assert_eq!(registry.resolve("!!", 2), None);
    }

    #[test]
    fn test_tie_prefers_most_seen_then_lexicographic() {
        let mut registry = NameRegistry::new();
        registry.observe("Bob1");
        registry.observe("Bob2");
        registry.observe("Bob2");

        // "Bob3" is one edit from both
        assert_eq!(registry.closest("Bob3", 2), Some("Bob2"));

        registry.observe("Bob1");
        assert_eq!(registry.closest("Bob3", 2), Some("Bob1"));
    }

    #[test]
    fn test_short_names_stay_distinct() {
        let mut registry = NameRegistry::new();
        registry.observe("Tom");
        assert_eq!(registry.closest("Tim", 2), None);
        assert_eq!(registry.resolve("Tim", 2), Some("Tim".to_string()));

        registry.observe("Tomas");
        assert_eq!(registry.closest("Tomaz", 2), Some("Tomas"));
        assert_eq!(registry.closest("Tumaz", 2), None, "five characters allow one edit");
        registry.observe("Jo");
        assert_eq!(registry.closest("Jo", 2), Some("Jo"));
    }

    #[test]
    fn test_exact_match_short_circuits() {
        let mut registry = NameRegistry::new();
        registry.observe("Ann");
        registry.observe("Anna");
        assert_eq!(registry.closest("Ann", 2), Some("Ann"));
        assert_eq!(registry.sightings("Anna"), 1);
        assert!(!registry.contains("Annie"));
    }
}
