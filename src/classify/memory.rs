//! Document memory: per-session registry of character and place names.
//!
//! Weights only grow within a session (high additions count 2, medium 1).
//! Derived confidence: weight ≥3 → high, ≥1 → medium, otherwise unknown.
//! Not thread-safe by intent; one instance per document session, passed `&mut`
//! down the single classification call stack. Cleared on new-document load.

use serde::Serialize;
use std::collections::HashMap;

use crate::vocab::normalize_name;

/// Confidence attached to a single addition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddConfidence {
    High,
    Medium,
}

impl AddConfidence {
    fn weight(self) -> u32 {
        match self {
            Self::High => 2,
            Self::Medium => 1,
        }
    }
}

/// Confidence derived from the accumulated weight of a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KnownConfidence {
    Unknown,
    Medium,
    High,
}

impl KnownConfidence {
    fn from_weight(w: u32) -> Self {
        if w >= 3 {
            Self::High
        } else if w >= 1 {
            Self::Medium
        } else {
            Self::Unknown
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentMemory {
    characters: HashMap<String, u32>,
    places: HashMap<String, u32>,
}

impl DocumentMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_character(&mut self, name: &str, confidence: AddConfidence) {
        add(&mut self.characters, name, confidence);
    }

    pub fn add_place(&mut self, place: &str, confidence: AddConfidence) {
        add(&mut self.places, place, confidence);
    }

    pub fn is_known_character(&self, name: &str) -> KnownConfidence {
        KnownConfidence::from_weight(self.character_weight(name))
    }

    pub fn is_known_place(&self, place: &str) -> KnownConfidence {
        KnownConfidence::from_weight(lookup(&self.places, place))
    }

    /// Raw accumulated weight (0 when never seen).
    pub fn character_weight(&self, name: &str) -> u32 {
        lookup(&self.characters, name)
    }

    pub fn len(&self) -> usize {
        self.characters.len() + self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// New-document load.
    pub fn clear(&mut self) {
        self.characters.clear();
        self.places.clear();
    }
}

fn add(map: &mut HashMap<String, u32>, raw: &str, confidence: AddConfidence) {
    let key = normalize_name(raw);
    if key.is_empty() {
        return;
    }
    let entry = map.entry(key).or_insert(0);
    *entry = entry.saturating_add(confidence.weight());
}

fn lookup(map: &HashMap<String, u32>, raw: &str) -> u32 {
    map.get(&normalize_name(raw)).copied().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_high_additions_are_high() {
        let mut m = DocumentMemory::new();
        for _ in 0..3 {
            m.add_character("أحمد:", AddConfidence::High);
        }
        assert_eq!(m.is_known_character("أحمد"), KnownConfidence::High);
    }

    #[test]
    fn single_medium_is_medium() {
        let mut m = DocumentMemory::new();
        m.add_character("سارة", AddConfidence::Medium);
        assert_eq!(m.is_known_character("سارة"), KnownConfidence::Medium);
        assert_eq!(m.is_known_character("ليلى"), KnownConfidence::Unknown);
    }

    #[test]
    fn single_high_is_still_medium() {
        let mut m = DocumentMemory::new();
        m.add_character("أحمد", AddConfidence::High);
        assert_eq!(m.character_weight("أحمد"), 2);
        assert_eq!(m.is_known_character("احمد"), KnownConfidence::Medium);
    }

    #[test]
    fn weights_never_decrease_and_clear_resets() {
        let mut m = DocumentMemory::new();
        let mut last = 0;
        for conf in [AddConfidence::Medium, AddConfidence::High, AddConfidence::Medium] {
            m.add_character("عمر", conf);
            let w = m.character_weight("عمر");
            assert!(w >= last);
            last = w;
        }
        m.add_place("المقهى", AddConfidence::High);
        assert!(!m.is_empty());
        m.clear();
        assert!(m.is_empty());
    }
}
