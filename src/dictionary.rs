//! Case-folded lookup table from surface form to glossary term.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::fold::fold_case;
use crate::term::GlossaryTerm;

/// A single surface form and the term it resolves to.
#[derive(Debug, Clone)]
pub struct DictionaryEntry {
    key: String,
    term: Arc<GlossaryTerm>,
}

impl DictionaryEntry {
    /// Case-folded surface form.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn term(&self) -> &Arc<GlossaryTerm> {
        &self.term
    }

    fn char_len(&self) -> usize {
        self.key.chars().count()
    }
}

/// Surface-form dictionary built once per (locale, exclusion list).
///
/// Keys keep the order in which they were first inserted. Re-inserting an existing key
/// replaces its term but not its position, so the last term to claim a surface form
/// wins while iteration order stays deterministic.
#[derive(Debug, Clone, Default)]
pub struct TermDictionary {
    entries: Vec<DictionaryEntry>,
    positions: HashMap<String, usize>,
    by_length: Vec<usize>,
}

impl TermDictionary {
    pub fn build<S: AsRef<str>>(terms: &[GlossaryTerm], excluded: &[S]) -> Self {
        let excluded: HashSet<String> = excluded
            .iter()
            .map(|name| fold_case(name.as_ref().trim()))
            .collect();

        let mut dictionary = TermDictionary::default();
        for term in terms {
            if !term.is_well_formed() {
                debug!(id = %term.id, "dropping glossary entry without id or primary name");
                continue;
            }
            let shared = Arc::new(term.clone());
            for surface in shared.surface_forms() {
                let key = fold_case(surface);
                if excluded.contains(&key) {
                    continue;
                }
                dictionary.insert(key, Arc::clone(&shared));
            }
        }

        let mut by_length: Vec<usize> = (0..dictionary.entries.len()).collect();
        // Stable sort: equal lengths keep insertion order.
        by_length.sort_by_key(|&idx| std::cmp::Reverse(dictionary.entries[idx].char_len()));
        dictionary.by_length = by_length;

        debug!(
            keys = dictionary.entries.len(),
            excluded = excluded.len(),
            "built glossary dictionary"
        );
        dictionary
    }

    fn insert(&mut self, key: String, term: Arc<GlossaryTerm>) {
        match self.positions.get(&key) {
            Some(&idx) => self.entries[idx].term = term,
            None => {
                self.positions.insert(key.clone(), self.entries.len());
                self.entries.push(DictionaryEntry { key, term });
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Case-insensitive exact lookup.
    pub fn get(&self, surface: &str) -> Option<&Arc<GlossaryTerm>> {
        self.positions
            .get(&fold_case(surface))
            .map(|&idx| &self.entries[idx].term)
    }

    pub fn contains(&self, surface: &str) -> bool {
        self.get(surface).is_some()
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = &DictionaryEntry> {
        self.entries.iter()
    }

    /// Entries ordered longest key first (character count), ties in insertion order.
    /// This is the order in which the scanner tries keys at each position.
    pub fn entries_by_length(&self) -> impl Iterator<Item = &DictionaryEntry> {
        self.by_length.iter().map(|&idx| &self.entries[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_terms() -> Vec<GlossaryTerm> {
        vec![
            GlossaryTerm::new("kavalactone", "Kavalactone", "Die psychoaktiven Wirkstoffe"),
            GlossaryTerm::new("gaba", "GABA", "Hemmender Neurotransmitter")
                .with_secondary_name("Gamma-Aminobuttersäure"),
            GlossaryTerm::new("noble-kava", "Noble Kava", "Edle Sorten")
                .with_secondary_name("Edle Kava"),
        ]
    }

    #[test]
    fn builds_primary_and_secondary_keys() {
        let dictionary = TermDictionary::build::<&str>(&sample_terms(), &[]);
        assert_eq!(dictionary.len(), 5);
        assert_eq!(dictionary.get("gamma-aminobuttersäure").unwrap().id, "gaba");
        assert_eq!(dictionary.get("GABA").unwrap().id, "gaba");
        assert_eq!(dictionary.get("edle kava").unwrap().id, "noble-kava");
    }

    #[test]
    fn exclusions_are_case_insensitive_and_per_surface() {
        let dictionary = TermDictionary::build(&sample_terms(), &["KAVALACTONE", "gaba"]);
        assert!(!dictionary.contains("Kavalactone"));
        assert!(!dictionary.contains("GABA"));
        // The secondary name survives when only the primary is excluded.
        assert_eq!(dictionary.get("Gamma-Aminobuttersäure").unwrap().id, "gaba");
    }

    #[test]
    fn malformed_entries_are_dropped() {
        let terms = vec![
            GlossaryTerm::new("empty", "  ", "no name"),
            GlossaryTerm::new("", "Orphan", "no id"),
            GlossaryTerm::new("krunk", "Krunk", "Zustand"),
        ];
        let dictionary = TermDictionary::build::<&str>(&terms, &[]);
        assert_eq!(dictionary.len(), 1);
        assert!(dictionary.contains("krunk"));
    }

    #[test]
    fn empty_terms_yield_empty_dictionary() {
        let dictionary = TermDictionary::build::<&str>(&[], &[]);
        assert!(dictionary.is_empty());
        assert_eq!(dictionary.entries_by_length().count(), 0);
    }

    #[test]
    fn later_term_wins_shared_surface_without_moving_key() {
        let terms = vec![
            GlossaryTerm::new("first", "Shell", "Kokosnussschale"),
            GlossaryTerm::new("other", "Bula", "Gruß"),
            GlossaryTerm::new("second", "shell", "Trinkschale"),
        ];
        let dictionary = TermDictionary::build::<&str>(&terms, &[]);
        assert_eq!(dictionary.len(), 2);
        assert_eq!(dictionary.get("Shell").unwrap().id, "second");
        let keys: Vec<_> = dictionary.entries().map(DictionaryEntry::key).collect();
        assert_eq!(keys, vec!["shell", "bula"]);
    }

    #[test]
    fn self_alias_is_inserted_once() {
        let terms = vec![GlossaryTerm::new("fkb", "FKB", "").with_secondary_name("fkb")];
        let dictionary = TermDictionary::build::<&str>(&terms, &[]);
        assert_eq!(dictionary.len(), 1);
    }

    #[test]
    fn length_order_is_longest_first_with_stable_ties() {
        let terms = vec![
            GlossaryTerm::new("kava", "Kava", ""),
            GlossaryTerm::new("waka", "Waka", ""),
            GlossaryTerm::new("noble-kava", "Noble Kava", ""),
        ];
        let dictionary = TermDictionary::build::<&str>(&terms, &[]);
        let keys: Vec<_> = dictionary
            .entries_by_length()
            .map(DictionaryEntry::key)
            .collect();
        assert_eq!(keys, vec!["noble kava", "kava", "waka"]);
    }
}
