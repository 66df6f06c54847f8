//! Longest-match, whole-word term scanning over a single text run.

use std::sync::Arc;

use tracing::trace;

use crate::dictionary::{DictionaryEntry, TermDictionary};
use crate::fold::is_word_char;
use crate::term::GlossaryTerm;
use crate::tracker::OccurrenceSet;

/// One term occurrence. Offsets are byte offsets into the scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub term: Arc<GlossaryTerm>,
    pub matched_text: String,
    pub start: usize,
    pub end: usize,
}

/// Case-folded copy of a text run that remembers where each original character landed.
struct FoldedText {
    folded: String,
    /// `(original offset, folded offset)` per original character, plus a sentinel for
    /// the end of the text. Both columns are strictly increasing.
    groups: Vec<(usize, usize)>,
}

impl FoldedText {
    fn new(text: &str) -> Self {
        let mut folded = String::with_capacity(text.len());
        let mut groups = Vec::with_capacity(text.len() + 1);
        for (offset, ch) in text.char_indices() {
            groups.push((offset, folded.len()));
            folded.extend(ch.to_lowercase());
        }
        groups.push((text.len(), folded.len()));
        Self { folded, groups }
    }

    /// Group index whose folded offset is exactly `folded_offset`, if any. A key that
    /// ends inside the expansion of a single character does not end on a boundary.
    fn group_at(&self, folded_offset: usize) -> Option<usize> {
        self.groups
            .binary_search_by_key(&folded_offset, |&(_, folded)| folded)
            .ok()
    }
}

/// Finds every non-overlapping whole-word occurrence of a dictionary key in `text`.
///
/// At each word start the longest key that matches and ends on a word boundary wins;
/// the scan then resumes after it, so text consumed by a match is never rescanned.
/// With a tracker, a term already in it is skipped (its text is still consumed) and
/// every emitted term is added to it.
pub fn scan(
    text: &str,
    dictionary: &TermDictionary,
    mut tracker: Option<&mut OccurrenceSet>,
) -> Vec<Match> {
    if text.is_empty() || dictionary.is_empty() {
        return Vec::new();
    }

    let folded = FoldedText::new(text);
    let last = folded.groups.len() - 1;
    let mut matches = Vec::new();
    let mut group = 0;

    while group < last {
        let (start, folded_start) = folded.groups[group];
        let boundary_before = text[..start]
            .chars()
            .next_back()
            .is_none_or(|ch| !is_word_char(ch));
        if !boundary_before {
            group += 1;
            continue;
        }

        let Some((entry, end_group)) = longest_at(text, &folded, folded_start, dictionary) else {
            group += 1;
            continue;
        };

        let end = folded.groups[end_group].0;
        let term = entry.term();
        let accepted = match tracker.as_deref_mut() {
            Some(seen) => seen.insert(&term.id),
            None => true,
        };
        if accepted {
            matches.push(Match {
                term: Arc::clone(term),
                matched_text: text[start..end].to_owned(),
                start,
                end,
            });
        } else {
            trace!(id = %term.id, start, "skipping repeated glossary term");
        }
        group = end_group;
    }

    matches
}

fn longest_at<'d>(
    text: &str,
    folded: &FoldedText,
    folded_start: usize,
    dictionary: &'d TermDictionary,
) -> Option<(&'d DictionaryEntry, usize)> {
    let rest = &folded.folded[folded_start..];
    dictionary.entries_by_length().find_map(|entry| {
        if !rest.starts_with(entry.key()) {
            return None;
        }
        let end_group = folded.group_at(folded_start + entry.key().len())?;
        let end = folded.groups[end_group].0;
        let boundary_after = text[end..].chars().next().is_none_or(|ch| !is_word_char(ch));
        boundary_after.then_some((entry, end_group))
    })
}
