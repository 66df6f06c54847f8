use std::collections::HashSet;

/// Term ids already highlighted during one occurrence pass.
///
/// Create one per top-level render and drop it afterwards; the highlighter never keeps
/// one across passes.
#[derive(Debug, Clone, Default)]
pub struct OccurrenceSet {
    seen: HashSet<String>,
}

impl OccurrenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `term_id`; returns `false` if it had already been recorded.
    pub fn insert(&mut self, term_id: &str) -> bool {
        if self.seen.contains(term_id) {
            return false;
        }
        self.seen.insert(term_id.to_owned())
    }

    pub fn contains(&self, term_id: &str) -> bool {
        self.seen.contains(term_id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_idempotent() {
        let mut seen = OccurrenceSet::new();
        assert!(seen.insert("gaba"));
        assert!(!seen.insert("gaba"));
        assert!(seen.contains("gaba"));
        assert_eq!(seen.len(), 1);
        seen.clear();
        assert!(seen.is_empty());
    }
}
