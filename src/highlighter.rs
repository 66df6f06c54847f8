//! Memoised highlighting over a term source.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::config::HighlightConfig;
use crate::content::{ContentNode, Marker, annotate};
use crate::dictionary::TermDictionary;
use crate::fold::fold_case;
use crate::overlay::OverlayContent;
use crate::term::{DefaultLinks, LinkResolver, TermSource};
use crate::tracker::OccurrenceSet;

/// Locale plus the folded, sorted, de-duplicated exclusion list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DictionaryKey {
    locale: String,
    excluded: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ContentKey {
    dictionary: DictionaryKey,
    first_occurrence_only: bool,
    content: ContentNode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub dictionaries: usize,
    pub annotated: usize,
    pub capacity: usize,
}

/// Builds dictionaries per locale and annotates content, re-running a pass only when
/// the content, locale or configuration changed.
pub struct Highlighter<S: TermSource> {
    source: S,
    links: Box<dyn LinkResolver>,
    config: HighlightConfig,
    excluded: Vec<String>,
    dictionaries: Mutex<LruCache<DictionaryKey, Arc<TermDictionary>>>,
    annotated: Mutex<LruCache<ContentKey, Arc<ContentNode>>>,
}

impl<S: TermSource> Highlighter<S> {
    pub fn new(source: S) -> Self {
        Self::with_config(source, HighlightConfig::default())
    }

    pub fn with_config(source: S, config: HighlightConfig) -> Self {
        let capacity = NonZeroUsize::new(config.cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            source,
            links: Box::new(DefaultLinks),
            excluded: normalise_exclusions(&config.excluded_terms),
            config,
            dictionaries: Mutex::new(LruCache::new(capacity)),
            annotated: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Replaces the routing collaborator used for overlay links.
    pub fn with_links(mut self, links: impl LinkResolver + 'static) -> Self {
        self.links = Box::new(links);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &HighlightConfig {
        &self.config
    }

    pub fn set_excluded_terms<T: AsRef<str>>(&mut self, terms: &[T]) {
        self.config.excluded_terms = terms.iter().map(|term| term.as_ref().to_owned()).collect();
        self.excluded = normalise_exclusions(&self.config.excluded_terms);
        self.invalidate();
    }

    pub fn set_first_occurrence_only(&mut self, enabled: bool) {
        if self.config.first_occurrence_only != enabled {
            self.config.first_occurrence_only = enabled;
            self.invalidate();
        }
    }

    /// Drops every memoised dictionary and annotation, e.g. after the term source
    /// changed underneath.
    pub fn invalidate(&self) {
        self.dictionaries.lock().clear();
        self.annotated.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        let dictionaries = self.dictionaries.lock();
        CacheStats {
            dictionaries: dictionaries.len(),
            annotated: self.annotated.lock().len(),
            capacity: dictionaries.cap().get(),
        }
    }

    /// The dictionary for `locale` under the current exclusion list.
    pub fn dictionary(&self, locale: &str) -> Arc<TermDictionary> {
        let key = self.dictionary_key(locale);
        self.dictionary_for(key)
    }

    fn dictionary_key(&self, locale: &str) -> DictionaryKey {
        DictionaryKey {
            locale: locale.to_owned(),
            excluded: self.excluded.clone(),
        }
    }

    fn dictionary_for(&self, key: DictionaryKey) -> Arc<TermDictionary> {
        if let Some(dictionary) = self.dictionaries.lock().get(&key) {
            return Arc::clone(dictionary);
        }
        debug!(locale = %key.locale, excluded = key.excluded.len(), "building term dictionary");
        let terms = self.source.terms(&key.locale);
        let dictionary = Arc::new(TermDictionary::build(&terms, &key.excluded));
        self.dictionaries.lock().put(key, Arc::clone(&dictionary));
        dictionary
    }

    fn tracker(&self) -> Option<OccurrenceSet> {
        self.config.first_occurrence_only.then(OccurrenceSet::new)
    }

    /// Annotates `content` for `locale` in one occurrence pass.
    pub fn highlight(&self, locale: &str, content: &ContentNode) -> Arc<ContentNode> {
        let key = ContentKey {
            dictionary: self.dictionary_key(locale),
            first_occurrence_only: self.config.first_occurrence_only,
            content: content.clone(),
        };
        if let Some(cached) = self.annotated.lock().get(&key) {
            trace!(locale, "annotated content served from cache");
            return Arc::clone(cached);
        }

        let dictionary = self.dictionary_for(key.dictionary.clone());
        let mut tracker = self.tracker();
        let annotated = Arc::new(annotate(content, &dictionary, tracker.as_mut()));
        trace!(locale, markers = annotated.markers().len(), "annotated content");
        self.annotated.lock().put(key, Arc::clone(&annotated));
        annotated
    }

    /// Splits a plain string into text and marker segments. Shares the annotated cache
    /// with [`Highlighter::highlight`].
    pub fn highlight_text(&self, locale: &str, text: &str) -> Vec<ContentNode> {
        if text.is_empty() {
            return Vec::new();
        }
        match &*self.highlight(locale, &ContentNode::text(text)) {
            ContentNode::Fragment(segments) => segments.clone(),
            other => vec![other.clone()],
        }
    }

    /// Overlay content for `marker`. Labels fall back to the configured default locale.
    pub fn overlay_for(&self, marker: &Marker, locale: &str) -> OverlayContent {
        OverlayContent::with_fallback(
            &marker.term,
            locale,
            &self.config.default_locale,
            self.links.as_ref(),
        )
    }
}

fn normalise_exclusions<T: AsRef<str>>(terms: &[T]) -> Vec<String> {
    let mut folded: Vec<String> = terms
        .iter()
        .map(|term| fold_case(term.as_ref().trim()))
        .filter(|term| !term.is_empty())
        .collect();
    folded.sort();
    folded.dedup();
    folded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::GlossaryTerm;

    fn terms() -> Vec<GlossaryTerm> {
        vec![
            GlossaryTerm::new("kava", "Kava", "Piper methysticum."),
            GlossaryTerm::new("noble-kava", "Noble Kava", "Traditional cultivars."),
            GlossaryTerm::new("gaba", "GABA", "Neurotransmitter.")
                .with_secondary_name("Gamma-Aminobuttersäure"),
        ]
    }

    fn paragraph(text: &str) -> ContentNode {
        ContentNode::element("p", vec![ContentNode::text(text)])
    }

    struct CustomLinks;

    impl LinkResolver for CustomLinks {
        fn glossary_link(&self, locale: &str, term_id: &str) -> String {
            format!("https://example.org/{locale}/terms/{term_id}")
        }
    }

    #[test]
    fn highlight_is_memoised() {
        let highlighter = Highlighter::new(terms());
        let content = paragraph("Kava and GABA");
        let first = highlighter.highlight("de", &content);
        let second = highlighter.highlight("de", &content);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.markers().len(), 2);

        let other_locale = highlighter.highlight("en", &content);
        assert!(!Arc::ptr_eq(&first, &other_locale));
        assert_eq!(highlighter.stats().dictionaries, 2);
    }

    #[test]
    fn each_pass_starts_with_a_fresh_tracker() {
        let highlighter = Highlighter::new(terms());
        let first = highlighter.highlight("de", &paragraph("Kava, Kava"));
        let second = highlighter.highlight("de", &paragraph("Kava again"));
        assert_eq!(first.markers().len(), 1);
        assert_eq!(second.markers().len(), 1);
    }

    #[test]
    fn exclusions_rebuild_the_dictionary() {
        let mut highlighter = Highlighter::new(terms());
        let before = highlighter.dictionary("de");
        assert!(before.contains("kava"));

        highlighter.set_excluded_terms(&["KAVA"]);
        let after = highlighter.dictionary("de");
        assert!(!after.contains("kava"));
        assert!(after.contains("noble kava"));
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(highlighter.stats().dictionaries, 1);
    }

    #[test]
    fn exclusion_order_and_case_share_a_dictionary() {
        let mut highlighter = Highlighter::new(terms());
        highlighter.set_excluded_terms(&["Kava", "gaba"]);
        let first = highlighter.dictionary_key("de");
        highlighter.set_excluded_terms(&["GABA", " kava", "Kava", ""]);
        assert_eq!(highlighter.dictionary_key("de"), first);
        assert_eq!(first.excluded, vec!["gaba".to_string(), "kava".to_string()]);
    }

    #[test]
    fn first_occurrence_toggle_invalidates() {
        let mut highlighter = Highlighter::new(terms());
        let content = paragraph("Kava, Kava");
        assert_eq!(highlighter.highlight("de", &content).markers().len(), 1);
        highlighter.set_first_occurrence_only(false);
        assert_eq!(highlighter.stats().annotated, 0);
        assert_eq!(highlighter.highlight("de", &content).markers().len(), 2);
    }

    #[test]
    fn highlight_text_returns_segments() {
        let highlighter = Highlighter::new(terms());
        let segments = highlighter.highlight_text("de", "Noble Kava is strong");
        assert_eq!(segments.len(), 2);
        assert!(matches!(&segments[0], ContentNode::Marker(m) if m.term.id == "noble-kava"));
        assert_eq!(segments[1], ContentNode::text(" is strong"));

        let plain = highlighter.highlight_text("de", "nothing here");
        assert_eq!(plain, vec![ContentNode::text("nothing here")]);
        assert!(highlighter.highlight_text("de", "").is_empty());
    }

    #[test]
    fn highlight_text_is_memoised() {
        let highlighter = Highlighter::new(terms());
        let first = highlighter.highlight_text("de", "Kava ist gut");
        assert_eq!(highlighter.stats().annotated, 1);
        let second = highlighter.highlight_text("de", "Kava ist gut");
        assert_eq!(highlighter.stats().annotated, 1);
        assert_eq!(first, second);
        assert!(matches!(&first[0], ContentNode::Marker(m) if m.term.id == "kava"));

        highlighter.highlight_text("de", "Kava ist sehr gut");
        assert_eq!(highlighter.stats().annotated, 2);
    }

    #[test]
    fn empty_source_degrades_to_no_highlighting() {
        let highlighter = Highlighter::new(Vec::<GlossaryTerm>::new());
        let content = paragraph("Kava");
        assert_eq!(*highlighter.highlight("de", &content), content);
    }

    #[test]
    fn overlay_uses_configured_links() {
        let highlighter = Highlighter::new(terms()).with_links(CustomLinks);
        let annotated = highlighter.highlight("en", &paragraph("GABA"));
        let marker = annotated.markers()[0].clone();
        let overlay = highlighter.overlay_for(&marker, "en");
        assert_eq!(overlay.link, "https://example.org/en/terms/gaba");
        assert_eq!(overlay.subtitle.as_deref(), Some("Gamma-Aminobuttersäure"));
    }

    #[test]
    fn overlay_labels_fall_back_to_configured_locale() {
        let config = HighlightConfig {
            default_locale: "en".into(),
            ..HighlightConfig::default()
        };
        let highlighter = Highlighter::with_config(terms(), config);
        let annotated = highlighter.highlight("xx", &paragraph("GABA"));
        let marker = annotated.markers()[0].clone();
        assert_eq!(highlighter.overlay_for(&marker, "xx").link_label, "More Info");
        assert_eq!(highlighter.overlay_for(&marker, "de").link_label, "Mehr Infos");

        let default = Highlighter::new(terms());
        assert_eq!(default.overlay_for(&marker, "xx").link_label, "Mehr Infos");
    }

    #[test]
    fn zero_capacity_still_caches_one_entry() {
        let config = HighlightConfig {
            cache_capacity: 0,
            ..HighlightConfig::default()
        };
        let highlighter = Highlighter::with_config(terms(), config);
        assert_eq!(highlighter.stats().capacity, 1);
    }
}
