pub mod config;
pub mod content;
mod data;
pub mod dictionary;
pub mod error;
mod fold;
pub mod highlighter;
pub mod interaction;
pub mod labels;
pub mod overlay;
pub mod position;
#[cfg(feature = "runtime")]
pub mod runtime;
pub mod scanner;
pub mod term;
pub mod tracker;

pub use config::{GlossaryConfig, HighlightConfig, TooltipConfig};
pub use content::{ContentNode, Element, Marker, annotate};
pub use dictionary::TermDictionary;
pub use error::GlossaryError;
pub use fold::fold_case;
pub use highlighter::Highlighter;
pub use interaction::{Effect, InteractionEvent, InteractionMachine, InteractionState};
pub use overlay::{MarkerId, MemoryLayer, OverlayContent, OverlayLayer, ViewportBus};
pub use position::{Placement, Rect, Size, TooltipPosition, Viewport};
#[cfg(feature = "runtime")]
pub use runtime::MarkerController;
pub use scanner::{Match, scan};
pub use term::{Category, DefaultLinks, GlossaryTerm, LinkResolver, TermSource, glossary_link};
pub use tracker::OccurrenceSet;

use data::{ArchivedCatalogStore, ArchivedTermRecord};
use fst::Automaton;
use fst::automaton::Str;
use fst::{IntoStreamer, Map, Streamer};
use once_cell::sync::Lazy;
use rkyv::access_unchecked;
use rkyv::util::AlignedVec;
use std::io::Cursor;
use zstd::stream::decode_all;

static GLOSSARY_FST_BYTES: &[u8] = include_bytes!(env!("GLOSSARY_FST"));
static GLOSSARY_DATA_BYTES: &[u8] = include_bytes!(env!("GLOSSARY_DATA"));

static SURFACE_MAP: Lazy<Map<&'static [u8]>> =
    Lazy::new(|| Map::new(GLOSSARY_FST_BYTES).expect("valid glossary fst"));
static DATA_SLICE: Lazy<&'static AlignedVec> = Lazy::new(|| {
    let decompressed =
        decode_all(Cursor::new(GLOSSARY_DATA_BYTES)).expect("decompress glossary catalog");
    let mut aligned = AlignedVec::with_capacity(decompressed.len());
    aligned.extend_from_slice(&decompressed);
    Box::leak(Box::new(aligned))
});
static CATALOG_STORE: Lazy<&'static ArchivedCatalogStore> =
    Lazy::new(|| unsafe { access_unchecked::<ArchivedCatalogStore>(DATA_SLICE.as_slice()) });

fn store() -> &'static ArchivedCatalogStore {
    *CATALOG_STORE
}

/// Read-only access to the built-in glossary.
///
/// Lookups by name are case-insensitive and cover both primary and secondary names.
#[derive(Debug, Clone, Copy, Default)]
pub struct Catalog;

impl Catalog {
    pub fn len() -> usize {
        store().terms.len()
    }

    pub fn is_empty() -> bool {
        store().terms.is_empty()
    }

    /// Entries in catalog order.
    pub fn entries() -> impl Iterator<Item = CatalogEntry<'static>> {
        store()
            .terms
            .iter()
            .enumerate()
            .map(|(index, record)| CatalogEntry {
                index: index as u32,
                record,
            })
    }

    pub fn entry_by_index(index: u32) -> Option<CatalogEntry<'static>> {
        store()
            .terms
            .get(index as usize)
            .map(|record| CatalogEntry { index, record })
    }

    pub fn entry_by_id(id: &str) -> Option<CatalogEntry<'static>> {
        Self::entries().find(|entry| entry.id() == id)
    }

    /// Returns the catalog index for an exact name match.
    pub fn get(name: &str) -> Option<u32> {
        SURFACE_MAP
            .get(fold_case(name.trim()))
            .map(|value| value as u32)
    }

    pub fn entry_by_name(name: &str) -> Option<CatalogEntry<'static>> {
        Self::get(name).and_then(Self::entry_by_index)
    }

    /// Returns up to `limit` folded names that start with `prefix`, in byte order.
    pub fn prefix(prefix: &str, limit: usize) -> Vec<(String, u32)> {
        let folded = fold_case(prefix.trim());
        let automaton = Str::new(&folded).starts_with();
        let mut stream = SURFACE_MAP.search(automaton).into_stream();
        let mut results = Vec::new();
        while results.len() < limit {
            let Some((key, value)) = stream.next() else {
                break;
            };
            let name = String::from_utf8(key.to_vec()).expect("stored name is valid UTF-8");
            results.push((name, value as u32));
        }
        results
    }

    /// Case-insensitive substring search over names, definitions and related terms.
    ///
    /// A blank query matches every entry.
    pub fn search(query: &str, limit: usize) -> Vec<CatalogEntry<'static>> {
        let needle = fold_case(query.trim());
        Self::entries()
            .filter(|entry| needle.is_empty() || entry.matches(&needle))
            .take(limit)
            .collect()
    }

    /// Every primary and secondary name, in catalog order.
    pub fn searchable_names() -> Vec<&'static str> {
        Self::entries().flat_map(|entry| entry.names()).collect()
    }

    pub fn by_category(category: Category) -> Vec<CatalogEntry<'static>> {
        Self::entries()
            .filter(|entry| entry.category() == Some(category))
            .collect()
    }

    pub fn terms() -> Vec<GlossaryTerm> {
        Self::entries().map(|entry| entry.to_term()).collect()
    }
}

impl TermSource for Catalog {
    /// The built-in glossary is the same for every locale.
    fn terms(&self, _locale: &str) -> Vec<GlossaryTerm> {
        Catalog::terms()
    }
}

#[derive(Clone, Copy)]
pub struct CatalogEntry<'a> {
    index: u32,
    record: &'a ArchivedTermRecord,
}

impl std::fmt::Debug for CatalogEntry<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogEntry")
            .field("index", &self.index)
            .field("id", &self.id())
            .finish()
    }
}

impl<'a> CatalogEntry<'a> {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn id(&self) -> &'a str {
        self.record.id.as_str()
    }

    pub fn primary_name(&self) -> &'a str {
        self.record.primary_name.as_str()
    }

    pub fn secondary_name(&self) -> Option<&'a str> {
        self.record.secondary_name.as_ref().map(|name| name.as_str())
    }

    pub fn category(&self) -> Option<Category> {
        self.record.category.as_str().parse().ok()
    }

    pub fn short_definition(&self) -> &'a str {
        self.record.short_definition.as_str()
    }

    pub fn full_explanation(&self) -> &'a str {
        self.record.full_explanation.as_str()
    }

    pub fn related_terms(&self) -> impl Iterator<Item = &'a str> + use<'a> {
        self.record.related_terms.iter().map(|term| term.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &'a str> + use<'a> {
        std::iter::once(self.primary_name()).chain(self.secondary_name())
    }

    pub fn link(&self, locale: &str) -> String {
        glossary_link(locale, self.id())
    }

    fn matches(&self, needle: &str) -> bool {
        self.names()
            .chain([self.short_definition(), self.full_explanation()])
            .chain(self.related_terms())
            .any(|haystack| fold_case(haystack).contains(needle))
    }

    pub fn to_term(&self) -> GlossaryTerm {
        GlossaryTerm {
            id: self.id().to_owned(),
            primary_name: self.primary_name().to_owned(),
            secondary_name: self.secondary_name().map(str::to_owned),
            category: self.category(),
            short_definition: self.short_definition().to_owned(),
            full_explanation: self.full_explanation().to_owned(),
            related_terms: self.related_terms().map(str::to_owned).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_embedded() {
        assert_eq!(Catalog::len(), 60);
        assert!(!Catalog::is_empty());
        let first = Catalog::entry_by_index(0).expect("first entry");
        assert_eq!(first.id(), "kavalactone");
        assert_eq!(first.category(), Some(Category::Chemie));
    }

    #[test]
    fn names_resolve_case_insensitively() {
        let gaba = Catalog::entry_by_name("gaba").expect("gaba");
        assert_eq!(gaba.id(), "gaba");
        let alias = Catalog::entry_by_name("GAMMA-AMINOBUTTERSÄURE").expect("alias");
        assert_eq!(alias.index(), gaba.index());
        assert_eq!(Catalog::get(" Noble Kava "), Catalog::get("edle kava"));
        assert!(Catalog::get("Kav").is_none());
    }

    #[test]
    fn prefix_lists_folded_names_in_order() {
        let names: Vec<String> = Catalog::prefix("Kava", 10)
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(
            names,
            [
                "kava-augen",
                "kava-dermopathie",
                "kava-hautausschlag",
                "kavain",
                "kavalactone"
            ]
        );
        assert_eq!(Catalog::prefix("kava", 2).len(), 2);
    }

    #[test]
    fn search_covers_definitions() {
        let ids: Vec<&str> = Catalog::search("LACTONEN", 60)
            .iter()
            .map(|entry| entry.id())
            .collect();
        assert!(ids.contains(&"kavalactone"));
        assert_eq!(Catalog::search("   ", 100).len(), 60);
        assert!(Catalog::search("zzzz-nothing", 10).is_empty());
    }

    #[test]
    fn categories_partition_the_catalog() {
        let total: usize = Category::ALL
            .iter()
            .map(|category| Catalog::by_category(*category).len())
            .sum();
        assert_eq!(total, Catalog::len());
        assert_eq!(Catalog::by_category(Category::Sicherheit).len(), 5);
    }

    #[test]
    fn searchable_names_include_aliases() {
        let names = Catalog::searchable_names();
        assert!(names.contains(&"Dihydrokavain"));
        assert!(names.contains(&"'Awa"));
        assert_eq!(names[0], "Kavalactone");
    }

    #[test]
    fn entry_iterators_outlive_the_entry() {
        let names = {
            let entry = Catalog::entry_by_id("dhk").expect("dhk");
            entry.names()
        };
        assert_eq!(names.collect::<Vec<_>>(), ["DHK", "Dihydrokavain"]);

        let related = Catalog::entry_by_index(0).map(|entry| entry.related_terms());
        assert!(related.is_some());
    }

    #[test]
    fn catalog_feeds_the_highlighter() {
        let highlighter = Highlighter::new(Catalog);
        let content = ContentNode::element(
            "p",
            vec![ContentNode::text(
                "Noble Kava enthält viel Kavain. Kavain wirkt über GABA.",
            )],
        );
        let annotated = highlighter.highlight("de", &content);
        let ids: Vec<&str> = annotated
            .markers()
            .iter()
            .map(|marker| marker.term.id.as_str())
            .collect();
        assert_eq!(ids, ["noble-kava", "kavain", "gaba"]);

        let overlay = highlighter.overlay_for(annotated.markers()[0], "en");
        assert_eq!(overlay.link, "/en/glossary#noble-kava");
        assert_eq!(overlay.subtitle.as_deref(), Some("Edle Kava"));
    }

    #[test]
    fn entry_converts_to_term() {
        let term = Catalog::entry_by_id("dhk").expect("dhk").to_term();
        assert_eq!(term.primary_name, "DHK");
        assert_eq!(term.secondary_name.as_deref(), Some("Dihydrokavain"));
        assert!(term.is_well_formed());
        assert_eq!(Catalog.terms("fr").len(), 60);
    }
}
