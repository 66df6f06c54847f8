use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Topic buckets used by the glossary page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Chemie,
    Wirkung,
    Kultur,
    Sorten,
    Zubereitung,
    Sicherheit,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Chemie,
        Category::Wirkung,
        Category::Kultur,
        Category::Sorten,
        Category::Zubereitung,
        Category::Sicherheit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Chemie => "chemie",
            Category::Wirkung => "wirkung",
            Category::Kultur => "kultur",
            Category::Sorten => "sorten",
            Category::Zubereitung => "zubereitung",
            Category::Sicherheit => "sicherheit",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| format!("unknown glossary category {value:?}"))
    }
}

/// One glossary entry as supplied by the term source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GlossaryTerm {
    pub id: String,
    pub primary_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default)]
    pub short_definition: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub full_explanation: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_terms: Vec<String>,
}

impl GlossaryTerm {
    pub fn new(
        id: impl Into<String>,
        primary_name: impl Into<String>,
        short_definition: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            primary_name: primary_name.into(),
            secondary_name: None,
            category: None,
            short_definition: short_definition.into(),
            full_explanation: String::new(),
            related_terms: Vec::new(),
        }
    }

    pub fn with_secondary_name(mut self, name: impl Into<String>) -> Self {
        self.secondary_name = Some(name.into());
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    /// Entries without an id or a primary name cannot be highlighted or linked.
    pub fn is_well_formed(&self) -> bool {
        !self.id.trim().is_empty() && !self.primary_name.trim().is_empty()
    }

    /// Primary name followed by the secondary name, when present and non-empty.
    pub fn surface_forms(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary_name.as_str()).chain(
            self.secondary_name
                .as_deref()
                .filter(|name| !name.trim().is_empty()),
        )
    }
}

/// Supplies the ordered term list for a locale.
pub trait TermSource: Send + Sync {
    fn terms(&self, locale: &str) -> Vec<GlossaryTerm>;
}

impl TermSource for Vec<GlossaryTerm> {
    fn terms(&self, _locale: &str) -> Vec<GlossaryTerm> {
        self.clone()
    }
}

/// Resolves the locale-aware detail page for a term.
pub trait LinkResolver: Send + Sync {
    fn glossary_link(&self, locale: &str, term_id: &str) -> String;
}

/// Fallback routing used when the host does not supply its own resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultLinks;

impl LinkResolver for DefaultLinks {
    fn glossary_link(&self, locale: &str, term_id: &str) -> String {
        glossary_link(locale, term_id)
    }
}

pub fn glossary_link(locale: &str, term_id: &str) -> String {
    format!("/{locale}/glossary#{term_id}")
}
