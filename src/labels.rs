//! Localised tooltip microcopy.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::term::Category;

pub const DEFAULT_LOCALE: &str = "de";

static LABELS_JSON: &str = include_str!("../data/labels.json");

static LABELS: Lazy<HashMap<String, LocaleLabels>> =
    Lazy::new(|| serde_json::from_str(LABELS_JSON).expect("valid embedded labels"));

#[derive(Debug, Clone, Deserialize)]
pub struct LocaleLabels {
    pub more_info: String,
    #[serde(default)]
    categories: HashMap<String, String>,
}

impl LocaleLabels {
    pub fn category(&self, category: Category) -> Option<&str> {
        self.categories.get(category.as_str()).map(String::as_str)
    }
}

pub fn has_locale(locale: &str) -> bool {
    LABELS.contains_key(locale)
}

pub fn locales() -> impl Iterator<Item = &'static str> {
    LABELS.keys().map(String::as_str)
}

/// Labels for `locale`, or for [`DEFAULT_LOCALE`] when the locale has none.
pub fn labels(locale: &str) -> &'static LocaleLabels {
    labels_with_fallback(locale, DEFAULT_LOCALE)
}

pub fn labels_with_fallback(locale: &str, fallback: &str) -> &'static LocaleLabels {
    LABELS
        .get(locale)
        .or_else(|| LABELS.get(fallback))
        .or_else(|| LABELS.get(DEFAULT_LOCALE))
        .expect("default locale labels are embedded")
}

pub fn more_info(locale: &str) -> &'static str {
    &labels(locale).more_info
}

/// Category heading, falling back to the default locale and then the raw key.
pub fn category_label(locale: &str, category: Category) -> &'static str {
    labels(locale)
        .category(category)
        .or_else(|| labels(DEFAULT_LOCALE).category(category))
        .unwrap_or(category.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_locales() {
        assert_eq!(more_info("de"), "Mehr Infos");
        assert_eq!(more_info("en"), "More Info");
        assert_eq!(more_info("fr"), "Plus d'infos");
        assert_eq!(locales().count(), 22);
    }

    #[test]
    fn unknown_locale_falls_back_to_german() {
        assert!(!has_locale("xx"));
        assert_eq!(more_info("xx"), "Mehr Infos");
        assert_eq!(labels_with_fallback("xx", "en").more_info, "More Info");
    }

    #[test]
    fn category_labels_resolve() {
        assert_eq!(category_label("en", Category::Chemie), "Chemistry & Compounds");
        assert_eq!(category_label("xx", Category::Sicherheit), "Sicherheit");
    }
}
