use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;

use super::locale::Locale;

/// Per-locale fields shared by the practice and service directories.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, TS)]
pub struct LocalizedEntry {
    pub locale: Locale,
    pub title: String,
    pub slug: String,
    pub summary: Option<String>,
    pub content: Option<String>,
}

impl LocalizedEntry {
    pub fn new(locale: Locale, title: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            locale,
            title: title.into(),
            slug: slug.into(),
            summary: None,
            content: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}

/// Picks the entry for `locale`, falling back to the default locale and then
/// to whatever entry exists.
pub fn pick_locale<T, F>(entries: &[T], locale: Locale, locale_of: F) -> Option<&T>
where
    F: Fn(&T) -> Locale,
{
    entries
        .iter()
        .find(|e| locale_of(e) == locale)
        .or_else(|| entries.iter().find(|e| locale_of(e) == Locale::default()))
        .or_else(|| entries.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pick_locale_falls_back_to_default() {
        let entries = vec![
            LocalizedEntry::new(Locale::Fr, "Droit fiscal", "droit-fiscal"),
            LocalizedEntry::new(Locale::En, "Tax law", "tax-law"),
        ];
        let de = pick_locale(&entries, Locale::De, |e| e.locale).unwrap();
        assert_eq!(de.title, "Tax law");
        let fr = pick_locale(&entries, Locale::Fr, |e| e.locale).unwrap();
        assert_eq!(fr.slug, "droit-fiscal");
        assert!(pick_locale::<LocalizedEntry, _>(&[], Locale::En, |e| e.locale).is_none());
    }
}
