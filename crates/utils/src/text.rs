//! Text folding, collation and slug helpers shared by the listing views and
//! the admin forms.

use std::cmp::Ordering;

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid slug regex"));

/// Lowercased, accent-free form of `input` used for search and title ordering.
///
/// `"Droit Pénal"` and `"droit penal"` fold to the same key.
pub fn fold(input: &str) -> String {
    input
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Case and accent insensitive substring test. `needle` must already be folded.
pub fn contains_folded(haystack: &str, folded_needle: &str) -> bool {
    if folded_needle.is_empty() {
        return true;
    }
    fold(haystack).contains(folded_needle)
}

/// Locale-aware title comparison.
///
/// Primary ordering is on the folded key so accented and capitalised titles
/// interleave with their plain counterparts; the raw strings break ties so
/// the ordering stays total.
pub fn collate(a: &str, b: &str) -> Ordering {
    fold(a).cmp(&fold(b)).then_with(|| a.cmp(b))
}

pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_RE.is_match(slug)
}

/// Derives a URL slug from a human title: folded, with every run of
/// non-alphanumeric characters collapsed into a single `-`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in fold(title).chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_strips_accents_and_case() {
        assert_eq!(fold("Droit Pénal"), "droit penal");
        assert_eq!(fold("ÉTUDE"), "etude");
        assert_eq!(fold("Straße"), "straße");
    }

    #[test]
    fn contains_folded_matches_across_accents() {
        assert!(contains_folded("Conseil en propriété intellectuelle", "propriete"));
        assert!(!contains_folded("Family law", "tax"));
        assert!(contains_folded("anything", ""));
    }

    #[test]
    fn collate_interleaves_accented_titles() {
        let mut titles = vec!["zoning", "Énergie", "energy", "arbitrage"];
        titles.sort_by(|a, b| collate(a, b));
        assert_eq!(titles, vec!["arbitrage", "Énergie", "energy", "zoning"]);
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Mergers & Acquisitions "), "mergers-acquisitions");
        assert_eq!(slugify("Droit du travail"), "droit-du-travail");
        assert!(is_valid_slug(&slugify("Tax -- Advisory!")));
    }

    #[test]
    fn slug_validation() {
        assert!(is_valid_slug("corporate-law"));
        assert!(is_valid_slug("a1"));
        assert!(!is_valid_slug("Corporate"));
        assert!(!is_valid_slug("double--dash"));
        assert!(!is_valid_slug("-leading"));
        assert!(!is_valid_slug(""));
    }
}
