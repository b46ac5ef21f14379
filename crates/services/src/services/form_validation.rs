//! Field checks shared by the admin forms. Every form collects all of its
//! errors before any write happens.

use std::fmt;

use db::models::locale::Locale;
use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;
use url::Url;
use utils::text::is_valid_slug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
pub struct FieldError {
    /// Dotted path of the field, e.g. `translations.de.slug`.
    pub field: String,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS, Error)]
#[error("{} invalid field(s): {}", .errors.len(), summary(.errors))]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

fn summary(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    pub fn require_text(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, "is required");
        }
    }

    pub fn require_slug(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, "is required");
        } else if !is_valid_slug(value) {
            self.add(
                field,
                "must be lowercase letters, digits and single hyphens",
            );
        }
    }

    /// Absolute `http` or `https` URL.
    pub fn check_link(&mut self, field: &str, value: &str) {
        match Url::parse(value.trim()) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
            Ok(_) => self.add(field, "must be an http(s) URL"),
            Err(e) => self.add(field, format!("is not a valid URL ({e})")),
        }
    }

    pub fn check_email(&mut self, field: &str, value: &str) {
        let value = value.trim();
        let well_formed = value
            .split_once('@')
            .is_some_and(|(local, domain)| {
                !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
            });
        if !well_formed {
            self.add(field, "must be an email address");
        }
    }

    /// Reports every locale missing from `present`.
    pub fn require_locales<I>(&mut self, field: &str, present: I)
    where
        I: IntoIterator<Item = Locale>,
    {
        let present: Vec<Locale> = present.into_iter().collect();
        for locale in Locale::ALL {
            if !present.contains(&locale) {
                self.add(format!("{field}.{locale}"), "translation is required");
            }
        }
    }

    /// Reports locales listed more than once.
    pub fn reject_duplicate_locales<I>(&mut self, field: &str, present: I)
    where
        I: IntoIterator<Item = Locale>,
    {
        let mut seen = Vec::new();
        for locale in present {
            if seen.contains(&locale) {
                self.add(format!("{field}.{locale}"), "appears more than once");
            } else {
                seen.push(locale);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_every_error() {
        let mut errors = ValidationErrors::new();
        errors.require_text("translations.en.title", " ");
        errors.require_slug("translations.en.slug", "Bad Slug");
        errors.require_locales("translations", [Locale::En]);
        assert_eq!(errors.errors.len(), 4);
        assert!(errors.has("translations.de"));
        assert!(errors.has("translations.fr"));
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn links_must_be_absolute_http() {
        let mut errors = ValidationErrors::new();
        errors.check_link("link_url", "https://example.com/news");
        assert!(errors.is_empty());
        errors.check_link("link_url", "/relative");
        errors.check_link("link_url", "mailto:office@example.com");
        assert_eq!(errors.errors.len(), 2);
    }

    #[test]
    fn duplicate_locales_are_reported() {
        let mut errors = ValidationErrors::new();
        errors.reject_duplicate_locales("translations", [Locale::En, Locale::De, Locale::En]);
        assert_eq!(errors.errors.len(), 1);
        assert_eq!(errors.errors[0].field, "translations.en");
    }

    #[test]
    fn email_shape_is_checked() {
        let mut errors = ValidationErrors::new();
        errors.check_email("email", "partner@lawfirm.de");
        assert!(errors.is_empty());
        errors.check_email("email", "nobody");
        errors.check_email("email", "@example.com");
        assert_eq!(errors.errors.len(), 2);
    }

    #[test]
    fn message_lists_fields() {
        let mut errors = ValidationErrors::new();
        errors.add("image", "is required");
        assert_eq!(errors.to_string(), "1 invalid field(s): image: is required");
    }
}
