use serde::{Deserialize, Serialize};
use sqlx::Type;
use strum_macros::{Display, EnumString};
use ts_rs::TS;

/// Site locale. Every translated record carries one of these.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Type,
    Serialize,
    Deserialize,
    TS,
    EnumString,
    Display,
    Default,
)]
#[sqlx(type_name = "locale", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Locale {
    #[default]
    En,
    De,
    Fr,
}

impl Locale {
    pub const ALL: [Locale; 3] = [Locale::En, Locale::De, Locale::Fr];

    /// Display name of the group holding posts whose category cannot be
    /// resolved to a translated root.
    pub fn uncategorized_label(self) -> &'static str {
        match self {
            Locale::En => "Uncategorized",
            Locale::De => "Ohne Kategorie",
            Locale::Fr => "Sans catégorie",
        }
    }
}
