//! The closed category taxonomy for mail items.
//!
//! Custom labels are deliberately *not* members of this enum; they are
//! free-form strings stored per item (see `mail_item_labels`). Keeping the
//! primary category closed means the classifier, the fallback heuristics and
//! the UI filter chips always agree on the same seven values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Primary category of a mail item.
///
/// Stored and transmitted in lowercase. Anything the vision model returns
/// outside this set is coerced to [`Category::Personal`] by the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Bill,
    Appointment,
    Personal,
    Promotional,
    Government,
    Insurance,
    Nhs,
}

impl Category {
    /// All categories, in display order.
    pub const ALL: [Category; 7] = [
        Category::Bill,
        Category::Appointment,
        Category::Personal,
        Category::Promotional,
        Category::Government,
        Category::Insurance,
        Category::Nhs,
    ];

    /// Lowercase wire/storage form.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Bill => "bill",
            Category::Appointment => "appointment",
            Category::Personal => "personal",
            Category::Promotional => "promotional",
            Category::Government => "government",
            Category::Insurance => "insurance",
            Category::Nhs => "nhs",
        }
    }

    /// Parse a lowercase-insensitive category name. `None` for anything
    /// outside the closed set.
    pub fn parse(s: &str) -> Option<Category> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bill" => Some(Category::Bill),
            "appointment" => Some(Category::Appointment),
            "personal" => Some(Category::Personal),
            "promotional" => Some(Category::Promotional),
            "government" => Some(Category::Government),
            "insurance" => Some(Category::Insurance),
            "nhs" => Some(Category::Nhs),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a `category` column holds a value outside the closed set.
/// Only reachable if rows were written by something other than this crate.
#[derive(Debug, thiserror::Error)]
#[error("unknown category {0:?}")]
pub struct UnknownCategory(pub String);

// `sqlx(try_from = "String")` decode path for TEXT columns.
impl TryFrom<String> for Category {
    type Error = UnknownCategory;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Category::parse(&s).ok_or(UnknownCategory(s))
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Personal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_every_variant() {
        for c in Category::ALL {
            assert_eq!(Category::parse(c.as_str()), Some(c));
        }
    }

    #[test]
    fn parse_is_case_insensitive_and_trims() {
        assert_eq!(Category::parse(" Bill "), Some(Category::Bill));
        assert_eq!(Category::parse("NHS"), Some(Category::Nhs));
    }

    #[test]
    fn parse_rejects_unknown() {
        assert_eq!(Category::parse("junk-mail"), None);
        assert_eq!(Category::parse(""), None);
    }

    #[test]
    fn serde_uses_lowercase() {
        assert_eq!(
            serde_json::to_string(&Category::Government).unwrap(),
            "\"government\""
        );
    }
}
