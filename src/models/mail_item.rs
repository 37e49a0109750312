//! Mail items: one row per scanned document.
//!
//! The primary `category` lives on the row; the label sets (`categories`,
//! `customCategories` on the wire) live in the `mail_item_labels` join table
//! and are loaded alongside the row by the persistence layer.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

use crate::models::Category;

/// A persisted mail item, as returned to clients.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MailItem {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    pub summary: String,
    #[sqlx(try_from = "String")]
    pub category: Category,
    /// Standard labels from the closed taxonomy. Not a column; filled in
    /// from `mail_item_labels` after the row is fetched.
    #[sqlx(skip)]
    pub categories: Vec<String>,
    /// Free-form user labels. Not a column either.
    #[sqlx(skip)]
    pub custom_categories: Vec<String>,
    pub reminder_date: Option<NaiveDate>,
    /// Serving path of the stored upload, e.g. `/uploads/<uuid>.pdf`.
    pub image_url: String,
    /// Original client-side filename, kept for display and notifications.
    pub file_name: String,
    pub extracted_text: Option<String>,
    pub upload_date: DateTime<Utc>,
}

/// Everything needed to insert a mail item. Built by the upload handler from
/// an analysis outcome plus the stored file's identity.
#[derive(Debug, Clone)]
pub struct NewMailItem {
    pub title: String,
    pub summary: String,
    pub category: Category,
    pub categories: Vec<String>,
    pub custom_categories: Vec<String>,
    pub reminder_date: Option<NaiveDate>,
    pub image_url: String,
    pub file_name: String,
    pub extracted_text: Option<String>,
}

/// Partial update for a mail item.
///
/// Scalar fields follow the usual PATCH convention (absent = keep).
/// `reminder_date` is tri-state: absent keeps the stored value, `null`
/// clears it, a date sets it. Label vectors replace the whole set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailItemPatch {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub category: Option<Category>,
    pub categories: Option<Vec<String>>,
    pub custom_categories: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub reminder_date: Option<Option<NaiveDate>>,
}

impl MailItemPatch {
    /// True when at least one row column (not a label set) is touched.
    pub fn touches_columns(&self) -> bool {
        self.title.is_some()
            || self.summary.is_some()
            || self.category.is_some()
            || self.reminder_date.is_some()
    }
}

/// Deserializes `T` but keeps "field absent" distinguishable from
/// "field: null": absent stays `None` via `#[serde(default)]`, an explicit
/// null becomes `Some(None)`.
pub(crate) fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}
