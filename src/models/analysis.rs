//! The transient product of document analysis.

use chrono::NaiveDate;

use crate::models::Category;

/// What analysis (full or degraded) decided about one document. Never
/// persisted as-is; the upload handler folds it into a `NewMailItem`
/// together with the stored file's identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult {
    pub title: String,
    pub summary: String,
    pub category: Category,
    pub categories: Vec<String>,
    pub custom_categories: Vec<String>,
    pub reminder_date: Option<NaiveDate>,
    pub extracted_text: Option<String>,
}
