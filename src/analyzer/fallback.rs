//! Deterministic filename classification.
//!
//! The last line of defence: total, pure (modulo the injected `today`) and
//! dependency-free, so an upload can always be filed even with no vision
//! API, no network and an unreadable file. Keyword tables, not ML.

use chrono::{Duration, NaiveDate};

use crate::models::{AnalysisResult, Category};

/// Reminder horizon for fallback-classified bills.
const BILL_REMINDER_DAYS: i64 = 14;

/// Stored as `extracted_text` whenever the document content was never read.
pub const TEXT_UNAVAILABLE: &str =
    "Text extraction was unavailable for this document. It was categorised from its file name.";

/// Keyword rules, first match wins. Matching is substring on the lowercased
/// filename, so "bill" also matches "billing_statement.pdf".
const RULES: &[(&[&str], Category, &str)] = &[
    (&["council", "tax", "bill", "invoice"], Category::Bill, "Bill/Tax Document"),
    (
        &["appointment", "doctor", "medical", "clinic"],
        Category::Appointment,
        "Appointment Document",
    ),
    (&["bank", "statement", "finance"], Category::Bill, "Financial Document"),
    (&["insurance", "policy", "claim"], Category::Insurance, "Insurance Document"),
    (&["nhs", "health"], Category::Nhs, "NHS/Health Document"),
    (&["gov", "hmrc", "dvla", "government"], Category::Government, "Government Document"),
    (&["ticket", "travel", "train", "flight"], Category::Personal, "Travel Document"),
];

/// Classify a document from its filename alone.
///
/// Every `bill` result carries a reminder [`BILL_REMINDER_DAYS`] out; no
/// other category sets one. There is no unclassifiable state: anything
/// unmatched files as `personal`.
pub fn classify(file_name: &str, today: NaiveDate) -> AnalysisResult {
    let lowered = file_name.to_ascii_lowercase();
    let hit = RULES
        .iter()
        .find(|(keywords, _, _)| keywords.iter().any(|k| lowered.contains(k)));
    let (category, prefix) = match hit {
        Some((_, category, prefix)) => (*category, *prefix),
        None => (Category::Personal, "Document"),
    };

    let reminder_date =
        (category == Category::Bill).then(|| today + Duration::days(BILL_REMINDER_DAYS));

    AnalysisResult {
        title: format!("{prefix}: {}", stem_of(file_name)),
        summary: format!(
            "Automatically filed as \"{category}\" based on the file name \"{file_name}\"."
        ),
        category,
        categories: Vec::new(),
        custom_categories: Vec::new(),
        reminder_date,
        extracted_text: Some(TEXT_UNAVAILABLE.to_string()),
    }
}

/// Filename without its final extension; the whole name if it has none.
fn stem_of(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 25).unwrap()
    }

    #[test]
    fn bill_keywords_set_category_and_reminder() {
        let r = classify("council_tax_bill_2026.pdf", today());
        assert_eq!(r.category, Category::Bill);
        assert_eq!(r.title, "Bill/Tax Document: council_tax_bill_2026");
        assert_eq!(r.reminder_date, Some(today() + Duration::days(14)));
    }

    #[test]
    fn bank_statement_is_a_bill_with_financial_prefix() {
        let r = classify("Bank-Statement-July.png", today());
        assert_eq!(r.category, Category::Bill);
        assert!(r.title.starts_with("Financial Document:"));
        assert!(r.reminder_date.is_some());
    }

    #[test]
    fn first_matching_rule_wins() {
        // "tax" (rule 1) beats "statement" (rule 3)
        let r = classify("tax_statement.pdf", today());
        assert!(r.title.starts_with("Bill/Tax Document:"));
    }

    #[test]
    fn non_bill_categories_never_get_reminders() {
        for name in [
            "gp_appointment_letter.pdf",
            "home_insurance_policy.jpg",
            "nhs_screening.png",
            "hmrc_notice.pdf",
            "train_ticket_march.pdf",
        ] {
            let r = classify(name, today());
            assert_ne!(r.category, Category::Bill, "{name}");
            assert_eq!(r.reminder_date, None, "{name}");
        }
    }

    #[test]
    fn unmatched_names_file_as_personal() {
        let r = classify("random_xyz.png", today());
        assert_eq!(r.category, Category::Personal);
        assert_eq!(r.title, "Document: random_xyz");
        assert_eq!(r.reminder_date, None);
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(classify("INVOICE-0042.PDF", today()).category, Category::Bill);
        assert_eq!(classify("NHS_Letter.pdf", today()).category, Category::Nhs);
    }

    #[test]
    fn output_always_has_placeholder_text_and_empty_labels() {
        let r = classify("whatever.pdf", today());
        assert_eq!(r.extracted_text.as_deref(), Some(TEXT_UNAVAILABLE));
        assert!(r.categories.is_empty());
        assert!(r.custom_categories.is_empty());
    }

    #[test]
    fn stem_handles_odd_names() {
        assert_eq!(stem_of("scan.final.pdf"), "scan.final");
        assert_eq!(stem_of("no_extension"), "no_extension");
        assert_eq!(stem_of(".hidden"), ".hidden");
    }
}
