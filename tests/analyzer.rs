//! Analysis pipeline tests with scripted vision and rasterizer stubs.
//!
//! No network, no pdfium, no database: the point is the degradation
//! contract. Whatever fails, `analyze` returns a usable record and the
//! status says which path produced it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use image::DynamicImage;
use posty::analyzer::{
    fallback, Analysis, AnalysisStatus, Analyzer, DegradeReason, ImagePayload, PageRasterizer,
    RasterError, VisionError, VisionOcr,
};
use posty::models::Category;

// ── Stubs ────────────────────────────────────────────────────────────────

/// What a scripted vision call should produce.
#[derive(Clone, Copy)]
enum Script {
    Ok(&'static str),
    RateLimited,
    Unauthorized,
    ServerError,
    Transport,
}

impl Script {
    fn produce(self) -> Result<String, VisionError> {
        match self {
            Script::Ok(s) => Ok(s.to_string()),
            Script::RateLimited => Err(VisionError::RateLimited),
            Script::Unauthorized => Err(VisionError::Unauthorized("bad key".into())),
            Script::ServerError => Err(VisionError::Api { status: 500, message: "boom".into() }),
            Script::Transport => Err(VisionError::Transport("connection refused".into())),
        }
    }
}

struct StubVision {
    transcribe: Script,
    classify_text: Script,
    classify_filename: Script,
}

impl StubVision {
    fn all(script: Script) -> Self {
        Self { transcribe: script, classify_text: script, classify_filename: script }
    }
}

#[async_trait]
impl VisionOcr for StubVision {
    async fn transcribe(&self, _image: &ImagePayload) -> Result<String, VisionError> {
        self.transcribe.produce()
    }
    async fn classify_text(&self, _extracted: &str) -> Result<String, VisionError> {
        self.classify_text.produce()
    }
    async fn classify_filename(&self, _file_name: &str) -> Result<String, VisionError> {
        self.classify_filename.produce()
    }
}

struct FailingRasterizer;

#[async_trait]
impl PageRasterizer for FailingRasterizer {
    async fn rasterize_first_page(&self, _pdf: &Path) -> Result<DynamicImage, RasterError> {
        Err(RasterError::Open("scanned garbage, not a PDF".into()))
    }
}

/// Returns a small blank page without touching the filesystem.
struct FixedRasterizer;

#[async_trait]
impl PageRasterizer for FixedRasterizer {
    async fn rasterize_first_page(&self, _pdf: &Path) -> Result<DynamicImage, RasterError> {
        Ok(DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            64,
            64,
            image::Rgb([255, 255, 255]),
        )))
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

const GOOD_TRANSCRIPT: &str =
    "COUNCIL TAX BILL 2026\nAmount due: £120.00\nPayment due by 1 April 2026.";

const GOOD_REPLY: &str = r#"{"title":"Council Tax Bill","summary":"Council tax statement, £120 due by 1 April.","category":"bill","reminderDate":"2026-04-01"}"#;

fn analyzer(vision: Option<StubVision>, raster: impl PageRasterizer + 'static) -> Analyzer {
    Analyzer::new(
        vision.map(|v| Arc::new(v) as Arc<dyn VisionOcr>),
        Arc::new(raster),
    )
}

/// Write a dummy file so the image branch's read-back succeeds.
fn dummy_file(dir: &tempfile::TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, b"not actually image data, the stubs never look").unwrap();
    path
}

async fn analyze(analyzer: &Analyzer, path: &Path) -> Analysis {
    let name = path.file_name().unwrap().to_str().unwrap().to_string();
    analyzer.analyze(path, &name).await
}

// ── Full path ────────────────────────────────────────────────────────────

#[tokio::test]
async fn image_with_working_vision_is_a_full_analysis() {
    let dir = tempfile::tempdir().unwrap();
    let path = dummy_file(&dir, "scan_001.png");
    let a = analyzer(
        Some(StubVision {
            transcribe: Script::Ok(GOOD_TRANSCRIPT),
            classify_text: Script::Ok(GOOD_REPLY),
            classify_filename: Script::Ok(GOOD_REPLY),
        }),
        FailingRasterizer,
    );

    let out = analyze(&a, &path).await;
    assert_eq!(out.status, AnalysisStatus::Full);
    assert_eq!(out.result.title, "Council Tax Bill");
    assert_eq!(out.result.category, Category::Bill);
    assert_eq!(out.result.extracted_text.as_deref(), Some(GOOD_TRANSCRIPT));
    assert_eq!(
        out.result.reminder_date,
        chrono::NaiveDate::from_ymd_opt(2026, 4, 1)
    );
    assert!(out.result.categories.is_empty());
    assert!(out.result.custom_categories.is_empty());
}

#[tokio::test]
async fn pdf_with_working_raster_and_vision_is_full() {
    let a = analyzer(
        Some(StubVision {
            transcribe: Script::Ok(GOOD_TRANSCRIPT),
            classify_text: Script::Ok(GOOD_REPLY),
            classify_filename: Script::RateLimited,
        }),
        FixedRasterizer,
    );

    // the fixed rasterizer never opens the file, so no fixture is needed
    let out = analyze(&a, Path::new("statement_2026.pdf")).await;
    assert_eq!(out.status, AnalysisStatus::Full);
    assert_eq!(out.result.category, Category::Bill);
    assert_eq!(out.result.extracted_text.as_deref(), Some(GOOD_TRANSCRIPT));
}

// ── Degraded paths ───────────────────────────────────────────────────────

#[tokio::test]
async fn everything_failing_still_files_a_council_tax_bill() {
    let before = Utc::now().date_naive();
    let a = analyzer(Some(StubVision::all(Script::RateLimited)), FailingRasterizer);
    let out = analyze(&a, Path::new("council_tax_bill_2024.pdf")).await;
    let after = Utc::now().date_naive();

    assert_eq!(out.status, AnalysisStatus::Degraded(DegradeReason::QuotaExceeded));
    assert_eq!(out.result.category, Category::Bill);
    assert_eq!(out.result.title, "Bill/Tax Document: council_tax_bill_2024");
    let reminder = out.result.reminder_date.expect("bills always get a reminder");
    assert!(
        reminder == before + Duration::days(14) || reminder == after + Duration::days(14),
        "reminder {reminder} should be 14 days out"
    );
    assert_eq!(out.result.extracted_text.as_deref(), Some(fallback::TEXT_UNAVAILABLE));
}

#[tokio::test]
async fn no_vision_config_degrades_without_touching_the_file() {
    let a = analyzer(None, FailingRasterizer);
    // deliberately no file on disk: the config check must come first
    let out = analyze(&a, Path::new("random_xyz.png")).await;

    assert_eq!(out.status, AnalysisStatus::Degraded(DegradeReason::NotConfigured));
    assert_eq!(out.result.category, Category::Personal);
    assert_eq!(out.result.title, "Document: random_xyz");
    assert_eq!(out.result.reminder_date, None);
    assert!(out.result.summary.contains("not configured"), "{}", out.result.summary);
}

#[tokio::test]
async fn quota_and_service_failures_read_differently() {
    let dir = tempfile::tempdir().unwrap();
    let path = dummy_file(&dir, "water_bill.jpg");

    let quota = analyzer(Some(StubVision::all(Script::RateLimited)), FailingRasterizer);
    let service = analyzer(Some(StubVision::all(Script::ServerError)), FailingRasterizer);

    let q = analyze(&quota, &path).await;
    let s = analyze(&service, &path).await;

    assert_eq!(q.status, AnalysisStatus::Degraded(DegradeReason::QuotaExceeded));
    assert_eq!(s.status, AnalysisStatus::Degraded(DegradeReason::ServiceError));
    assert!(q.result.summary.contains("quota"), "{}", q.result.summary);
    assert!(!s.result.summary.contains("quota"), "{}", s.result.summary);
    // both still file the document identically
    assert_eq!(q.result.category, Category::Bill);
    assert_eq!(s.result.category, Category::Bill);
}

#[tokio::test]
async fn upstream_auth_failure_is_its_own_reason() {
    let dir = tempfile::tempdir().unwrap();
    let path = dummy_file(&dir, "photo.jpeg");
    let a = analyzer(Some(StubVision::all(Script::Unauthorized)), FailingRasterizer);

    let out = analyze(&a, &path).await;
    assert_eq!(out.status, AnalysisStatus::Degraded(DegradeReason::UpstreamAuth));
    assert!(out.result.summary.contains("authentication"), "{}", out.result.summary);
}

#[tokio::test]
async fn transport_failure_degrades_as_service_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dummy_file(&dir, "letter.png");
    let a = analyzer(Some(StubVision::all(Script::Transport)), FailingRasterizer);

    let out = analyze(&a, &path).await;
    assert_eq!(out.status, AnalysisStatus::Degraded(DegradeReason::ServiceError));
}

#[tokio::test]
async fn near_empty_transcript_degrades() {
    let dir = tempfile::tempdir().unwrap();
    let path = dummy_file(&dir, "blank_page.png");
    let a = analyzer(
        Some(StubVision {
            transcribe: Script::Ok("  . "),
            classify_text: Script::Ok(GOOD_REPLY),
            classify_filename: Script::Ok(GOOD_REPLY),
        }),
        FailingRasterizer,
    );

    let out = analyze(&a, &path).await;
    assert_eq!(out.status, AnalysisStatus::Degraded(DegradeReason::EmptyTranscript));
    assert_eq!(out.result.extracted_text.as_deref(), Some(fallback::TEXT_UNAVAILABLE));
}

#[tokio::test]
async fn unparseable_classification_reply_degrades() {
    let dir = tempfile::tempdir().unwrap();
    let path = dummy_file(&dir, "receipt.jpg");
    let a = analyzer(
        Some(StubVision {
            transcribe: Script::Ok(GOOD_TRANSCRIPT),
            classify_text: Script::Ok("I could not classify this document, sorry!"),
            classify_filename: Script::Ok(GOOD_REPLY),
        }),
        FailingRasterizer,
    );

    let out = analyze(&a, &path).await;
    assert_eq!(out.status, AnalysisStatus::Degraded(DegradeReason::MalformedReply));
}

#[tokio::test]
async fn unreadable_image_file_degrades() {
    let a = analyzer(Some(StubVision::all(Script::Ok(GOOD_REPLY))), FailingRasterizer);
    let out = analyze(&a, Path::new("/nonexistent/dir/scan.png")).await;
    assert_eq!(out.status, AnalysisStatus::Degraded(DegradeReason::UnreadableFile));
}

// ── PDF middle path: raster fails, filename classification still works ───

#[tokio::test]
async fn unrenderable_pdf_falls_back_to_filename_classification() {
    let a = analyzer(
        Some(StubVision {
            transcribe: Script::Ok(GOOD_TRANSCRIPT),
            classify_text: Script::Ok(GOOD_REPLY),
            classify_filename: Script::Ok(
                r#"{"title":"Insurance Renewal","summary":"Policy renewal notice.","category":"insurance","reminderDate":null}"#,
            ),
        }),
        FailingRasterizer,
    );

    let out = analyze(&a, Path::new("car_policy_renewal.pdf")).await;
    assert_eq!(out.status, AnalysisStatus::Degraded(DegradeReason::RasterFailed));
    assert_eq!(out.result.category, Category::Insurance);
    assert_eq!(out.result.title, "Insurance Renewal");
    // no transcript exists on this path
    assert_eq!(out.result.extracted_text.as_deref(), Some(fallback::TEXT_UNAVAILABLE));
}
