//! Document analysis: vision OCR plus classification, with graceful
//! degradation.
//!
//! [`Analyzer::analyze`] is a deliberate effect boundary that **never
//! returns an error**. Whatever goes wrong inside (no API key, quota
//! exhausted, unreadable file, model nonsense), the caller always receives
//! a usable [`AnalysisResult`], and the [`AnalysisStatus`] tag says whether
//! it came from the full two-call vision path or a degraded one. Uploads
//! therefore never fail because of the analysis stage.
//!
//! ```text
//!   stored file ──┬── image ── encode ──► OCR call ──► classify call ──► Full
//!                 │
//!                 └── pdf ── rasterize page 1 ──► (same two calls)
//!                               │ failure
//!                               └──► filename-only classify ──► Degraded(RasterFailed)
//!
//!   any remote failure ──► deterministic filename fallback ──► Degraded(reason)
//! ```

pub mod classify;
pub mod encode;
pub mod fallback;
pub mod prompts;
pub mod raster;
pub mod vision;

pub use classify::{parse_reply, Classification, ReplyParseError};
pub use encode::ImagePayload;
pub use raster::{PageRasterizer, PdfiumRasterizer, RasterError};
pub use vision::{OpenAiVision, VisionError, VisionOcr};

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::intake;
use crate::models::AnalysisResult;

/// OCR output shorter than this counts as a failed transcription.
const MIN_TRANSCRIPT_CHARS: usize = 10;

/// The outcome of analysing one document.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub result: AnalysisResult,
    pub status: AnalysisStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStatus {
    /// The full OCR + classification path succeeded.
    Full,
    /// Something failed; the result came from a reduced path.
    Degraded(DegradeReason),
}

impl AnalysisStatus {
    pub fn is_full(self) -> bool {
        matches!(self, AnalysisStatus::Full)
    }
}

/// Why an analysis was degraded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradeReason {
    /// No vision API key in the environment.
    NotConfigured,
    /// The provider answered HTTP 429.
    QuotaExceeded,
    /// The provider answered HTTP 401/403.
    UpstreamAuth,
    /// Any other provider or transport failure.
    ServiceError,
    /// OCR returned (near-)empty text.
    EmptyTranscript,
    /// The classification reply held no parseable JSON.
    MalformedReply,
    /// pdfium could not render the first page.
    RasterFailed,
    /// The stored file could not be read back.
    UnreadableFile,
    /// Extension outside jpg/jpeg/png/pdf; unreachable through intake.
    UnsupportedType,
}

/// The analysis pipeline. Cheap to construct; all real state lives in the
/// injected capabilities.
pub struct Analyzer {
    vision: Option<Arc<dyn VisionOcr>>,
    rasterizer: Arc<dyn PageRasterizer>,
}

impl Analyzer {
    pub fn new(vision: Option<Arc<dyn VisionOcr>>, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        Self { vision, rasterizer }
    }

    /// Production wiring: OpenAI-compatible client if a key is configured,
    /// pdfium for PDFs.
    pub fn from_config(cfg: &AppConfig) -> Self {
        let vision = cfg
            .vision
            .as_ref()
            .map(|v| Arc::new(OpenAiVision::new(v)) as Arc<dyn VisionOcr>);
        if vision.is_none() {
            warn!("no vision API key configured; every upload will be classified from its file name");
        }
        Self::new(vision, Arc::new(PdfiumRasterizer))
    }

    /// Analyse a stored upload. Total: every failure degrades to the
    /// deterministic filename classifier instead of propagating.
    pub async fn analyze(&self, file_path: &Path, original_file_name: &str) -> Analysis {
        let started = Instant::now();
        let today = Utc::now().date_naive();

        let analysis = match self.try_analyze(file_path, original_file_name).await {
            Ok(analysis) => analysis,
            Err(reason) => {
                warn!(?reason, file = %original_file_name, "degrading to filename classification");
                degraded_fallback(original_file_name, today, reason)
            }
        };

        info!(
            status = ?analysis.status,
            category = %analysis.result.category,
            elapsed_ms = started.elapsed().as_millis() as u64,
            file = %original_file_name,
            "analysis finished"
        );
        analysis
    }

    async fn try_analyze(
        &self,
        file_path: &Path,
        original_file_name: &str,
    ) -> Result<Analysis, DegradeReason> {
        let extension = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(intake::extension_of)
            .unwrap_or_default();

        match extension.as_str() {
            "jpg" | "jpeg" | "png" => {
                let vision = self.vision.as_ref().ok_or(DegradeReason::NotConfigured)?;
                let bytes = tokio::fs::read(file_path)
                    .await
                    .map_err(|_| DegradeReason::UnreadableFile)?;
                let payload = encode::encode_bytes(&bytes, &extension);
                self.ocr_and_classify(vision.as_ref(), &payload).await
            }
            "pdf" => {
                let vision = self.vision.as_ref().ok_or(DegradeReason::NotConfigured)?;
                match self.rasterizer.rasterize_first_page(file_path).await {
                    Ok(image) => {
                        let payload =
                            encode::encode_jpeg(&image).map_err(|_| DegradeReason::RasterFailed)?;
                        self.ocr_and_classify(vision.as_ref(), &payload).await
                    }
                    Err(err) => {
                        warn!(error = %err, file = %original_file_name, "rasterisation failed, classifying from the file name");
                        self.classify_filename_only(vision.as_ref(), original_file_name).await
                    }
                }
            }
            _ => Err(DegradeReason::UnsupportedType),
        }
    }

    /// The full path: one OCR call, one classification call, in sequence.
    async fn ocr_and_classify(
        &self,
        vision: &dyn VisionOcr,
        payload: &ImagePayload,
    ) -> Result<Analysis, DegradeReason> {
        let raw_text = vision.transcribe(payload).await.map_err(reason_for)?;
        if raw_text.trim().len() < MIN_TRANSCRIPT_CHARS {
            return Err(DegradeReason::EmptyTranscript);
        }
        debug!(chars = raw_text.len(), "transcription finished");

        let reply = vision.classify_text(&raw_text).await.map_err(reason_for)?;
        let c = classify::parse_reply(&reply).map_err(|err| {
            warn!(error = %err, "classification reply was unusable");
            DegradeReason::MalformedReply
        })?;

        Ok(Analysis {
            result: AnalysisResult {
                title: c.title,
                summary: c.summary,
                category: c.category,
                categories: Vec::new(),
                custom_categories: Vec::new(),
                reminder_date: c.reminder_date,
                extracted_text: Some(raw_text),
            },
            status: AnalysisStatus::Full,
        })
    }

    /// Reduced path for unrenderable PDFs: one classification call driven
    /// by the filename, no OCR text to store.
    async fn classify_filename_only(
        &self,
        vision: &dyn VisionOcr,
        file_name: &str,
    ) -> Result<Analysis, DegradeReason> {
        let reply = vision.classify_filename(file_name).await.map_err(reason_for)?;
        let c = classify::parse_reply(&reply).map_err(|err| {
            warn!(error = %err, "filename classification reply was unusable");
            DegradeReason::MalformedReply
        })?;

        Ok(Analysis {
            result: AnalysisResult {
                title: c.title,
                summary: c.summary,
                category: c.category,
                categories: Vec::new(),
                custom_categories: Vec::new(),
                reminder_date: c.reminder_date,
                extracted_text: Some(fallback::TEXT_UNAVAILABLE.to_string()),
            },
            status: AnalysisStatus::Degraded(DegradeReason::RasterFailed),
        })
    }
}

fn reason_for(err: VisionError) -> DegradeReason {
    warn!(error = %err, "vision call failed");
    match err {
        VisionError::RateLimited => DegradeReason::QuotaExceeded,
        VisionError::Unauthorized(_) => DegradeReason::UpstreamAuth,
        VisionError::Api { .. } | VisionError::Transport(_) | VisionError::EmptyReply => {
            DegradeReason::ServiceError
        }
    }
}

/// Build the final degraded analysis: deterministic classification plus a
/// one-sentence explanation appended to the summary.
fn degraded_fallback(file_name: &str, today: NaiveDate, reason: DegradeReason) -> Analysis {
    let mut result = fallback::classify(file_name, today);
    result.summary = format!("{} {}", result.summary, degrade_note(reason));
    Analysis {
        result,
        status: AnalysisStatus::Degraded(reason),
    }
}

fn degrade_note(reason: DegradeReason) -> &'static str {
    match reason {
        DegradeReason::NotConfigured => "AI analysis is not configured on this server.",
        DegradeReason::QuotaExceeded => "AI analysis was unavailable: API quota exceeded.",
        DegradeReason::UpstreamAuth => "AI analysis was unavailable: API authentication failed.",
        DegradeReason::ServiceError => {
            "AI analysis was unavailable: the vision service returned an error."
        }
        DegradeReason::EmptyTranscript => "AI analysis could not read any text in this document.",
        DegradeReason::MalformedReply => "AI analysis returned an unusable reply.",
        DegradeReason::RasterFailed => "The PDF could not be rendered for analysis.",
        DegradeReason::UnreadableFile => "The stored file could not be read back for analysis.",
        DegradeReason::UnsupportedType => "This file type cannot be analysed.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_statuses_map_to_distinct_reasons() {
        assert_eq!(reason_for(VisionError::RateLimited), DegradeReason::QuotaExceeded);
        assert_eq!(
            reason_for(VisionError::Unauthorized("bad key".into())),
            DegradeReason::UpstreamAuth
        );
        assert_eq!(
            reason_for(VisionError::Api { status: 500, message: "boom".into() }),
            DegradeReason::ServiceError
        );
        assert_eq!(
            reason_for(VisionError::Transport("refused".into())),
            DegradeReason::ServiceError
        );
    }

    #[test]
    fn quota_and_service_notes_are_distinguishable() {
        assert!(degrade_note(DegradeReason::QuotaExceeded).contains("quota"));
        assert!(!degrade_note(DegradeReason::ServiceError).contains("quota"));
    }

    #[test]
    fn degraded_summary_carries_the_note() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 25).unwrap();
        let a = degraded_fallback("water_bill.pdf", today, DegradeReason::QuotaExceeded);
        assert!(a.result.summary.contains("quota"));
        assert_eq!(a.status, AnalysisStatus::Degraded(DegradeReason::QuotaExceeded));
        assert!(!a.status.is_full());
    }
}
